use anyhow::Context as _;

use crate::cli::StatsArgs;
use crate::store::{DocumentStore as _, JsonlStore};

/// Prints corpus statistics: document total plus per-subdomain and
/// per-type counts.
pub fn run(args: StatsArgs) -> anyhow::Result<()> {
    let store = JsonlStore::open(&args.store)
        .with_context(|| format!("open document store: {}", args.store))?;

    let stats = store.statistics();
    let rendered = serde_yaml::to_string(&stats).context("render statistics")?;
    print!("{rendered}");
    Ok(())
}
