#![forbid(unsafe_code)]

pub mod assemble;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod embed;
pub mod export;
pub mod features;
pub mod fetch;
pub mod formats;
pub mod github;
pub mod logging;
pub mod media;
pub mod normalize;
pub mod stats;
pub mod store;
pub mod vector;
pub mod youtube;
