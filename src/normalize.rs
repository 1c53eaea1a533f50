use std::collections::{BTreeMap, HashSet};

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::formats::{CodeBlock, NormalizedDocument, PlatformInstructions, Section};

/// A fetched page awaiting normalization. Produced by a fetcher, consumed
/// once, then discarded.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: Url,
    pub html: String,
}

/// A field that could not be recovered and took its documented default.
/// Collected on the result so callers (and tests) can observe degradation
/// without parsing log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub field: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct NormalizedPage {
    pub document: NormalizedDocument,
    pub degradations: Vec<Degradation>,
}

/// Stateless HTML normalizer: one fetched page in, one structured document
/// out. Performs no I/O; safe to call from any number of workers as long
/// as each call gets its own page.
pub struct Normalizer {
    selectors: Selectors,
}

struct Selectors {
    main: Selector,
    article: Selector,
    document_div: Selector,
    h1: Selector,
    anchor: Selector,
    tab: Selector,
    panel: Selector,
    pre: Selector,
    paragraph: Selector,
}

impl Selectors {
    fn new() -> Self {
        // Static literals; parse cannot fail.
        Self {
            main: Selector::parse("main").expect("main selector"),
            article: Selector::parse("article").expect("article selector"),
            document_div: Selector::parse("div.document").expect("div.document selector"),
            h1: Selector::parse("h1").expect("h1 selector"),
            anchor: Selector::parse("a[href]").expect("anchor selector"),
            tab: Selector::parse(r#"[role="tab"], .sphinx-tabs-tab"#).expect("tab selector"),
            panel: Selector::parse(r#"[role="tabpanel"], .sphinx-tabs-panel"#)
                .expect("panel selector"),
            pre: Selector::parse("pre").expect("pre selector"),
            paragraph: Selector::parse("p").expect("paragraph selector"),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            selectors: Selectors::new(),
        }
    }

    /// Normalizes one page, or returns `None` when the page has no
    /// recognizable main-content region. Never fails: every recoverable
    /// problem degrades to a default and is recorded on the result.
    pub fn normalize(&self, page: &RawPage) -> Option<NormalizedPage> {
        let html = Html::parse_document(&page.html);

        let Some(main) = self.locate_main_content(&html) else {
            tracing::warn!(url = %page.url, "no recognizable main content region; skipping page");
            return None;
        };

        let mut degradations = Vec::new();

        let title = self.extract_title(&html);
        if title.is_empty() {
            degradations.push(Degradation {
                field: "title",
                detail: "no h1 heading found".to_owned(),
            });
        }

        let sections = self.segment_sections(main, &mut degradations);
        let code_blocks = self.extract_code_blocks(main, &mut degradations);

        for degradation in &degradations {
            tracing::warn!(
                url = %page.url,
                field = degradation.field,
                detail = %degradation.detail,
                "field degraded to default"
            );
        }

        Some(NormalizedPage {
            document: NormalizedDocument {
                title,
                sections,
                code_blocks,
            },
            degradations,
        })
    }

    /// Picks the primary content region: semantic `main`, then `article`,
    /// then the conventional `div.document` container used by docs
    /// generators. Documentation markup varies too much to hard-code one.
    fn locate_main_content<'a>(&self, html: &'a Html) -> Option<ElementRef<'a>> {
        html.select(&self.selectors.main)
            .next()
            .or_else(|| html.select(&self.selectors.article).next())
            .or_else(|| html.select(&self.selectors.document_div).next())
    }

    /// First top-level heading anywhere in the page, not just the main
    /// region; empty string when absent.
    fn extract_title(&self, html: &Html) -> String {
        html.select(&self.selectors.h1)
            .next()
            .map(|h1| element_text(h1))
            .unwrap_or_default()
    }

    fn segment_sections(
        &self,
        main: ElementRef<'_>,
        degradations: &mut Vec<Degradation>,
    ) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut current: Option<OpenSection> = None;

        for element in main.descendent_elements() {
            if has_enclosing_block(element, main) {
                continue;
            }

            let tag = element.value().name();
            match tag {
                "h2" | "h3" | "h4" => {
                    close_section(&mut sections, current.take());
                    current = Some(OpenSection {
                        heading: element_text(element),
                        paragraphs: Vec::new(),
                        platform_variants: BTreeMap::new(),
                    });
                }
                "p" | "li" | "blockquote" => {
                    let text = element_text(element);
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(open) = current.as_mut() {
                        open.paragraphs.push(text);
                    }
                }
                _ if is_tab_container(element) => {
                    let Some(open) = current.as_mut() else {
                        continue;
                    };
                    let variants = self.parse_platform_variants(element, degradations);
                    open.platform_variants.extend(variants);
                }
                _ => {}
            }
        }

        close_section(&mut sections, current.take());
        sections
    }

    /// One `PlatformInstructions` entry per tab panel, keyed by the tab's
    /// declared name (lowercased). `pre` lines inside a panel become
    /// ordered steps; panel paragraphs become notes.
    fn parse_platform_variants(
        &self,
        container: ElementRef<'_>,
        degradations: &mut Vec<Degradation>,
    ) -> BTreeMap<String, PlatformInstructions> {
        let names: Vec<String> = container
            .select(&self.selectors.tab)
            .map(|tab| element_text(tab).to_lowercase())
            .collect();
        let panels: Vec<ElementRef<'_>> = container.select(&self.selectors.panel).collect();

        if names.len() != panels.len() {
            degradations.push(Degradation {
                field: "platform_variants",
                detail: format!(
                    "tab/panel count mismatch: {} tabs, {} panels",
                    names.len(),
                    panels.len()
                ),
            });
        }

        let mut variants = BTreeMap::new();
        for (name, panel) in names.into_iter().zip(panels) {
            if name.is_empty() {
                continue;
            }

            let mut steps = Vec::new();
            for pre in panel.select(&self.selectors.pre) {
                for line in pre.text().collect::<String>().lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        steps.push(line.to_owned());
                    }
                }
            }

            let notes: Vec<String> = panel
                .select(&self.selectors.paragraph)
                .map(element_text)
                .filter(|note| !note.is_empty())
                .collect();

            variants.insert(name, PlatformInstructions { steps, notes });
        }
        variants
    }

    fn extract_code_blocks(
        &self,
        main: ElementRef<'_>,
        degradations: &mut Vec<Degradation>,
    ) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        let mut last_paragraph: Option<String> = None;
        let mut last_literal: Option<String> = None;

        for element in main.descendent_elements() {
            let tag = element.value().name();

            if tag == "p" && !has_ancestor_tag(element, main, "pre") {
                let text = element_text(element);
                if !text.is_empty() {
                    last_paragraph = Some(text);
                }
                continue;
            }

            if is_literal_reference(element) && !has_ancestor_tag(element, main, "pre") {
                let text = element_text(element);
                if !text.is_empty() {
                    last_literal = Some(text);
                }
                continue;
            }

            if tag != "pre" {
                continue;
            }

            let code = preformatted_text(element);
            if code.is_empty() {
                degradations.push(Degradation {
                    field: "code_block",
                    detail: "empty pre element dropped".to_owned(),
                });
                continue;
            }

            blocks.push(CodeBlock {
                language: resolve_language(element)
                    .unwrap_or_else(|| CodeBlock::UNKNOWN_LANGUAGE.to_owned()),
                code,
                context: last_paragraph.clone().unwrap_or_default(),
                filename: last_literal.clone().unwrap_or_default(),
            });
        }

        blocks
    }

    /// Every anchor resolved against the page's own URL, so relative
    /// hrefs land next to the page that mentions them. Same-page anchors
    /// and hosts other than `base_url`'s are dropped; the rest is
    /// deduplicated, in a deterministic order.
    pub fn discover_links(&self, page: &RawPage, base_url: &Url) -> Vec<Url> {
        let html = Html::parse_document(&page.html);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in html.select(&self.selectors.anchor) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if href.starts_with('#') {
                continue;
            }
            let Ok(mut resolved) = page.url.join(href) else {
                tracing::debug!(href, "unresolvable href ignored");
                continue;
            };
            resolved.set_fragment(None);
            if resolved.host_str() != base_url.host_str() {
                continue;
            }
            if seen.insert(resolved.to_string()) {
                links.push(resolved);
            }
        }

        links.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        links
    }
}

struct OpenSection {
    heading: String,
    paragraphs: Vec<String>,
    platform_variants: BTreeMap<String, PlatformInstructions>,
}

fn close_section(sections: &mut Vec<Section>, open: Option<OpenSection>) {
    let Some(open) = open else {
        return;
    };
    // Empty sections are not emitted.
    if open.paragraphs.is_empty() && open.platform_variants.is_empty() {
        return;
    }
    sections.push(Section {
        heading: open.heading,
        body: open.paragraphs.join("\n"),
        platform_variants: open.platform_variants,
    });
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Full visible text of a `pre` block, one entry per non-blank rendered
/// line, rejoined with newlines. Indentation inside a line is kept.
fn preformatted_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Language tag from a `language-X` / `highlight-X` class token on the
/// block itself, its inner `code` element, or its immediate parent. The
/// first match wins; the tag is the token text after the prefix, up to
/// the next separator.
fn resolve_language(pre: ElementRef<'_>) -> Option<String> {
    if let Some(language) = language_from_classes(pre) {
        return Some(language);
    }
    if let Some(code) = pre
        .child_elements()
        .find(|child| child.value().name() == "code")
    {
        if let Some(language) = language_from_classes(code) {
            return Some(language);
        }
    }
    pre.parent()
        .and_then(ElementRef::wrap)
        .and_then(language_from_classes)
}

fn language_from_classes(element: ElementRef<'_>) -> Option<String> {
    for class in element.value().classes() {
        for prefix in ["language-", "highlight-"] {
            if let Some(rest) = class.strip_prefix(prefix) {
                let tag = rest.split('-').next().unwrap_or(rest);
                if !tag.is_empty() {
                    return Some(tag.to_owned());
                }
            }
        }
    }
    None
}

/// Inline element explicitly marked as a literal/file reference, the way
/// docs generators render filenames (`docutils literal` spans, `cite`).
fn is_literal_reference(element: ElementRef<'_>) -> bool {
    element.value().name() == "cite"
        || element.value().classes().any(|class| class == "literal")
}

fn is_tab_container(element: ElementRef<'_>) -> bool {
    element
        .value()
        .classes()
        .any(|class| matches!(class, "sphinx-tabs" | "tabbed-set" | "tabs"))
}

/// True when the element sits inside another block (paragraph, list item,
/// pre, tab container) between itself and the main region, which means
/// its text is already accounted for by the enclosing block.
fn has_enclosing_block(element: ElementRef<'_>, main: ElementRef<'_>) -> bool {
    for ancestor in element.ancestors() {
        if ancestor.id() == main.id() {
            break;
        }
        let Some(ancestor) = ElementRef::wrap(ancestor) else {
            continue;
        };
        if matches!(ancestor.value().name(), "p" | "li" | "blockquote" | "pre") {
            return true;
        }
        if is_tab_container(ancestor) {
            return true;
        }
    }
    false
}

fn has_ancestor_tag(element: ElementRef<'_>, main: ElementRef<'_>, tag: &str) -> bool {
    for ancestor in element.ancestors() {
        if ancestor.id() == main.id() {
            break;
        }
        if let Some(ancestor) = ElementRef::wrap(ancestor) {
            if ancestor.value().name() == tag {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> RawPage {
        RawPage {
            url: Url::parse("https://docs.example/guide").expect("test url"),
            html: html.to_owned(),
        }
    }

    fn normalize(html: &str) -> Option<NormalizedPage> {
        Normalizer::new().normalize(&page(html))
    }

    #[test]
    fn page_without_any_content_container_is_skipped() {
        let html = "<html><body><div><p>loose text</p></div></body></html>";
        assert!(normalize(html).is_none());
    }

    #[test]
    fn main_region_preferred_over_article() {
        let html = r#"<html><body>
            <article><p>article text</p></article>
            <main><h2>Real</h2><p>main text</p></main>
        </body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.sections[0].body, "main text");
    }

    #[test]
    fn div_document_container_is_last_resort() {
        let html = r#"<html><body>
            <div class="document"><h2>Only</h2><p>fallback text</p></div>
        </body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.sections[0].heading, "Only");
    }

    #[test]
    fn title_comes_from_first_h1_anywhere() {
        let html = r#"<html><body>
            <header><h1> Installing ROS </h1></header>
            <main><h2>Steps</h2><p>text</p></main>
        </body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.title, "Installing ROS");
    }

    #[test]
    fn missing_title_degrades_to_empty() {
        let html = "<html><body><main><h2>A</h2><p>a1</p></main></body></html>";
        let out = normalize(html).expect("document");
        assert_eq!(out.document.title, "");
        assert!(out.degradations.iter().any(|d| d.field == "title"));
    }

    #[test]
    fn headings_segment_sections_in_document_order() {
        let html = r#"<html><body><main>
            <h2>A</h2><p>a1</p>
            <h3>B</h3><p>b1</p>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        let sections = &out.document.sections;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "A");
        assert_eq!(sections[0].body, "a1");
        assert_eq!(sections[1].heading, "B");
        assert_eq!(sections[1].body, "b1");
    }

    #[test]
    fn empty_sections_are_not_emitted() {
        let html = r#"<html><body><main>
            <h2>Empty</h2>
            <h2>Full</h2><p>content</p>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.sections.len(), 1);
        assert_eq!(out.document.sections[0].heading, "Full");
    }

    #[test]
    fn final_section_absorbs_trailing_content() {
        let html = r#"<html><body><main>
            <h2>Last</h2><p>one</p><ul><li>two</li><li>three</li></ul>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.sections[0].body, "one\ntwo\nthree");
    }

    #[test]
    fn nested_sections_are_flattened_in_order() {
        // Sphinx nests each heading in its own <section> element.
        let html = r#"<html><body><main>
            <section><h2>Outer</h2><p>o1</p>
                <section><h3>Inner</h3><p>i1</p></section>
            </section>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        let headings: Vec<&str> = out
            .document
            .sections
            .iter()
            .map(|s| s.heading.as_str())
            .collect();
        assert_eq!(headings, ["Outer", "Inner"]);
    }

    #[test]
    fn platform_tabs_become_variants() {
        let html = r#"<html><body><main>
            <h2>Install</h2><p>Pick your platform.</p>
            <div class="sphinx-tabs">
                <button class="sphinx-tabs-tab">Linux</button>
                <button class="sphinx-tabs-tab">Windows</button>
                <div class="sphinx-tabs-panel">
                    <p>Use apt.</p>
                    <div class="highlight-console"><pre>sudo apt update
sudo apt install ros</pre></div>
                </div>
                <div class="sphinx-tabs-panel">
                    <p>Use the installer.</p>
                    <pre>choco install ros</pre>
                </div>
            </div>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        let section = &out.document.sections[0];
        assert_eq!(section.platform_variants.len(), 2);

        let linux = &section.platform_variants["linux"];
        assert_eq!(linux.steps, ["sudo apt update", "sudo apt install ros"]);
        assert_eq!(linux.notes, ["Use apt."]);

        let windows = &section.platform_variants["windows"];
        assert_eq!(windows.steps, ["choco install ros"]);

        // Tab content must not leak into the section body.
        assert_eq!(section.body, "Pick your platform.");
    }

    #[test]
    fn sections_without_tabs_have_no_variants() {
        let html = "<html><body><main><h2>A</h2><p>a1</p></main></body></html>";
        let out = normalize(html).expect("document");
        assert!(out.document.sections[0].platform_variants.is_empty());
    }

    #[test]
    fn language_recovered_from_class_token() {
        let html = r#"<html><body><main>
            <h2>Code</h2>
            <pre class="language-python">print("hi")</pre>
            <pre>no class here</pre>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        let blocks = &out.document.code_blocks;
        assert_eq!(blocks[0].language, "python");
        assert_eq!(blocks[1].language, "unknown");
    }

    #[test]
    fn language_recovered_from_parent_highlight_class() {
        let html = r#"<html><body><main>
            <div class="highlight-console notranslate"><pre>ros2 run demo</pre></div>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.code_blocks[0].language, "console");
    }

    #[test]
    fn language_recovered_from_inner_code_element() {
        let html = r#"<html><body><main>
            <pre><code class="language-yaml">key: value</code></pre>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.code_blocks[0].language, "yaml");
    }

    #[test]
    fn code_keeps_nonempty_lines_and_indentation() {
        let html = "<html><body><main><pre>\ndef f():\n    return 1\n\n</pre></main></body></html>";
        let out = normalize(html).expect("document");
        assert_eq!(out.document.code_blocks[0].code, "def f():\n    return 1");
    }

    #[test]
    fn code_context_is_nearest_preceding_paragraph() {
        let html = r#"<html><body><main>
            <p>First paragraph.</p>
            <p>Run this command:</p>
            <pre>ros2 launch demo</pre>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        assert_eq!(out.document.code_blocks[0].context, "Run this command:");
    }

    #[test]
    fn code_filename_from_preceding_literal_reference() {
        let html = r#"<html><body><main>
            <p>Edit <code class="docutils literal">setup.py</code> as follows:</p>
            <pre class="language-python">from setuptools import setup</pre>
        </main></body></html>"#;
        let out = normalize(html).expect("document");
        let block = &out.document.code_blocks[0];
        assert_eq!(block.filename, "setup.py");
        assert_eq!(block.context, "Edit setup.py as follows:");
    }

    #[test]
    fn empty_pre_is_dropped_with_diagnostic() {
        let html = "<html><body><main><p>t</p><pre>   </pre></main></body></html>";
        let out = normalize(html).expect("document");
        assert!(out.document.code_blocks.is_empty());
        assert!(out.degradations.iter().any(|d| d.field == "code_block"));
    }

    #[test]
    fn discover_links_keeps_same_host_only() {
        let html = r##"<html><body>
            <a href="#top">top</a>
            <a href="/docs/x">x</a>
            <a href="https://other.example/y">y</a>
        </body></html>"##;
        let base = Url::parse("https://docs.example/").expect("base url");
        let links = Normalizer::new().discover_links(&page(html), &base);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://docs.example/docs/x");
    }

    #[test]
    fn relative_links_resolve_against_the_page_url() {
        let html = r#"<html><body><a href="install.html">install</a></body></html>"#;
        let page = RawPage {
            url: Url::parse("https://docs.example/docs/start.html").expect("page url"),
            html: html.to_owned(),
        };
        let base = Url::parse("https://docs.example/docs").expect("base url");
        let links = Normalizer::new().discover_links(&page, &base);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://docs.example/docs/install.html");
    }

    #[test]
    fn discover_links_deduplicates_and_orders_deterministically() {
        let html = r#"<html><body>
            <a href="/b">b</a>
            <a href="/a">a</a>
            <a href="/b#frag">b again</a>
        </body></html>"#;
        let base = Url::parse("https://docs.example/").expect("base url");
        let links = Normalizer::new().discover_links(&page(html), &base);
        let as_str: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(as_str, ["https://docs.example/a", "https://docs.example/b"]);
    }
}
