//! Main-body text extraction from article HTML.
//!
//! Two strategies, both built on `scraper`'s html5ever parser, which never
//! rejects malformed markup:
//!
//! 1. **Readability**: score container elements by the amount of paragraph
//!    text they hold, penalize link-heavy and boilerplate-looking containers
//!    (nav, footer, ads, share bars), and flatten the winner to
//!    newline-joined block text.
//! 2. **Paragraphs**: every `<p>` in document order, newline-joined.
//!
//! Whether the first strategy runs is a capability flag on [`Extractor`],
//! not global state, so both paths can be forced in tests.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Block-level tags whose text becomes one output line.
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre",
];

/// A container needs at least this much paragraph text to win.
const MIN_CANDIDATE_CHARS: usize = 140;

static CANDIDATES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article, main, section, div, td").expect("static selector"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));
static BLOCKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, h1, h2, h3, h4, h5, h6, li, blockquote, pre").expect("static selector")
});
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|[-_\s])(nav|navbar|menu|footer|header|sidebar|comment|comments|promo|advert|ads?|sponsor|share|social|subscribe|newsletter|related|cookie|banner|popup|breadcrumb)([-_\s]|$)",
    )
    .expect("static regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// HTML to plain-text extractor.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    readability: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self { readability: true }
    }
}

impl Extractor {
    /// `readability = false` forces the paragraph strategy for every page.
    pub fn new(readability: bool) -> Self {
        Self { readability }
    }

    pub fn readability_enabled(&self) -> bool {
        self.readability
    }

    /// Best-effort main-body text of `html`. Empty input gives empty output.
    pub fn extract(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let document = Html::parse_document(html);
        if self.readability {
            if let Some(text) = readability_text(&document) {
                return text;
            }
            debug!("readability found no main content; using paragraph fallback");
        }
        paragraph_text(&document)
    }
}

fn clean(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn element_text(el: &ElementRef) -> String {
    clean(&el.text().collect::<String>())
}

fn is_boilerplate(el: &ElementRef) -> bool {
    let value = el.value();
    if matches!(value.name(), "nav" | "footer" | "header" | "aside" | "form") {
        return true;
    }
    let class = value.attr("class").unwrap_or_default();
    let id = value.attr("id").unwrap_or_default();
    BOILERPLATE.is_match(class) || BOILERPLATE.is_match(id)
}

/// True when some ancestor of `el` below `root` is boilerplate.
fn inside_boilerplate(el: &ElementRef, root: &ElementRef) -> bool {
    for node in el.ancestors() {
        if node.id() == root.id() {
            return false;
        }
        if let Some(ancestor) = ElementRef::wrap(node) {
            if is_boilerplate(&ancestor) {
                return true;
            }
        }
    }
    false
}

/// True when a block-level ancestor below `root` already covers `el`'s text.
fn nested_in_block(el: &ElementRef, root: &ElementRef) -> bool {
    for node in el.ancestors() {
        if node.id() == root.id() {
            return false;
        }
        if let Some(ancestor) = node.value().as_element() {
            if BLOCK_TAGS.contains(&ancestor.name()) {
                return true;
            }
        }
    }
    false
}

fn candidate_score(el: &ElementRef) -> f64 {
    let paragraph_chars: usize = el
        .select(&PARAGRAPHS)
        .filter(|p| !inside_boilerplate(p, el))
        .map(|p| element_text(&p).chars().count())
        .sum();
    if paragraph_chars < MIN_CANDIDATE_CHARS {
        return 0.0;
    }
    let total_chars = element_text(el).chars().count().max(1);
    let link_chars: usize = el
        .select(&LINKS)
        .map(|a| element_text(&a).chars().count())
        .sum();
    let link_density = link_chars as f64 / total_chars as f64;
    let mut score = paragraph_chars as f64 * (1.0 - link_density);
    match el.value().name() {
        "article" => score *= 1.5,
        "main" => score *= 1.2,
        _ => {}
    }
    // a container mostly made of its own paragraphs beats a wrapper around
    // the whole page
    score * (paragraph_chars as f64 / total_chars as f64).sqrt()
}

fn readability_text(document: &Html) -> Option<String> {
    let best = document
        .select(&CANDIDATES)
        .filter(|el| !is_boilerplate(el))
        .map(|el| (candidate_score(&el), el))
        .filter(|(score, _)| *score > 0.0)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, el)| el)?;

    let lines: Vec<String> = best
        .select(&BLOCKS)
        .filter(|block| !inside_boilerplate(block, &best) && !nested_in_block(block, &best))
        .map(|block| element_text(&block))
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn paragraph_text(document: &Html) -> String {
    document
        .select(&PARAGRAPHS)
        .map(|p| element_text(&p))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten an HTML fragment (feed descriptions, API snippets) to one line.
pub fn fragment_text(fragment: &str) -> String {
    if !fragment.contains('<') {
        return clean(fragment);
    }
    let parsed = Html::parse_fragment(fragment);
    clean(&parsed.root_element().text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_para(seed: &str) -> String {
        format!("<p>{}</p>", seed.repeat(12))
    }

    fn news_page() -> String {
        format!(
            r#"<html><head><title>t</title><script>var x = 1;</script></head><body>
            <nav class="site-nav"><p>Home</p><p>Markets</p></nav>
            <div class="promo-banner"><p>Subscribe now for unlimited access to all our journalism today.</p></div>
            <article>
              <h1>ACME beats estimates</h1>
              {}
              {}
              <div class="share-tools"><p>Share this on social media</p></div>
              <ul><li><p>Revenue rose 12%</p></li></ul>
            </article>
            <footer><p>Copyright 2025</p></footer>
            </body></html>"#,
            long_para("ACME reported strong quarterly revenue. "),
            long_para("Analysts raised their targets. ")
        )
    }

    #[test]
    fn test_readability_keeps_article_body_only() {
        let text = Extractor::new(true).extract(&news_page());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ACME beats estimates");
        assert!(lines[1].starts_with("ACME reported strong quarterly revenue."));
        assert!(lines[2].starts_with("Analysts raised their targets."));
        assert_eq!(lines[3], "Revenue rose 12%");
        assert_eq!(lines.len(), 4);
        assert!(!text.contains("Home"));
        assert!(!text.contains("Subscribe"));
        assert!(!text.contains("Share this"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn test_paragraph_fallback_keeps_every_paragraph() {
        let text = Extractor::new(false).extract(&news_page());
        assert!(text.starts_with("Home\nMarkets\nSubscribe now"));
        assert!(text.contains("Share this on social media"));
        assert!(text.ends_with("Copyright 2025"));
        assert!(!text.contains("ACME beats estimates"));
    }

    #[test]
    fn test_readability_falls_back_on_thin_pages() {
        let html = "<html><body><p>Short one.</p><p>Short two.</p></body></html>";
        assert_eq!(Extractor::new(true).extract(html), "Short one.\nShort two.");
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        assert_eq!(Extractor::default().extract(""), "");
        assert_eq!(Extractor::new(false).extract("   \n"), "");
    }

    #[test]
    fn test_malformed_markup_still_yields_text() {
        let html = "<html><body><div><p>First paragraph <b>bold<p>Second paragraph";
        let text = Extractor::new(false).extract(html);
        assert_eq!(text, "First paragraph bold\nSecond paragraph");
        assert!(!Extractor::new(true).extract(html).is_empty());
    }

    #[test]
    fn test_fragment_text() {
        assert_eq!(
            fragment_text("<a href=\"x\">ACME   jumps</a>&nbsp;<font>Reuters</font>"),
            "ACME jumps Reuters"
        );
        assert_eq!(fragment_text("  plain   text "), "plain text");
        assert_eq!(fragment_text(""), "");
    }
}
