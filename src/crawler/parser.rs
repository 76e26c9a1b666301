//! HTML parser for extracting links and metadata
//!
//! This module handles parsing static HTML content to extract:
//! - Links to follow (from <a> tags)
//! - SEO metadata (title, description, first h1, canonical, word count)
//! - Visible body text, used to spot pages that only render client-side

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Elements whose text never shows up on screen
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements and attributes left in server HTML by client-side rendering frameworks
pub const FRAMEWORK_SELECTORS: &[&str] = &[
    "script#__NEXT_DATA__",
    "#___gatsby",
    "#__nuxt",
    "[data-reactroot]",
    "[data-react-helmet]",
    "[ng-version]",
    "[ng-app]",
    "[data-ng-app]",
    "[data-v-app]",
    "[data-server-rendered]",
    "[data-sveltekit-hydrate]",
    "[data-sveltekit-preload-data]",
];

/// Hydration globals assigned from inline scripts
pub const FRAMEWORK_GLOBALS: &[&str] = &[
    "__NUXT__",
    "window.__remixContext",
    "__sveltekit",
    "__NEXT_DATA__",
];

/// Mount points that only client-side code fills
const EMPTY_MOUNT_POINTS: &str = "#root, #app, #svelte";

/// SEO metadata extracted from a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub h1: Option<String>,
    pub canonical: Option<String>,
    pub word_count: Option<usize>,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// All links found on the page (absolute URLs, deduplicated, document order)
    pub links: Vec<String>,

    /// Page metadata
    pub metadata: PageMetadata,

    /// Characters of visible body text
    pub visible_text_len: usize,

    /// The document carries client-side framework markers
    pub framework_markers: bool,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use sitegrove::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.metadata.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let text = visible_text(&document);
    let word_count = text.split_whitespace().count();

    let metadata = PageMetadata {
        title: first_text(&document, "title"),
        description: meta_description(&document),
        h1: first_text(&document, "h1"),
        canonical: canonical(&document, base_url),
        word_count: Some(word_count),
    };

    ParsedPage {
        links: extract_links(&document, base_url),
        metadata,
        visible_text_len: text.chars().count(),
        framework_markers: has_framework_markers(&document),
    }
}

/// Returns true if the document looks like a client-side rendered app
///
/// Markers are matched as real elements and attributes, and globals only inside
/// inline scripts, so class names or prose that contain the same words don't count.
pub fn has_framework_markers(document: &Html) -> bool {
    let marked = FRAMEWORK_SELECTORS.iter().any(|raw| {
        Selector::parse(raw)
            .map(|selector| document.select(&selector).next().is_some())
            .unwrap_or(false)
    });
    if marked {
        return true;
    }

    if let Ok(scripts) = Selector::parse("script") {
        let assigns_global = document.select(&scripts).any(|script| {
            let code: String = script.text().collect();
            FRAMEWORK_GLOBALS.iter().any(|global| code.contains(global))
        });
        if assigns_global {
            return true;
        }
    }

    Selector::parse(EMPTY_MOUNT_POINTS)
        .map(|selector| {
            document.select(&selector).any(|mount| {
                mount.children().all(|child| match child.value() {
                    Node::Text(text) => text.trim().is_empty(),
                    Node::Comment(_) => true,
                    _ => false,
                })
            })
        })
        .unwrap_or(false)
}

/// Collects the visible text of the document body, whitespace-collapsed
pub fn visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|content| content.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|content| !content.is_empty())
}

fn meta_description(document: &Html) -> Option<String> {
    meta_content(document, "meta[name=\"description\"]")
        .or_else(|| meta_content(document, "meta[property=\"og:description\"]"))
}

fn canonical(document: &Html, base_url: &Url) -> Option<String> {
    let selector = Selector::parse("link[rel=\"canonical\"][href]").ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url))
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            if seen.insert(absolute_url.clone()) {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
