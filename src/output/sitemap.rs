//! Sitemap serializers
//!
//! Each serializer turns the successful URL list of a crawl into one document.
//! They know nothing about the crawl itself beyond the URLs and the base origin.

use crate::config::SitemapFormat;
use serde_json::{json, Value};
use url::Url;

/// Renders a list of crawled URLs into a sitemap document
pub trait SitemapSerializer {
    fn serialize(&self, urls: &[String], base_url: &str) -> String;
}

/// Returns the serializer for a configured format
pub fn serializer_for(format: SitemapFormat) -> Box<dyn SitemapSerializer> {
    match format {
        SitemapFormat::Xml => Box::new(XmlSitemap::default()),
        SitemapFormat::Html => Box::new(HtmlSitemap),
        SitemapFormat::Tree => Box::new(TreeJson),
    }
}

/// sitemaps.org `urlset` document
#[derive(Debug, Clone, Default)]
pub struct XmlSitemap {
    /// W3C date written as `<lastmod>` on every entry
    pub lastmod: Option<String>,
}

impl XmlSitemap {
    pub fn with_lastmod(lastmod: impl Into<String>) -> Self {
        Self {
            lastmod: Some(lastmod.into()),
        }
    }
}

impl SitemapSerializer for XmlSitemap {
    fn serialize(&self, urls: &[String], _base_url: &str) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for url in urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_markup(url)));
            if let Some(lastmod) = &self.lastmod {
                xml.push_str(&format!("    <lastmod>{}</lastmod>\n", escape_markup(lastmod)));
            }
            xml.push_str("  </url>\n");
        }
        xml.push_str("</urlset>\n");
        xml
    }
}

/// Human-readable page with the site as nested lists, one level per path segment
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSitemap;

impl SitemapSerializer for HtmlSitemap {
    fn serialize(&self, urls: &[String], base_url: &str) -> String {
        let tree = SiteTree::build(urls, base_url);
        let title = format!("Sitemap for {}", escape_markup(base_url));

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", title));
        html.push_str(&format!("<h1>{}</h1>\n<ul>\n", title));
        write_html_node(&tree.root, 1, &mut html);
        html.push_str("</ul>\n</body>\n</html>\n");
        html
    }
}

fn write_html_node(node: &TreeNode, level: usize, out: &mut String) {
    let indent = "  ".repeat(level);
    let label = escape_markup(&node.name);
    match &node.url {
        Some(url) => out.push_str(&format!(
            "{}<li><a href=\"{}\">{}</a>",
            indent,
            escape_markup(url),
            label
        )),
        None => out.push_str(&format!("{}<li>{}", indent, label)),
    }

    if node.children.is_empty() {
        out.push_str("</li>\n");
        return;
    }

    out.push_str(&format!("\n{}  <ul>\n", indent));
    for child in &node.children {
        write_html_node(child, level + 2, out);
    }
    out.push_str(&format!("{}  </ul>\n{}</li>\n", indent, indent));
}

/// Hierarchical `{name, url, children}` JSON for tree visualizations
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeJson;

impl TreeJson {
    pub fn to_value(&self, urls: &[String], base_url: &str) -> Value {
        node_to_json(&SiteTree::build(urls, base_url).root)
    }
}

impl SitemapSerializer for TreeJson {
    fn serialize(&self, urls: &[String], base_url: &str) -> String {
        format!("{:#}", self.to_value(urls, base_url))
    }
}

fn node_to_json(node: &TreeNode) -> Value {
    json!({
        "name": node.name,
        "url": node.url,
        "children": node.children.iter().map(node_to_json).collect::<Vec<_>>(),
    })
}

/// URLs arranged by path segment under the site root
#[derive(Debug)]
struct SiteTree {
    root: TreeNode,
}

#[derive(Debug)]
struct TreeNode {
    name: String,
    /// Set when this exact path was crawled
    url: Option<String>,
    /// Discovery order
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            url: None,
            children: Vec::new(),
        }
    }

    fn child_mut(&mut self, name: &str) -> &mut TreeNode {
        let index = match self.children.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.children.push(TreeNode::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

impl SiteTree {
    fn build(urls: &[String], base_url: &str) -> Self {
        let root_name = Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| base_url.to_string());
        let mut root = TreeNode::new(&root_name);

        for raw in urls {
            let Ok(url) = Url::parse(raw) else {
                continue;
            };

            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).collect())
                .unwrap_or_default();

            let mut node = &mut root;
            for segment in segments {
                node = node.child_mut(segment);
            }
            if node.url.is_none() {
                node.url = Some(raw.clone());
            }
        }

        Self { root }
    }
}

/// Escapes text for XML and HTML output
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> Vec<String> {
        vec![
            "https://a.com/".to_string(),
            "https://a.com/docs".to_string(),
            "https://a.com/docs/intro".to_string(),
            "https://a.com/blog/2024/hello".to_string(),
        ]
    }

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape_markup("https://a.com/?a=1&b=<2>"),
            "https://a.com/?a=1&amp;b=&lt;2&gt;"
        );
    }

    #[test]
    fn test_xml_sitemap() {
        let xml = XmlSitemap::default().serialize(
            &["https://a.com/".to_string(), "https://a.com/s?q=1&p=2".to_string()],
            "https://a.com",
        );
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">"));
        assert!(xml.contains("<loc>https://a.com/</loc>"));
        assert!(xml.contains("<loc>https://a.com/s?q=1&amp;p=2</loc>"));
        assert_eq!(xml.matches("<url>").count(), 2);
        assert!(!xml.contains("<lastmod>"));
    }

    #[test]
    fn test_xml_sitemap_lastmod() {
        let xml = XmlSitemap::with_lastmod("2026-10-16")
            .serialize(&["https://a.com/".to_string()], "https://a.com");
        assert!(xml.contains("<lastmod>2026-10-16</lastmod>"));
    }

    #[test]
    fn test_tree_json_structure() {
        let value = TreeJson.to_value(&urls(), "https://a.com");

        assert_eq!(value["name"], "a.com");
        assert_eq!(value["url"], "https://a.com/");

        let children = value["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["name"], "docs");
        assert_eq!(children[0]["url"], "https://a.com/docs");
        assert_eq!(children[0]["children"][0]["name"], "intro");

        // Intermediate segments that were never crawled have no URL
        assert_eq!(children[1]["name"], "blog");
        assert!(children[1]["url"].is_null());
        assert_eq!(children[1]["children"][0]["name"], "2024");
        assert_eq!(
            children[1]["children"][0]["children"][0]["url"],
            "https://a.com/blog/2024/hello"
        );
    }

    #[test]
    fn test_tree_json_serializes_valid_json() {
        let text = TreeJson.serialize(&urls(), "https://a.com");
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["name"], "a.com");
    }

    #[test]
    fn test_html_sitemap_nesting() {
        let html = HtmlSitemap.serialize(&urls(), "https://a.com");
        assert!(html.contains("<title>Sitemap for https://a.com</title>"));
        assert!(html.contains("<a href=\"https://a.com/docs/intro\">intro</a>"));
        assert!(html.contains("<li>blog"));
        // root + docs + blog + 2024 each open a nested list
        assert_eq!(html.matches("<ul>").count(), 5);
        assert_eq!(html.matches("<ul>").count(), html.matches("</ul>").count());
    }

    #[test]
    fn test_serializer_for_format() {
        let urls = vec!["https://a.com/".to_string()];
        assert!(serializer_for(SitemapFormat::Xml)
            .serialize(&urls, "https://a.com")
            .contains("<urlset"));
        assert!(serializer_for(SitemapFormat::Html)
            .serialize(&urls, "https://a.com")
            .contains("<html"));
        assert!(serializer_for(SitemapFormat::Tree)
            .serialize(&urls, "https://a.com")
            .starts_with('{'));
    }

    #[test]
    fn test_empty_url_list() {
        let xml = XmlSitemap::default().serialize(&[], "https://a.com");
        assert!(!xml.contains("<url>"));
        let tree = TreeJson.to_value(&[], "https://a.com");
        assert!(tree["children"].as_array().unwrap().is_empty());
    }
}
