//! HTML parser for extracting image references
//!
//! References are returned verbatim; resolution against the page URL is the
//! locator's job and happens per attempt.

use scraper::{Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Every usable `<img src>` value, in document order
    pub image_sources: Vec<String>,
}

/// Parses HTML content and extracts image references
///
/// # Extraction Rules
///
/// **Include:**
/// - The `src` attribute of every `<img>` element, in document order
///
/// **Exclude:**
/// - Empty or whitespace-only `src` values
/// - `data:` URIs (inline images, nothing to download)
///
/// # Example
///
/// ```
/// use ripple_fetch::page::parse_html;
///
/// let html = r#"<html><body><img src="/img/ok/a.png"><img src="b.png"></body></html>"#;
/// let parsed = parse_html(html).unwrap();
/// assert_eq!(parsed.image_sources, vec!["/img/ok/a.png", "b.png"]);
/// ```
pub fn parse_html(html: &str) -> Result<ParsedPage, String> {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let image_sources = extract_image_sources(&document)?;

    Ok(ParsedPage {
        title,
        image_sources,
    })
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_image_sources(document: &Html) -> Result<Vec<String>, String> {
    let selector = Selector::parse("img[src]").map_err(|e| format!("{:?}", e))?;

    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(str::to_string)
        .collect())
}
