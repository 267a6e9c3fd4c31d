use crate::UrlError;
use url::Url;

/// Query key whose presence marks a reference as unrecoverably broken
pub const PANIC_MARKER: &str = "panic";

/// Resolves a raw image reference against the page it was found on
///
/// # Resolution Rules
///
/// 1. Absolute `http`/`https` references are used as-is; other schemes are rejected
/// 2. References starting with `/` replace the base path; a `?query` part
///    replaces the base query, otherwise the base query is kept
/// 3. Anything else is path-joined onto the full base path (the page name
///    included), with `.`, `..` and empty segments cleaned away
///
/// # Arguments
///
/// * `base` - URL of the page the reference was extracted from
/// * `reference` - The raw `src` value
///
/// # Examples
///
/// ```
/// use ripple_fetch::url::resolve_reference;
/// use url::Url;
///
/// let base = Url::parse("http://localhost:8080/html/step10.html").unwrap();
/// let url = resolve_reference(&base, "/img/ok/a.png?d=1s").unwrap();
/// assert_eq!(url.as_str(), "http://localhost:8080/img/ok/a.png?d=1s");
/// ```
pub fn resolve_reference(base: &Url, reference: &str) -> Result<Url, UrlError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(UrlError::Malformed("empty image reference".to_string()));
    }

    if !reference.starts_with('/') {
        match Url::parse(reference) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => return Ok(url),
            Ok(url) => return Err(UrlError::InvalidScheme(url.scheme().to_string())),
            Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(e) => return Err(UrlError::Parse(format!("{}: {}", reference, e))),
        }
    }

    let (path, query) = split_query(reference);
    let mut url = base.clone();
    url.set_fragment(None);

    if reference.starts_with('/') {
        url.set_path(path);
    } else {
        url.set_path(&join_path(base.path(), path));
    }

    if let Some(query) = query {
        url.set_query(Some(query));
    }

    Ok(url)
}

/// Returns true if the URL's query carries the simulated-panic marker
pub fn has_panic_marker(url: &Url) -> bool {
    url.query_pairs().any(|(key, _)| key == PANIC_MARKER)
}

/// Splits `path?query` at the first `?`
fn split_query(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (reference, None),
    }
}

/// Joins `reference` onto `base` segment by segment,
/// dropping empty and `.` segments and letting `..` pop
fn join_path(base: &str, reference: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in base.split('/').chain(reference.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut joined = format!("/{}", segments.join("/"));
    if reference.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}
