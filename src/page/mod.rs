//! Source page module
//!
//! Fetches the page named in the configuration and scans its markup for
//! image references. The download engine treats this as one atomic,
//! non-retried step.

mod fetcher;
mod parser;

pub use fetcher::{build_http_client, fetch_references};
pub use parser::{parse_html, ParsedPage};
