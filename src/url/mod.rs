//! URL handling module for Ripple-Fetch
//!
//! This module turns raw `<img src>` references into request targets:
//! page-relative resolution, the simulated-panic marker, and the
//! attempt-scoped failure countdown used to exercise retries.

mod countdown;
mod resolve;

use crate::UrlError;
use std::fmt;
use url::Url;

// Re-export main functions
pub use countdown::{apply_countdown, COUNTDOWN_PARAM};
pub use resolve::{has_panic_marker, resolve_reference, PANIC_MARKER};

/// A fully qualified request target for one download attempt
///
/// Owned by the attempt that derived it and discarded afterwards; the next
/// attempt derives a fresh one from the original reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// The URL actually requested
    pub url: Url,

    /// The failure countdown sent with this attempt, if any
    pub countdown: Option<u32>,
}

impl ResolvedTarget {
    /// Returns the percent-decoded last path segment, used as the
    /// destination file name
    ///
    /// `None` when the path is empty or ends with `/`, or when the decoded
    /// segment is not a plain file name (`.`, `..`, or containing a path
    /// separator or NUL).
    pub fn file_name(&self) -> Option<String> {
        let segment = self
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())?;
        let name = urlencoding::decode(segment).ok()?;

        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        plain.then(|| name.into_owned())
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Derives the request target for one attempt of a download
///
/// Resolves `reference` against `base`, then applies the failure countdown
/// for `attempt` (1-based). Each call starts again from the original
/// reference, so the countdown never depends on what earlier attempts sent.
///
/// # Panics
///
/// Panics when the resolved query carries the [`PANIC_MARKER`] key. Such a
/// reference is broken in a way no retry can fix; the task pool catches the
/// panic at the task boundary and reports it as that task's outcome.
///
/// # Examples
///
/// ```
/// use ripple_fetch::url::locate;
/// use url::Url;
///
/// let base = Url::parse("http://localhost:8080/html/step10.html").unwrap();
/// let target = locate(&base, "/img/ok/a.png?ng=2", 2).unwrap();
/// assert_eq!(target.url.as_str(), "http://localhost:8080/img/ok/a.png?ng=1");
/// assert_eq!(target.countdown, Some(1));
/// assert_eq!(target.file_name().as_deref(), Some("a.png"));
/// ```
pub fn locate(base: &Url, reference: &str, attempt: u32) -> Result<ResolvedTarget, UrlError> {
    let mut url = resolve_reference(base, reference)?;

    if has_panic_marker(&url) {
        panic!("panic {}", reference);
    }

    let countdown = apply_countdown(&mut url, attempt);
    tracing::trace!(reference, attempt, url = %url, "Resolved download target");

    Ok(ResolvedTarget { url, countdown })
}
