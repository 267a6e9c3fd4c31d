use url::Url;

/// Query key carrying the simulated failure countdown
pub const COUNTDOWN_PARAM: &str = "ng";

/// Rewrites the failure countdown for the given attempt
///
/// The countdown is always derived from the value in `url` as resolved from
/// the original reference, so repeated calls never compound. Attempt `k`
/// (1-based) sends `initial - (k - 1)`; once that reaches zero the parameter
/// is removed entirely. A missing or non-numeric parameter is left untouched.
///
/// # Returns
///
/// The countdown value actually sent with this attempt, if any.
///
/// # Examples
///
/// ```
/// use ripple_fetch::url::apply_countdown;
/// use url::Url;
///
/// let mut url = Url::parse("http://localhost/img/ok/a.png?ng=2").unwrap();
/// assert_eq!(apply_countdown(&mut url, 2), Some(1));
/// assert_eq!(url.query(), Some("ng=1"));
/// ```
pub fn apply_countdown(url: &mut Url, attempt: u32) -> Option<u32> {
    let initial = url
        .query_pairs()
        .find(|(key, _)| key == COUNTDOWN_PARAM)
        .and_then(|(_, value)| value.parse::<u32>().ok())?;

    let remaining = initial.saturating_sub(attempt.saturating_sub(1));

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != COUNTDOWN_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() && remaining == 0 {
        url.set_query(None);
        return None;
    }

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept.iter());
        if remaining > 0 {
            pairs.append_pair(COUNTDOWN_PARAM, &remaining.to_string());
        }
    }

    (remaining > 0).then_some(remaining)
}
