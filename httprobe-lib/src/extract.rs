//! Page title extraction from a bounded body prefix.

const TITLE_OPEN: &str = "<title>";
const TITLE_CLOSE: &str = "</title>";

/// Extract the first `<title>...</title>` span from `body`.
///
/// Tags are matched case-insensitively. The title is trimmed and runs of
/// whitespace inside it are collapsed to a single space. Returns `None` if
/// there is no complete title element or if it is blank.
///
/// ```
/// use httprobe_lib::extract::extract_title;
///
/// assert_eq!(
///     extract_title("<TITLE>  Foo\n Bar  </TITLE>"),
///     Some("Foo Bar".to_string())
/// );
/// assert_eq!(extract_title("<p>no title here</p>"), None);
/// ```
#[must_use]
pub fn extract_title(body: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets identical to `body`
    let lower = body.to_ascii_lowercase();
    let start = lower.find(TITLE_OPEN)? + TITLE_OPEN.len();
    let end = start + lower[start..].find(TITLE_CLOSE)?;

    let title = body[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() { None } else { Some(title) }
}
