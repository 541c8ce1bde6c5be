//! Field extraction from line-oriented client output.
//!
//! Client responses come as `Label: value` specs (`client -o`) or as
//! `... label value` tagged records (`fstat`). [`extract_field`] treats the
//! label as a literal prefix of a trimmed line, so a token that merely
//! appears inside a longer line never matches.

/// Lines starting with this marker are comments.
const COMMENT_MARKER: char = '#';

/// Returns the value following the first line that starts with `label`.
///
/// Lines are trimmed before matching; blank lines and comment lines are
/// skipped. The value is the rest of the line with surrounding whitespace
/// removed. Returns `None` when `text` or `label` is empty or no line
/// matches.
///
/// # Examples
///
/// ```
/// use p4scc_engine::extract_field;
///
/// let spec = "# A workspace spec\nClient:\tws\nRoot:\t/home/alice/ws\n";
/// assert_eq!(extract_field(spec, "Root:").as_deref(), Some("/home/alice/ws"));
/// assert_eq!(extract_field(spec, "AltRoots:"), None);
/// ```
#[must_use]
pub fn extract_field(text: &str, label: &str) -> Option<String> {
    if label.is_empty() {
        return None;
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .find_map(|line| line.strip_prefix(label))
        .map(|value| value.trim().to_owned())
}
