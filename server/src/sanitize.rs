const MAX_USERNAME_CHARS: usize = 32;
const FALLBACK_USERNAME: &str = "anonymous";

/// Makes an untrusted display name safe to store and show to other users.
///
/// Control characters are dropped, the name is trimmed and shortened, and
/// HTML-significant characters are escaped.
pub fn sanitize_username(raw: &str) -> String {
    let visible: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_USERNAME_CHARS)
        .collect();

    if visible.is_empty() {
        return String::from(FALLBACK_USERNAME);
    }

    html_escape::encode_quoted_attribute(&visible).into_owned()
}
