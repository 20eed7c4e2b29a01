//! URL normalization applied before links are stored or looked up.

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

/// Prefix `http://` unless the URL already starts with `http://` or
/// `https://`. Nothing else is validated: empty or non-URL text is prefixed
/// and passed through.
///
/// The check is case-sensitive, so `HTTP://example.com` becomes
/// `http://HTTP://example.com`.
pub fn normalize(url: &str) -> String {
    if url.starts_with(HTTP) || url.starts_with(HTTPS) {
        url.to_string()
    } else {
        format!("{HTTP}{url}")
    }
}
