//! Utility functions for filename derivation and path sanitising

/// Characters that cannot appear in a single path component on common filesystems
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Derive a filename from the last path segment of a file locator
///
/// Query strings and fragments are ignored. Returns `None` when the locator has
/// no non-empty final segment or the segment sanitises to nothing.
///
/// # Examples
///
/// ```
/// use gallery_mirror::utils::filename_from_url;
///
/// assert_eq!(
///     filename_from_url("https://d.example.net/art/someone/1433091783/1433091783.someone_fox.png"),
///     Some("1433091783.someone_fox.png".to_string())
/// );
/// assert_eq!(filename_from_url("https://d.example.net/art/"), None);
/// ```
pub fn filename_from_url(file_url: &str) -> Option<String> {
    let segment = match url::Url::parse(file_url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|s| s.to_string()),
        // Scheme-less locators: strip query/fragment and split by hand
        Err(_) => file_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(|s| s.to_string()),
    }?;

    let decoded = percent_decode(&segment);
    let name = sanitize_component(&decoded);
    if name.is_empty() { None } else { Some(name) }
}

/// Make a string safe to use as one path component
///
/// Replaces separators and reserved characters with `_`, drops control
/// characters, and neutralises `.` and `..` so the component can never
/// escape its parent directory.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

/// Decode `%XX` escapes, leaving malformed escapes untouched
fn percent_decode(segment: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned()
}
