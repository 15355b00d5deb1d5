/// Turn an attribute key into a valid Prometheus label name.
///
/// Characters outside `[a-zA-Z0-9_]` become `_` and a leading digit gets an
/// underscore prefix, so `http.status_code` maps to `http_status_code`.
pub fn sanitize_label_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
