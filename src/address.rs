/// Turns whatever was typed in the address line into an absolute URL.
///
/// Input that already carries an `http://` or `https://` prefix is returned as
/// is, anything else gets `https://` in front of it.
pub fn normalize(input: &str) -> String {
    if input.starts_with("http://") || input.starts_with("https://") {
        return input.to_string();
    }
    format!("https://{input}")
}

pub fn is_blank(input: &str) -> bool {
    input.trim().is_empty()
}
