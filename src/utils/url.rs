//! Joining base URLs and endpoint paths without doubled or missing slashes.

/// Strips trailing slashes so endpoint paths can be appended safely.
///
/// ```
/// use mental_coach::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("https://api.openai.com/v1"), "https://api.openai.com/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// ```
/// use mental_coach::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/api/chat/stream"),
///     "http://localhost:8000/api/chat/stream"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slashes_and_whitespace() {
        assert_eq!(
            normalize_base_url(" http://localhost:8000/// "),
            "http://localhost:8000"
        );
        assert_eq!(
            normalize_base_url("https://coach.example.org"),
            "https://coach.example.org"
        );
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn construct_joins_relay_endpoints() {
        assert_eq!(
            construct_api_url("http://localhost:8000", "api/chat"),
            "http://localhost:8000/api/chat"
        );
        assert_eq!(
            construct_api_url("https://coach.example.org/relay/", "//api/chat/stream"),
            "https://coach.example.org/relay/api/chat/stream"
        );
        assert_eq!(
            construct_api_url("https://api.openai.com/v1/", "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
