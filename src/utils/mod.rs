//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Build the `sendMessage` endpoint for a bot: `{base}/bot{token}/sendMessage`.
///
/// A trailing slash on the base URL is ignored.
pub fn send_message_url(base_url: &str, bot_token: &str) -> String {
    format!(
        "{}/bot{}/sendMessage",
        base_url.trim_end_matches('/'),
        bot_token
    )
}

/// Check whether a URL string parses as an absolute HTTPS URL.
pub fn is_https(url_str: &str) -> bool {
    Url::parse(url_str)
        .map(|u| u.scheme() == "https")
        .unwrap_or(false)
}
