use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::redirect::Policy;

const APP_USER_AGENT: &str = "ServerPack/0.1.0";

/// Build the blocking client shared by the retrieval layer.
///
/// Automatic redirect following is disabled: 3xx responses are handled
/// explicitly by the fetcher so each hop carries the previous target as
/// its `Referer`. Response caching is suppressed because pack manifests
/// are expected to change between launches.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .redirect(Policy::none())
        .build()
}
