// ─── Retrieval Layer ───
// Supplies parsed manifest documents from local files and URLs. Redirects
// are followed manually so each hop carries the previous target as its
// referer; failures surface as diagnostics and an absent document, never
// as a panic.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, LOCATION, REFERER};
use url::Url;

use crate::core::diag::{Diagnostic, DiagnosticSink};
use crate::core::error::{PackError, PackResult};
use crate::core::http::build_http_client;
use crate::core::xml::XmlDocument;

/// Placeholder URL shipped in configuration templates. Fetching it is a
/// sign of an unconfigured client, so it short-circuits to "no document"
/// before any network access.
pub const PLACEHOLDER_PACK_URL: &str = "http://www.example.org/ServerPack.xml";

/// The redirect chain is bounded; a longer chain is treated as hostile.
const MAX_REDIRECT_HOPS: usize = 10;

/// Retrieves and parses manifest documents.
pub struct PackFetcher {
    client: Client,
    sink: Arc<dyn DiagnosticSink>,
}

impl PackFetcher {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        let client = build_http_client().expect("Failed to build HTTP client");
        Self { client, sink }
    }

    /// Read and parse a manifest from a local file.
    ///
    /// I/O and parser failures are reported separately and both yield an
    /// absent document.
    pub fn fetch_file(&self, path: &Path) -> Option<XmlDocument> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                self.sink.report(Diagnostic::error(format!(
                    "I/O error reading {}: {e}",
                    path.display()
                )));
                return None;
            }
        };
        match XmlDocument::parse(&contents) {
            Ok(doc) => Some(doc),
            Err(e) => {
                self.sink.report(Diagnostic::error(format!(
                    "Parser error in {}: {e}",
                    path.display()
                )));
                None
            }
        }
    }

    /// Fetch and parse a manifest from a URL.
    ///
    /// The empty string and [`PLACEHOLDER_PACK_URL`] return `None`
    /// without touching the network.
    pub fn fetch_url(&self, raw: &str) -> Option<XmlDocument> {
        self.sink
            .report(Diagnostic::debug(format!("fetch_url({raw})")));
        if raw.is_empty() || raw == PLACEHOLDER_PACK_URL {
            return None;
        }

        let target = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                self.sink
                    .report(Diagnostic::warning(format!("Malformed URL {raw:?}: {e}")));
                return None;
            }
        };

        let body = match self.get_following_redirects(target, None, MAX_REDIRECT_HOPS) {
            Ok(body) => body,
            Err(e) => {
                self.sink
                    .report(Diagnostic::error(format!("I/O error fetching {raw}: {e}")));
                return None;
            }
        };

        match XmlDocument::parse(&body) {
            Ok(doc) => Some(doc),
            Err(e) => {
                self.sink
                    .report(Diagnostic::error(format!("Parser error in {raw}: {e}")));
                None
            }
        }
    }

    /// Issue a GET against `target`, following 3xx responses by hand.
    ///
    /// `file:` URLs are read straight from disk with no headers. For
    /// network schemes the request carries the client's fixed
    /// `User-Agent`, a `Referer` naming the previous hop, and Basic
    /// credentials when the URL embeds userinfo.
    fn get_following_redirects(
        &self,
        target: Url,
        referer: Option<&Url>,
        hops_left: usize,
    ) -> PackResult<String> {
        if target.scheme() == "file" {
            let path = target
                .to_file_path()
                .map_err(|()| PackError::MalformedUrl(target.to_string()))?;
            return fs::read_to_string(&path).map_err(|source| PackError::Io { path, source });
        }

        // Credentials travel in the Authorization header, not the request line.
        let mut request_url = target.clone();
        let _ = request_url.set_username("");
        let _ = request_url.set_password(None);

        let mut request = self.client.get(request_url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer.as_str());
        }
        if let Some(auth) = basic_auth(&target) {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send()?;
        let status = response.status();

        if status.is_redirection() {
            if hops_left == 0 {
                return Err(PackError::TooManyRedirects {
                    url: target.to_string(),
                    limit: MAX_REDIRECT_HOPS,
                });
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| PackError::MissingLocation {
                    url: target.to_string(),
                })?;
            let next = target
                .join(location)
                .map_err(|e| PackError::MalformedUrl(format!("{location}: {e}")))?;
            return self.get_following_redirects(next, Some(&target), hops_left - 1);
        }

        if !status.is_success() {
            return Err(PackError::FetchFailed {
                url: target.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text()?)
    }
}

fn basic_auth(url: &Url) -> Option<String> {
    if url.username().is_empty() && url.password().is_none() {
        return None;
    }
    let userinfo = match url.password() {
        Some(password) => format!("{}:{password}", url.username()),
        None => url.username().to_string(),
    };
    Some(format!("Basic {}", BASE64.encode(userinfo)))
}
