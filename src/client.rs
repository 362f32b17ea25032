//! The Crossref REST API client.

use crate::error::{ResolveError, Result};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default Crossref API root.
pub const DEFAULT_BASE_URL: &str = "https://api.crossref.org/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Async client for the Crossref `/works` search endpoint.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> refdoi::error::Result<()> {
/// use refdoi::{CrossrefClient, Registry};
///
/// let client = CrossrefClient::from_env().with_mailto("curator@example.org");
/// let reference = refdoi::references::parse_block(
///     "[1] S. M. George, Chem. Rev. 2010, 110, 111.",
///     1,
/// );
/// let candidates = client.query(&reference, 5).await?;
/// for c in &candidates {
///     println!("{} {:?}", c.doi, c.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CrossrefClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) mailto: Option<String>,
}

impl CrossrefClient {
    /// Create a client without a contact address.
    pub fn new() -> Self {
        Self {
            http: build_http(DEFAULT_TIMEOUT),
            base_url: DEFAULT_BASE_URL.to_string(),
            mailto: None,
        }
    }

    /// Create a client using the `CROSSREF_MAILTO` environment variable as
    /// contact address, if set.
    pub fn from_env() -> Self {
        let client = Self::new();
        match std::env::var("CROSSREF_MAILTO") {
            Ok(mailto) if !mailto.trim().is_empty() => client.with_mailto(mailto),
            _ => client,
        }
    }

    /// Set the contact address sent in the User-Agent (Crossref "polite pool").
    pub fn with_mailto(mut self, mailto: impl Into<String>) -> Self {
        let mailto = mailto.into();
        self.mailto = (!mailto.trim().is_empty()).then(|| mailto.trim().to_string());
        self
    }

    /// Override the base URL (useful for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_http(timeout);
        self
    }

    /// User-Agent header value.
    pub fn user_agent(&self) -> String {
        match &self.mailto {
            Some(mailto) => format!(
                "refdoi/{} (mailto:{})",
                env!("CARGO_PKG_VERSION"),
                mailto
            ),
            None => format!("refdoi/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Resolve `path` against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?.join(path)?)
    }

    /// Make a GET request to the Crossref API.
    pub(crate) async fn get(&self, path: &str, params: &[(String, String)]) -> Result<String> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .header("User-Agent", self.user_agent())
            .query(params)
            .send()
            .await?;

        handle_response(response).await
    }
}

impl Default for CrossrefClient {
    fn default() -> Self {
        Self::new()
    }
}

fn build_http(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

/// Handle the HTTP response, mapping status codes to errors.
async fn handle_response(response: reqwest::Response) -> Result<String> {
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response.text().await?),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(ResolveError::RateLimited { retry_after })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ResolveError::Api {
                status,
                message: body,
            })
        }
    }
}
