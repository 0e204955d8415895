use std::{
    error::Error as StdError,
    fmt::Display,
    future::Future,
    io,
    time::{Duration, Instant},
};

use anyhow::Result;
use hyper::ext::ReasonPhrase;

use crate::{address, markup};

/// What a single fetch produced. Failures are encoded here instead of being
/// returned as errors, so a page can always be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub url: String,
    /// Where the content came from once redirects were followed. Links
    /// resolve against this.
    pub final_url: String,
    pub status_label: String,
    pub status_code: Option<u16>,
    pub title: String,
    pub body: String,
    pub links: Vec<String>,
}

impl PageState {
    pub fn transport_failure(url: impl Into<String>, cause: impl Display) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status_label: "Error".into(),
            status_code: None,
            title: String::new(),
            body: format!("Request failed: {cause}"),
            links: Vec::new(),
        }
    }

    pub fn unexpected_failure(url: impl Into<String>, cause: impl Display) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status_label: "Error".into(),
            status_code: None,
            title: "Error".into(),
            body: format!("An unexpected error occurred: {cause}"),
            links: Vec::new(),
        }
    }

    /// Builds the page for a response that made it back. The title always comes
    /// from what the server sent, error statuses then get their body swapped
    /// for a readable message.
    pub fn from_response(
        url: impl Into<String>,
        code: u16,
        reason: Option<&str>,
        body: String,
    ) -> Self {
        let title = markup::extract_title(&body).unwrap_or_else(|| "No Title".into());
        let status_label = match reason {
            Some(reason) => format!("{code} {reason}"),
            None => code.to_string(),
        };
        let body = status_message(code, reason).unwrap_or(body);
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status_label,
            status_code: Some(code),
            title,
            body,
            links: Vec::new(),
        }
    }

    pub fn redirected_to(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = final_url.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.status_code
            .is_some_and(|code| (200..300).contains(&code))
    }
}

/// Message shown in place of the body for non-success statuses.
pub fn status_message(code: u16, reason: Option<&str>) -> Option<String> {
    Some(match code {
        200..=299 => return None,
        400 => "400 Bad Request: The server could not understand the request.".into(),
        403 => "403 Forbidden: You do not have permission to access this page.".into(),
        404 => "404 Not Found: The requested page could not be found.".into(),
        code => match reason {
            Some(reason) => format!("Error {code}: {reason}"),
            None => format!("Error {code}"),
        },
    })
}

pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = PageState> + Send;
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_body_bytes: 1024 * 1024 * 8,
            user_agent: concat!("trailhead/", env!("CARGO_PKG_VERSION")).into(),
            accept_invalid_certs: false,
        }
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(options.user_agent.as_str());
        if options.accept_invalid_certs {
            tracing::warn!("Certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            client: builder.build()?,
            timeout: options.timeout,
            max_body_bytes: options.max_body_bytes,
        })
    }

    async fn request(&self, url: &str) -> PageState {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => return PageState::transport_failure(url, error_chain(&err)),
        };
        let status = response.status();
        let reason =
            reason_phrase(&response).or_else(|| status.canonical_reason().map(String::from));
        let final_url = response.url().to_string();
        match self.read_body(response).await {
            Ok(body) => PageState::from_response(url, status.as_u16(), reason.as_deref(), body)
                .redirected_to(final_url),
            Err(err) if connection_lost(&err) => {
                PageState::transport_failure(url, error_chain(&err))
            }
            Err(err) => PageState::unexpected_failure(url, error_chain(&err)),
        }
    }

    async fn read_body(&self, mut response: reqwest::Response) -> reqwest::Result<String> {
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_body_bytes - bytes.len();
            if chunk.len() >= room {
                bytes.extend_from_slice(&chunk[..room]);
                tracing::warn!("Body of {} cut at {} bytes", response.url(), self.max_body_bytes);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> PageState {
        let url = address::normalize(url);
        let started = Instant::now();
        let page = match tokio::time::timeout(self.timeout, self.request(&url)).await {
            Ok(page) => page,
            Err(_) => PageState::transport_failure(
                url.as_str(),
                format!("timed out after {:.1}s", self.timeout.as_secs_f32()),
            ),
        };
        tracing::debug!(
            "Fetched {url} in {}ms: {}",
            started.elapsed().as_millis(),
            page.status_label
        );
        page
    }
}

/// reqwest keeps the useful part (dns error, connection refused...) in the
/// source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// The phrase from the status line, when the server sent one other than the
/// standard one for its code.
fn reason_phrase(response: &reqwest::Response) -> Option<String> {
    let phrase = response.extensions().get::<ReasonPhrase>()?;
    let phrase = String::from_utf8_lossy(phrase.as_bytes()).trim().to_string();
    (!phrase.is_empty()).then_some(phrase)
}

/// Whether a body read failed because the connection went away, rather than
/// because the server sent a body that could not be decoded.
fn connection_lost(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            return !matches!(
                io.kind(),
                io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput
            );
        }
        source = cause.source();
    }
    err.is_request() || err.is_body()
}
