//! HTTP helpers.
//!
//! Each helper awaits a single request to completion and fails on any
//! non-success status. Nothing is retried.

use reqwest::Client;

use crate::ScrapeError;

/// Builds the HTTP client shared by one ingestion run.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the TLS backend cannot be initialised.
pub fn build_client() -> Result<Client, ScrapeError> {
    Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .map_err(ScrapeError::Http)
}

/// Fetches `url` and returns the body as text.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the request fails or the server
/// answers with an error status.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, ScrapeError> {
    log::debug!("GET {url}");
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;
    log::debug!("Fetched {} bytes of text from {url}", body.len());
    Ok(body)
}

/// Fetches `url` and returns the raw body.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the request fails or the server
/// answers with an error status.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>, ScrapeError> {
    log::debug!("GET {url}");
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    log::debug!("Downloaded {} bytes from {url}", bytes.len());
    Ok(bytes.to_vec())
}
