mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};

/// Fetches the raw bytes of a remote dataset.
///
/// # Errors
///
/// Returns an error for an invalid URL, a failed request, or a non-success
/// status. There is no retry; an unreachable source fails the load.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse()
            .with_context(|| format!("invalid dataset URL {url}"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("fetching dataset from {url}"))?
        .error_for_status()?;

    Ok(resp.bytes().await?.to_vec())
}
