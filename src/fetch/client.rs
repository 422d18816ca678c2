use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam over the HTTP client so dataset fetching can be exercised
/// without the network.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
