//! Image generation interface

use async_trait::async_trait;

use crate::error::Result;
use crate::service::ProviderId;
use crate::types::image::{ImageRequest, ImageResponse};

/// Image generation interface
#[async_trait]
pub trait ImageGeneration: Send + Sync + 'static {
    /// Generate images for a request
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse>;

    /// Generate a batch of requests.
    ///
    /// Default runs them sequentially; providers with native batch
    /// endpoints override this.
    async fn generate_batch(&self, requests: Vec<ImageRequest>) -> Result<Vec<ImageResponse>> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.generate_image(request).await?);
        }
        Ok(responses)
    }

    /// Advisory cost estimate in USD
    fn estimate_cost(&self, request: &ImageRequest) -> f64;

    /// Provider identity propagated into every response
    fn provider_id(&self) -> ProviderId;
}
