use std::time::Duration;

use image::DynamicImage;

use crate::detect::error::DetectError;

/// Downloads and decodes source images. One shared client, bounded timeout;
/// failures are never retried here.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DetectError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<DynamicImage, DetectError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let image = image::load_from_memory(&bytes)?;
        Ok(image)
    }
}
