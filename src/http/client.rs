use anyhow::{Context, Result};
use futures_util::StreamExt;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::io::Write;

/// Thin wrapper over reqwest for the two transfers the engine performs:
/// fetching JSON documents and streaming artifact downloads.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let response = response
            .error_for_status()
            .context("Server rejected the request")?;

        response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")
    }

    /// Streams a URL into a writer produced by `create_writer`.
    /// Returns the number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let response = response
            .error_for_status()
            .context("Server rejected the download")?;

        let mut writer = create_writer()?;
        let mut stream = response.bytes_stream();
        let mut total: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read response body")?;
            writer
                .write_all(&chunk)
                .context("Failed to write downloaded data")?;
            total += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded data")?;

        debug!("Downloaded {} bytes from {}", total, url);
        Ok(total)
    }
}
