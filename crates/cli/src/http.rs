//! reqwest-backed [`Transport`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context as _, Result};
use dw_client::{Transport, TransportError};
use dw_protocol::PollRequest;
use serde_json::Value;
use tracing::debug;

/// POSTs each request as JSON to one endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
	url: String,
}

impl HttpTransport {
	pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.context("failed to create HTTP client")?;
		Ok(Self { client, url: url.into() })
	}

	pub fn url(&self) -> &str {
		&self.url
	}
}

impl Transport for HttpTransport {
	fn send(&mut self, request: PollRequest) -> Pin<Box<dyn Future<Output = Result<Value, TransportError>> + Send + '_>> {
		Box::pin(async move {
			let response = self
				.client
				.post(&self.url)
				.json(&request)
				.send()
				.await
				.map_err(|e| TransportError::Network(e.to_string()))?;

			let status = response.status();
			debug!(target = "dw.transport", status = status.as_u16(), "reply");
			if !status.is_success() {
				return Err(TransportError::Status(status.as_u16()));
			}

			response
				.json::<Value>()
				.await
				.map_err(|e| TransportError::Malformed(e.to_string()))
		})
	}
}
