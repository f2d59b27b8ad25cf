pub mod bm25;
pub mod dense;
pub mod embedding;
pub mod rerank;

pub use bm25::Bm25Index;
pub use dense::DenseIndex;
pub use embedding::{EmbeddingCache, EmbeddingProvider, HttpEmbedding};

use std::{future::Future, pin::Pin};

use color_eyre::{
	Result,
	eyre::{self, WrapErr},
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bearer auth followed by the provider's `default_headers`. Errors name the offending header.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::with_capacity(default_headers.len() + 1);
	let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
		.wrap_err("Provider api_key is not a valid header value.")?;

	headers.insert(AUTHORIZATION, bearer);

	for (key, value) in default_headers {
		let raw =
			value.as_str().ok_or_else(|| eyre::eyre!("Default header {key:?} must be a string."))?;
		let name = HeaderName::from_bytes(key.as_bytes())
			.wrap_err_with(|| format!("Default header name {key:?} is invalid."))?;
		let value = HeaderValue::from_str(raw)
			.wrap_err_with(|| format!("Default header {key:?} has an invalid value."))?;

		headers.insert(name, value);
	}

	Ok(headers)
}
