use std::{collections::HashMap, sync::Arc, time::Duration};

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};

use keel_config::EmbeddingProviderConfig;

use crate::BoxFuture;

/// Turns texts into vectors. Returns one vector per text, in input order.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Embedding provider backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedding {
	cfg: EmbeddingProviderConfig,
}
impl HttpEmbedding {
	pub fn new(cfg: EmbeddingProviderConfig) -> Self {
		Self { cfg }
	}
}

impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(embed(&self.cfg, texts))
	}
}

/// Query vectors keyed by the exact query text.
///
/// Concurrent lookups of one text share a single provider call. Failed calls are not kept, so
/// the next lookup asks the provider again. The map is cleared once it holds `capacity` texts.
pub struct EmbeddingCache {
	provider: Arc<dyn EmbeddingProvider>,
	capacity: usize,
	entries: Mutex<HashMap<String, Arc<OnceCell<Vec<f32>>>>>,
}
impl EmbeddingCache {
	pub fn new(provider: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
		Self { provider, capacity: capacity.max(1), entries: Mutex::new(HashMap::new()) }
	}

	pub async fn len(&self) -> usize {
		self.entries.lock().await.values().filter(|cell| cell.initialized()).count()
	}

	pub async fn get(&self, text: &str) -> Result<Vec<f32>> {
		let cell = {
			let mut entries = self.entries.lock().await;

			if entries.len() >= self.capacity && !entries.contains_key(text) {
				tracing::debug!(capacity = self.capacity, "Query embedding cache cleared.");

				entries.clear();
			}

			entries.entry(text.to_string()).or_default().clone()
		};
		let vector = cell
			.get_or_try_init(|| async {
				let texts = [text.to_string()];
				let vectors = self.provider.embed(&texts).await?;

				vectors
					.into_iter()
					.next()
					.ok_or_else(|| eyre::eyre!("Embedding response is empty."))
			})
			.await?;

		Ok(vector.clone())
	}
}

pub async fn embed(cfg: &EmbeddingProviderConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(format!("{}{}", cfg.api_base, cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(&json, texts.len())?;

	check_dimensions(&vectors, cfg.dimensions)?;

	tracing::debug!(texts = texts.len(), dimensions = cfg.dimensions, "Texts embedded.");

	Ok(vectors)
}

/// Places each `data[i].embedding` at its `index`. Every input slot must be filled exactly once.
fn parse_embedding_response(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(Value::as_array)
		.ok_or_else(|| eyre::eyre!("Embedding response is missing data array."))?;
	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

	for (position, item) in data.iter().enumerate() {
		let index = item.get("index").and_then(Value::as_u64).map_or(position, |v| v as usize);
		let slot = slots.get_mut(index).ok_or_else(|| {
			eyre::eyre!("Embedding index {index} is out of range for {expected} inputs.")
		})?;

		if slot.is_some() {
			return Err(eyre::eyre!("Embedding index {index} appears more than once."));
		}

		let values = item
			.get("embedding")
			.and_then(Value::as_array)
			.ok_or_else(|| eyre::eyre!("Embedding item {index} is missing embedding array."))?;
		let vector = values
			.iter()
			.map(|value| value.as_f64().map(|number| number as f32))
			.collect::<Option<Vec<_>>>()
			.ok_or_else(|| eyre::eyre!("Embedding item {index} has a non-numeric value."))?;

		*slot = Some(vector);
	}

	slots
		.into_iter()
		.enumerate()
		.map(|(index, slot)| {
			slot.ok_or_else(|| eyre::eyre!("Embedding response has no vector for input {index}."))
		})
		.collect()
}

fn check_dimensions(vectors: &[Vec<f32>], dimensions: u32) -> Result<()> {
	for (index, vector) in vectors.iter().enumerate() {
		if vector.len() != dimensions as usize {
			return Err(eyre::eyre!(
				"Embedding {index} has {} dimensions; expected {dimensions}.",
				vector.len()
			));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	/// Echoes the text length as a one-dimensional vector and counts calls. The first
	/// `failures` calls fail.
	struct CountingEmbedding {
		calls: AtomicUsize,
		failures: usize,
	}
	impl CountingEmbedding {
		fn new(failures: usize) -> Arc<Self> {
			Arc::new(Self { calls: AtomicUsize::new(0), failures })
		}
	}

	impl EmbeddingProvider for CountingEmbedding {
		fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				tokio::time::sleep(Duration::from_millis(20)).await;

				if call < self.failures {
					return Err(eyre::eyre!("Embedding endpoint returned 503."));
				}

				Ok(texts.iter().map(|text| vec![text.len() as f32]).collect())
			})
		}
	}

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(&json, 2).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn rejects_non_numeric_values() {
		let json = serde_json::json!({ "data": [{ "index": 0, "embedding": ["x"] }] });

		assert!(parse_embedding_response(&json, 1).is_err());
	}

	#[test]
	fn rejects_missing_and_repeated_slots() {
		let short = serde_json::json!({ "data": [{ "index": 0, "embedding": [1.0] }] });
		let repeated = serde_json::json!({
			"data": [
				{ "index": 0, "embedding": [1.0] },
				{ "index": 0, "embedding": [2.0] }
			]
		});
		let outside = serde_json::json!({ "data": [{ "index": 3, "embedding": [1.0] }] });

		assert!(parse_embedding_response(&short, 2).is_err());
		assert!(parse_embedding_response(&repeated, 2).is_err());
		assert!(parse_embedding_response(&outside, 1).is_err());
	}

	#[test]
	fn dimensions_must_match_configuration() {
		check_dimensions(&[vec![0.0; 3], vec![1.0; 3]], 3).expect("Matching dimensions pass.");

		let err = check_dimensions(&[vec![0.0; 3], vec![1.0; 2]], 3)
			.expect_err("Expected dimension mismatch.");

		assert_eq!(err.to_string(), "Embedding 1 has 2 dimensions; expected 3.");
	}

	#[tokio::test]
	async fn concurrent_lookups_share_one_call() {
		let provider = CountingEmbedding::new(0);
		let cache = EmbeddingCache::new(provider.clone(), 8);
		let (a, b, c, d) = tokio::join!(
			cache.get("pump seal"),
			cache.get("pump seal"),
			cache.get("pump seal"),
			cache.get("pump seal"),
		);

		for vector in [a, b, c, d] {
			assert_eq!(vector.expect("Lookup must succeed."), vec![9.0]);
		}

		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
		assert_eq!(cache.get("pump seal").await.expect("Cached lookup must succeed."), vec![9.0]);
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn failures_are_retried_not_cached() {
		let provider = CountingEmbedding::new(1);
		let cache = EmbeddingCache::new(provider.clone(), 8);

		assert!(cache.get("valve").await.is_err());
		assert_eq!(cache.len().await, 0);
		assert_eq!(cache.get("valve").await.expect("Retry must succeed."), vec![5.0]);
		assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn full_cache_starts_over() {
		let provider = CountingEmbedding::new(0);
		let cache = EmbeddingCache::new(provider.clone(), 2);

		for text in ["a", "bb", "ccc"] {
			cache.get(text).await.expect("Lookup must succeed.");
		}

		assert_eq!(cache.len().await, 1);

		cache.get("a").await.expect("Lookup must succeed.");

		assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
	}
}
