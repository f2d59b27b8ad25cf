use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use color_eyre::{Result, eyre};

use crate::embedding::{EmbeddingCache, EmbeddingProvider};

const QUERY_CACHE_CAPACITY: usize = 256;

/// Nearest-neighbor search over precomputed item vectors.
///
/// Query vectors are cached by text, so the tiers of one query embed it once.
#[derive(Default)]
pub struct DenseIndex {
	vectors: HashMap<String, Vec<f32>>,
	embedding: Option<EmbeddingCache>,
}
impl DenseIndex {
	pub fn new<'a, I>(vectors: I, embedding: Option<Arc<dyn EmbeddingProvider>>) -> Self
	where
		I: IntoIterator<Item = (&'a str, &'a [f32])>,
	{
		let vectors = vectors.into_iter().map(|(id, vec)| (id.to_string(), vec.to_vec())).collect();
		let embedding =
			embedding.map(|provider| EmbeddingCache::new(provider, QUERY_CACHE_CAPACITY));

		Self { vectors, embedding }
	}

	pub fn len(&self) -> usize {
		self.vectors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vectors.is_empty()
	}

	/// Embeds `query` through the configured provider, then ranks eligible ids by cosine
	/// similarity.
	pub async fn search(
		&self,
		query: &str,
		eligible: &[String],
		width: usize,
	) -> Result<Vec<String>> {
		let cache = self
			.embedding
			.as_ref()
			.ok_or_else(|| eyre::eyre!("Embedding provider is not configured."))?;
		let query_vec = cache.get(query).await?;

		Ok(self.search_by_vector(&query_vec, eligible, width))
	}

	pub fn search_by_vector(
		&self,
		query: &[f32],
		eligible: &[String],
		width: usize,
	) -> Vec<String> {
		if width == 0 || query.is_empty() {
			return Vec::new();
		}

		let mut scored: Vec<(&str, f32)> = Vec::new();

		for id in eligible {
			let Some(vec) = self.vectors.get(id) else { continue };

			if vec.len() != query.len() {
				tracing::warn!(
					item_id = %id,
					expected = query.len(),
					actual = vec.len(),
					"Vector dimension mismatch."
				);

				continue;
			}

			if let Some(similarity) = cosine(query, vec) {
				scored.push((id.as_str(), similarity));
			}
		}

		scored.sort_by(|left, right| {
			right
				.1
				.partial_cmp(&left.1)
				.unwrap_or(Ordering::Equal)
				.then_with(|| left.0.cmp(right.0))
		});
		scored.dedup_by(|a, b| a.0 == b.0);
		scored.truncate(width);

		scored.into_iter().map(|(id, _)| id.to_string()).collect()
	}
}

fn cosine(a: &[f32], b: &[f32]) -> Option<f32> {
	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return None;
	}

	let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());

	similarity.is_finite().then_some(similarity)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn index() -> DenseIndex {
		let vectors: Vec<(&str, Vec<f32>)> = vec![
			("a", vec![1.0, 0.0]),
			("b", vec![0.7, 0.7]),
			("c", vec![0.0, 1.0]),
			("zero", vec![0.0, 0.0]),
			("wide", vec![1.0, 0.0, 0.0]),
		];

		DenseIndex::new(vectors.iter().map(|(id, vec)| (*id, vec.as_slice())), None)
	}

	fn ids(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn orders_by_cosine_similarity() {
		let ranked = index().search_by_vector(&[1.0, 0.1], &ids(&["c", "b", "a"]), 10);

		assert_eq!(ranked, ids(&["a", "b", "c"]));
	}

	#[test]
	fn skips_zero_and_mismatched_vectors() {
		let ranked = index().search_by_vector(&[1.0, 0.0], &ids(&["zero", "wide", "a"]), 10);

		assert_eq!(ranked, ids(&["a"]));
	}

	#[test]
	fn width_bounds_output() {
		assert_eq!(index().search_by_vector(&[0.0, 1.0], &ids(&["a", "b", "c"]), 1), ids(&["c"]));
	}

	struct FixedEmbedding;

	impl EmbeddingProvider for FixedEmbedding {
		fn embed<'a>(
			&'a self,
			texts: &'a [String],
		) -> crate::BoxFuture<'a, Result<Vec<Vec<f32>>>> {
			Box::pin(async move { Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect()) })
		}
	}

	#[tokio::test]
	async fn search_embeds_then_ranks() {
		let vectors: Vec<(&str, Vec<f32>)> = vec![("a", vec![1.0, 0.0]), ("c", vec![0.0, 1.0])];
		let index = DenseIndex::new(
			vectors.iter().map(|(id, vec)| (*id, vec.as_slice())),
			Some(Arc::new(FixedEmbedding)),
		);
		let ranked = index.search("seal leak", &ids(&["a", "c"]), 5).await.expect("Search failed.");

		assert_eq!(ranked, ids(&["c", "a"]));
	}

	#[tokio::test]
	async fn search_without_provider_fails() {
		let err = index().search("pump", &ids(&["a"]), 5).await.expect_err("Expected failure.");

		assert!(err.to_string().contains("not configured"), "Unexpected error: {err}");
	}
}
