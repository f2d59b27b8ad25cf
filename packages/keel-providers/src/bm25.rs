use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
};

use keel_domain::{CorpusItem, text};

const K1: f32 = 1.5;
const B: f32 = 0.75;

#[derive(Debug)]
struct Document {
	term_freqs: HashMap<String, u32>,
	len: u32,
}

/// Okapi BM25 over item text. Document frequencies are corpus-wide; ranking is restricted to
/// whichever ids the caller marks eligible.
#[derive(Debug, Default)]
pub struct Bm25Index {
	docs: HashMap<String, Document>,
	doc_freqs: HashMap<String, u32>,
	avg_len: f32,
}
impl Bm25Index {
	pub fn build<'a, I>(items: I) -> Self
	where
		I: IntoIterator<Item = &'a CorpusItem>,
	{
		let mut docs = HashMap::new();
		let mut doc_freqs: HashMap<String, u32> = HashMap::new();
		let mut total_len = 0_u64;

		for item in items {
			let tokens = text::tokenize(&item.text);
			let mut term_freqs: HashMap<String, u32> = HashMap::new();

			for token in &tokens {
				*term_freqs.entry(token.clone()).or_insert(0) += 1;
			}
			for term in term_freqs.keys() {
				*doc_freqs.entry(term.clone()).or_insert(0) += 1;
			}

			total_len += tokens.len() as u64;

			docs.insert(item.item_id.clone(), Document { term_freqs, len: tokens.len() as u32 });
		}

		let avg_len = if docs.is_empty() { 0.0 } else { total_len as f32 / docs.len() as f32 };

		tracing::debug!(documents = docs.len(), terms = doc_freqs.len(), "BM25 index built.");

		Self { docs, doc_freqs, avg_len }
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}

	/// Returns up to `width` eligible ids with a positive score, best first. Equal scores order
	/// by id.
	pub fn search(&self, query: &str, eligible: &[String], width: usize) -> Vec<String> {
		let mut terms = text::tokenize(query);
		let mut seen = HashSet::new();

		terms.retain(|term| seen.insert(term.clone()));

		if terms.is_empty() || width == 0 {
			return Vec::new();
		}

		let mut scored: Vec<(&str, f32)> = eligible
			.iter()
			.filter_map(|id| {
				let score = self.score(&terms, id)?;

				(score > 0.0).then_some((id.as_str(), score))
			})
			.collect();

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

	fn score(&self, terms: &[String], item_id: &str) -> Option<f32> {
		let doc = self.docs.get(item_id)?;
		let total = self.docs.len() as f32;
		let norm = if self.avg_len > 0.0 { doc.len as f32 / self.avg_len } else { 0.0 };
		let mut score = 0.0_f32;

		for term in terms {
			let Some(tf) = doc.term_freqs.get(term).copied() else { continue };
			let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
			let idf = ((total - df + 0.5) / (df + 0.5) + 1.0).ln();
			let tf = tf as f32;

			score += idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * norm));
		}

		Some(score)
	}
}

#[cfg(test)]
mod tests {
	use keel_domain::Scope;

	use super::*;

	fn item(id: &str, text: &str) -> CorpusItem {
		CorpusItem {
			item_id: id.to_string(),
			record_id: id.to_string(),
			equipment_id: None,
			equipment_type: None,
			applicable_to: Default::default(),
			scope: Scope::General,
			procedure_tags: Default::default(),
			severity: None,
			text: text.to_string(),
		}
	}

	fn ids(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn ranks_by_term_relevance() {
		let items = vec![
			item("a", "Bearing overheated on pump P-101 after lubrication was skipped."),
			item("b", "Mechanical seal leak on pump. Seal faces were scored."),
			item("c", "Scaffold inspection before lifting."),
		];
		let index = Bm25Index::build(&items);
		let ranked = index.search("pump seal replacement", &ids(&["a", "b", "c"]), 10);

		assert_eq!(ranked, ids(&["b", "a"]));
	}

	#[test]
	fn only_eligible_ids_are_ranked() {
		let items = vec![item("a", "pump seal"), item("b", "pump seal leak")];
		let index = Bm25Index::build(&items);

		assert_eq!(index.search("seal", &ids(&["a"]), 10), ids(&["a"]));
		assert!(index.search("seal", &ids(&["zzz"]), 10).is_empty());
	}

	#[test]
	fn width_bounds_output() {
		let items = vec![item("a", "valve"), item("b", "valve"), item("c", "valve")];
		let index = Bm25Index::build(&items);

		assert_eq!(index.search("valve", &ids(&["c", "b", "a"]), 2), ids(&["a", "b"]));
	}
}
