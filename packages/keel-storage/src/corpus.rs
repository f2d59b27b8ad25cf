use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use keel_domain::CorpusItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
	#[serde(flatten)]
	pub item: CorpusItem,
	/// Precomputed embedding of `item.text`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
	pub items: Vec<CorpusEntry>,
}

/// Immutable snapshot of indexed items and their vectors. Nothing mutates it after construction,
/// so concurrent readers need no locking.
#[derive(Debug, Default)]
pub struct Corpus {
	items: Vec<CorpusItem>,
	vectors: HashMap<String, Vec<f32>>,
	by_id: HashMap<String, usize>,
}
impl Corpus {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadCorpus { path: path.to_path_buf(), source: err })?;
		let file: CorpusFile = serde_json::from_str(&raw)
			.map_err(|err| Error::ParseCorpus { path: path.to_path_buf(), source: err })?;
		let corpus = Self::from_entries(file.items)?;

		tracing::info!(
			path = %path.display(),
			items = corpus.len(),
			vectors = corpus.vectors.len(),
			"Corpus loaded."
		);

		Ok(corpus)
	}

	pub fn from_entries(entries: Vec<CorpusEntry>) -> Result<Self> {
		let mut items = Vec::with_capacity(entries.len());
		let mut vectors = HashMap::new();
		let mut by_id = HashMap::with_capacity(entries.len());

		for entry in entries {
			let CorpusEntry { item, vector } = entry;

			if item.item_id.trim().is_empty() {
				return Err(Error::InvalidArgument("item_id must be non-empty.".to_string()));
			}
			if item.record_id.trim().is_empty() {
				return Err(Error::InvalidArgument(format!(
					"record_id must be non-empty for item {}.",
					item.item_id
				)));
			}
			if by_id.contains_key(&item.item_id) {
				return Err(Error::Conflict(format!("Duplicate item_id {}.", item.item_id)));
			}

			if let Some(vector) = vector {
				if vector.is_empty() || vector.iter().any(|value| !value.is_finite()) {
					return Err(Error::InvalidArgument(format!(
						"Vector for item {} must be non-empty and finite.",
						item.item_id
					)));
				}

				vectors.insert(item.item_id.clone(), vector);
			}

			by_id.insert(item.item_id.clone(), items.len());
			items.push(item);
		}

		Ok(Self { items, vectors, by_id })
	}

	pub fn from_items(items: Vec<CorpusItem>) -> Result<Self> {
		let entries = items.into_iter().map(|item| CorpusEntry { item, vector: None }).collect();

		Self::from_entries(entries)
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn items(&self) -> &[CorpusItem] {
		&self.items
	}

	pub fn get(&self, item_id: &str) -> Option<&CorpusItem> {
		self.by_id.get(item_id).map(|idx| &self.items[*idx])
	}

	pub fn vector(&self, item_id: &str) -> Option<&[f32]> {
		self.vectors.get(item_id).map(Vec::as_slice)
	}

	pub fn vectors(&self) -> impl Iterator<Item = (&str, &[f32])> {
		self.items
			.iter()
			.filter_map(|item| self.vector(&item.item_id).map(|vec| (item.item_id.as_str(), vec)))
	}

	/// Items satisfying `predicate`, in corpus order.
	pub fn select<F>(&self, predicate: F) -> Vec<&CorpusItem>
	where
		F: Fn(&CorpusItem) -> bool,
	{
		self.items.iter().filter(|item| predicate(item)).collect()
	}
}
