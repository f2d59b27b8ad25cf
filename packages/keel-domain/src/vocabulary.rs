use std::collections::BTreeSet;

use crate::{
	tag::{InvalidTag, ProcedureTag},
	text,
};

/// Matches free text against a fixed vocabulary of procedure tags.
///
/// A tag matches when its words appear contiguously in the text, so `lockout_tagout` matches
/// "lockout tagout", "lockout-tagout", and "lockout/tagout".
#[derive(Debug, Clone)]
pub struct VocabularyTagger {
	entries: Vec<(ProcedureTag, Vec<String>)>,
}
impl VocabularyTagger {
	pub fn new<I, S>(tags: I) -> Result<Self, InvalidTag>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut entries = Vec::new();

		for raw in tags {
			let tag = ProcedureTag::parse(raw.as_ref())?;

			if entries.iter().any(|(existing, _)| existing == &tag) {
				continue;
			}

			let words = tag.words().map(str::to_string).collect();

			entries.push((tag, words));
		}

		Ok(Self { entries })
	}

	pub fn from_config(cfg: &keel_config::Vocabulary) -> Result<Self, InvalidTag> {
		Self::new(&cfg.procedure_tags)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn extract(&self, text: &str) -> BTreeSet<ProcedureTag> {
		let words = text::words(text);
		let mut out = BTreeSet::new();

		if words.is_empty() {
			return out;
		}

		for (tag, phrase) in &self.entries {
			if phrase.is_empty() || phrase.len() > words.len() {
				continue;
			}
			if words.windows(phrase.len()).any(|window| window == phrase.as_slice()) {
				out.insert(tag.clone());
			}
		}

		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tagger() -> VocabularyTagger {
		VocabularyTagger::from_config(&keel_config::Vocabulary::default())
			.expect("Default vocabulary must be valid.")
	}

	fn names(tags: &BTreeSet<ProcedureTag>) -> Vec<&str> {
		tags.iter().map(ProcedureTag::as_str).collect()
	}

	#[test]
	fn matches_single_and_multi_word_tags() {
		let tags = tagger().extract(
			"Apply lockout/tagout, then complete inspection and alignment of the coupling.",
		);

		assert_eq!(names(&tags), vec!["alignment", "inspection", "lockout_tagout"]);
	}

	#[test]
	fn hyphenated_phrases_match() {
		let tags = tagger().extract("Hot-work permit to work needed before welding.");

		assert_eq!(names(&tags), vec!["hot_work", "permit_to_work", "welding"]);
	}

	#[test]
	fn empty_text_yields_no_tags() {
		assert!(tagger().extract("").is_empty());
	}

	#[test]
	fn duplicate_vocabulary_entries_collapse() {
		let tagger = VocabularyTagger::new(["inspection", "Inspection", "hot work"])
			.expect("Vocabulary must be valid.");

		assert_eq!(tagger.len(), 2);
	}
}
