use std::{
	env, fs,
	path::PathBuf,
	time::{SystemTime, UNIX_EPOCH},
};

use keel_domain::Scope;
use keel_storage::{Corpus, Error};

fn write_temp_corpus(name: &str, payload: serde_json::Value) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let mut path = env::temp_dir();

	path.push(format!("keel_corpus_{name}_{nanos}_{}.json", std::process::id()));

	fs::write(&path, payload.to_string()).expect("Failed to write test corpus.");

	path
}

#[test]
fn loads_items_and_vectors() {
	let path = write_temp_corpus(
		"load",
		serde_json::json!({
			"items": [
				{
					"item_id": "L-001#0",
					"record_id": "L-001",
					"equipment_id": "P-101",
					"scope": "specific",
					"severity": "critical",
					"text": "Seal failed after dry running.",
					"vector": [0.1, 0.2, 0.3]
				},
				{
					"item_id": "L-002#0",
					"record_id": "L-002",
					"scope": "universal",
					"text": "Verify isolation before opening."
				}
			]
		}),
	);
	let result = Corpus::load(&path);

	fs::remove_file(&path).expect("Failed to remove test corpus.");

	let corpus = result.expect("Corpus must load.");

	assert_eq!(corpus.len(), 2);
	assert_eq!(corpus.vector("L-001#0"), Some([0.1_f32, 0.2, 0.3].as_slice()));
	assert_eq!(corpus.vector("L-002#0"), None);
	assert_eq!(corpus.vectors().count(), 1);
	assert_eq!(corpus.get("L-002#0").map(|item| item.scope), Some(Scope::Universal));
	assert_eq!(corpus.select(|item| item.is_critical()).len(), 1);
}

#[test]
fn duplicate_item_ids_conflict() {
	let path = write_temp_corpus(
		"dup",
		serde_json::json!({
			"items": [
				{ "item_id": "A", "record_id": "R1", "scope": "general", "text": "one" },
				{ "item_id": "A", "record_id": "R2", "scope": "general", "text": "two" }
			]
		}),
	);
	let result = Corpus::load(&path);

	fs::remove_file(&path).expect("Failed to remove test corpus.");

	assert!(matches!(result, Err(Error::Conflict(_))), "Unexpected result: {result:?}");
}

#[test]
fn non_finite_vectors_are_rejected() {
	let entries = vec![keel_storage::CorpusEntry {
		item: serde_json::from_value(serde_json::json!({
			"item_id": "A",
			"record_id": "R1",
			"scope": "general",
			"text": "one"
		}))
		.expect("Item must deserialize."),
		vector: Some(vec![f32::NAN]),
	}];

	assert!(matches!(Corpus::from_entries(entries), Err(Error::InvalidArgument(_))));
}
