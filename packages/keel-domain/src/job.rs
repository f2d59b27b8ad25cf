use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::tag::ProcedureTag;

/// The upcoming work a query describes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub equipment_id: Option<String>,
	#[serde(default)]
	pub equipment_type: Option<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub job_type: Option<String>,
}
impl JobRecord {
	/// The text both ranking signals and the reranker score against. Each present field becomes
	/// one labeled paragraph, so an equipment-only job still yields a non-empty query.
	pub fn query_text(&self) -> String {
		let fields = [
			("Job Title", self.title.as_deref()),
			("Job Description", Some(self.description.as_str())),
			("Equipment", self.equipment_id.as_deref()),
			("Job Type", self.job_type.as_deref()),
		];

		fields
			.into_iter()
			.filter_map(|(label, value)| {
				let value = value?.trim();

				(!value.is_empty()).then(|| format!("{label}: {value}"))
			})
			.collect::<Vec<_>>()
			.join("\n\n")
	}
}

/// Job-side matching attributes, already normalized for comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuerySignals {
	pub equipment_id: Option<String>,
	pub equipment_type: Option<String>,
	pub procedures: BTreeSet<ProcedureTag>,
}

/// Equipment identifiers compare case-insensitively; blank means absent.
pub fn normalize_equipment_id(raw: Option<&str>) -> Option<String> {
	let trimmed = raw?.trim();

	if trimmed.is_empty() {
		return None;
	}

	Some(trimmed.to_ascii_uppercase())
}

pub fn normalize_equipment_type(raw: Option<&str>) -> Option<String> {
	let trimmed = raw?.trim();

	if trimmed.is_empty() {
		return None;
	}

	Some(trimmed.to_ascii_lowercase())
}
