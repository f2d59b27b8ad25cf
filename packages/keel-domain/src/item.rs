use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::tag::ProcedureTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
	Specific,
	General,
	Universal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	Low,
	Medium,
	High,
	Critical,
}

/// One retrievable chunk of one historical maintenance record, with the applicability metadata
/// produced upstream by enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusItem {
	pub item_id: String,
	pub record_id: String,
	#[serde(default)]
	pub equipment_id: Option<String>,
	#[serde(default)]
	pub equipment_type: Option<String>,
	/// Additional equipment types the record applies to.
	#[serde(default)]
	pub applicable_to: BTreeSet<String>,
	pub scope: Scope,
	#[serde(default)]
	pub procedure_tags: BTreeSet<ProcedureTag>,
	#[serde(default)]
	pub severity: Option<Severity>,
	pub text: String,
}
impl CorpusItem {
	pub fn is_critical(&self) -> bool {
		self.severity == Some(Severity::Critical)
	}
}
