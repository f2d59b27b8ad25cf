use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid procedure tag {raw:?}.")]
pub struct InvalidTag {
	pub raw: String,
}

/// A normalized procedure tag: lowercase ASCII letters, digits, and underscores.
///
/// Free-form enrichment strings such as `"Lockout Tagout"` or `"hot-work"` normalize to
/// `lockout_tagout` and `hot_work`. Anything that still contains other characters is rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProcedureTag(String);
impl ProcedureTag {
	pub fn parse(raw: &str) -> Result<Self, InvalidTag> {
		keel_config::normalize_tag(raw).map(Self).ok_or_else(|| InvalidTag { raw: raw.to_string() })
	}

	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}

	/// The words a tag is spelled with in free text, e.g. `["lockout", "tagout"]`.
	pub fn words(&self) -> impl Iterator<Item = &str> {
		self.0.split('_').filter(|word| !word.is_empty())
	}
}
impl TryFrom<String> for ProcedureTag {
	type Error = InvalidTag;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}
impl From<ProcedureTag> for String {
	fn from(value: ProcedureTag) -> Self {
		value.0
	}
}
impl fmt::Display for ProcedureTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
