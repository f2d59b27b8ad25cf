use std::sync::LazyLock;

use regex::Regex;

static TOKEN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[a-z0-9]+-?[a-z0-9]*").expect("Token pattern must compile."));

/// Lowercases and splits text into keyword tokens. A single inner hyphen is kept so equipment
/// tags like `p-101` survive as one token. Single-character tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
	if text.is_empty() {
		return Vec::new();
	}

	let lowered = text.to_lowercase();

	TOKEN
		.find_iter(&lowered)
		.map(|m| m.as_str())
		.filter(|token| token.len() > 1)
		.map(str::to_string)
		.collect()
}

/// Like [`tokenize`], but hyphenated tokens are split into their words.
pub fn words(text: &str) -> Vec<String> {
	let mut out = Vec::new();

	for token in tokenize(text) {
		if token.contains('-') {
			out.extend(token.split('-').filter(|word| !word.is_empty()).map(str::to_string));
		} else {
			out.push(token);
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_equipment_tags_whole() {
		assert_eq!(
			tokenize("Replace seal on P-101 pump."),
			vec!["replace", "seal", "on", "p-101", "pump"]
		);
	}

	#[test]
	fn drops_single_characters() {
		assert_eq!(tokenize("a b cd"), vec!["cd"]);
	}

	#[test]
	fn words_split_hyphens() {
		assert_eq!(words("lockout-tagout required"), vec!["lockout", "tagout", "required"]);
	}
}
