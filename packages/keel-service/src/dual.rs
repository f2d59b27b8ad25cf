use std::{collections::HashSet, fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, Ranker, tiers::TierId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
	Similarity,
	Keyword,
}
impl SignalKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Similarity => "similarity",
			Self::Keyword => "keyword",
		}
	}
}
impl fmt::Display for SignalKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One position in one signal's list. Ranks are 1-indexed and gapless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
	pub item_id: String,
	pub rank: u32,
	pub source: SignalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TierStatus {
	/// Both signals answered.
	Dual,
	/// One signal failed; the tier ranks on the survivor alone.
	SingleSignal { failed: SignalKind },
	/// Both signals failed.
	DegradedEmpty,
	/// The tier predicate admitted nothing, so no signal was asked.
	NoMatches,
}

#[derive(Debug)]
pub struct DualRanking {
	pub lists: Vec<Vec<RankedEntry>>,
	pub status: TierStatus,
	pub failures: Vec<Error>,
}

/// Asks both signals for the tier's eligible ids concurrently. Each call is bounded by
/// `timeout`; a call past its deadline is treated exactly like a failed one.
pub async fn rank_tier(
	tier: TierId,
	similarity: &dyn Ranker,
	keyword: &dyn Ranker,
	query: &str,
	eligible: &[String],
	width: u32,
	timeout: Duration,
) -> DualRanking {
	if eligible.is_empty() {
		tracing::info!(tier = tier.as_str(), "Tier predicate matched no items.");

		return DualRanking {
			lists: Vec::new(),
			status: TierStatus::NoMatches,
			failures: Vec::new(),
		};
	}

	let (similarity_out, keyword_out) = tokio::join!(
		call_signal(SignalKind::Similarity, similarity, query, eligible, width, timeout),
		call_signal(SignalKind::Keyword, keyword, query, eligible, width, timeout),
	);
	let mut lists = Vec::with_capacity(2);
	let mut failures = Vec::new();
	let mut failed = Vec::new();

	for (signal, outcome) in
		[(SignalKind::Similarity, similarity_out), (SignalKind::Keyword, keyword_out)]
	{
		match outcome {
			Ok(ids) => lists.push(to_ranked(tier, signal, ids, eligible, width)),
			Err(err) => {
				tracing::warn!(
					tier = tier.as_str(),
					signal = signal.as_str(),
					error = %err,
					"Ranking signal failed."
				);

				failed.push(signal);
				failures.push(err);
			},
		}
	}

	let status = match failed.as_slice() {
		[] => TierStatus::Dual,
		[signal] => {
			tracing::warn!(
				tier = tier.as_str(),
				failed = signal.as_str(),
				"Tier degraded to a single signal."
			);

			TierStatus::SingleSignal { failed: *signal }
		},
		_ => {
			tracing::warn!(tier = tier.as_str(), "Tier degraded to empty; both signals failed.");

			TierStatus::DegradedEmpty
		},
	};

	DualRanking { lists, status, failures }
}

async fn call_signal(
	signal: SignalKind,
	ranker: &dyn Ranker,
	query: &str,
	eligible: &[String],
	width: u32,
	timeout: Duration,
) -> Result<Vec<String>, Error> {
	match tokio::time::timeout(timeout, ranker.rank(query, eligible, width as usize)).await {
		Ok(Ok(ids)) => Ok(ids),
		Ok(Err(err)) => Err(Error::SignalUnavailable { signal, message: err.to_string() }),
		Err(_) => Err(Error::SignalTimeout { signal, timeout_ms: timeout.as_millis() as u64 }),
	}
}

/// Converts a signal's raw id list into ranked entries: the first occurrence of an id wins, ids
/// outside the eligible set are dropped, and the list is cut at `width`.
pub fn to_ranked(
	tier: TierId,
	source: SignalKind,
	ids: Vec<String>,
	eligible: &[String],
	width: u32,
) -> Vec<RankedEntry> {
	let allowed: HashSet<&str> = eligible.iter().map(String::as_str).collect();
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for id in ids {
		if out.len() >= width as usize {
			break;
		}
		if !allowed.contains(id.as_str()) {
			tracing::warn!(
				tier = tier.as_str(),
				signal = source.as_str(),
				item_id = %id,
				"Signal returned an ineligible item."
			);

			continue;
		}
		if !seen.insert(id.clone()) {
			continue;
		}

		out.push(RankedEntry { item_id: id, rank: out.len() as u32 + 1, source });
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn ranks_are_gapless_after_filtering() {
		let ranked = to_ranked(
			TierId::Semantic,
			SignalKind::Keyword,
			ids(&["a", "x", "b", "a", "c"]),
			&ids(&["a", "b", "c"]),
			10,
		);

		assert_eq!(
			ranked.iter().map(|entry| (entry.item_id.as_str(), entry.rank)).collect::<Vec<_>>(),
			vec![("a", 1), ("b", 2), ("c", 3)]
		);
	}

	#[test]
	fn width_bounds_ranked_list() {
		let abc = ids(&["a", "b", "c"]);
		let ranked = to_ranked(TierId::Generic, SignalKind::Similarity, abc.clone(), &abc, 2);

		assert_eq!(ranked.len(), 2);
		assert_eq!(ranked[1].item_id, "b");
	}
}
