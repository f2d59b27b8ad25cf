use std::{cmp::Ordering, collections::HashMap};

use serde::Serialize;

use crate::{
	boost::{AppliedBoost, BoostedEntry},
	fusion::cmp_f64_desc,
	tiers::TierId,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultExplain {
	pub fused_score: f64,
	pub similarity_rank: Option<u32>,
	pub keyword_rank: Option<u32>,
	pub boosts: Vec<AppliedBoost>,
}

/// One record in the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedResult {
	pub item_id: String,
	pub record_id: String,
	/// The tier whose boosted score won for this record.
	pub match_type: TierId,
	pub boosted_score: f64,
	/// Equals `boosted_score` until a rerank succeeds, then `rerank_score`.
	pub final_score: f64,
	/// Rerank score normalized across the scored candidates onto 0..=100.
	pub rerank_score: Option<f64>,
	/// The scorer's score before normalization.
	pub rerank_score_raw: Option<f32>,
	pub explain: ResultExplain,
}
impl From<BoostedEntry> for MergedResult {
	fn from(entry: BoostedEntry) -> Self {
		Self {
			item_id: entry.item_id,
			record_id: entry.record_id,
			match_type: entry.tier,
			boosted_score: entry.boosted_score,
			final_score: entry.boosted_score,
			rerank_score: None,
			rerank_score_raw: None,
			explain: ResultExplain {
				fused_score: entry.fused_score,
				similarity_rank: entry.similarity_rank,
				keyword_rank: entry.keyword_rank,
				boosts: entry.boosts,
			},
		}
	}
}

/// Collapses all tiers' entries to one per owning record, keeping the highest boosted score.
/// Equal scores prefer the higher-priority tier, then the lower item id. The result is ordered
/// by boosted score descending, then tier priority, then record id.
pub fn merge<I>(tiers: I) -> Vec<MergedResult>
where
	I: IntoIterator<Item = Vec<BoostedEntry>>,
{
	let mut best: HashMap<String, BoostedEntry> = HashMap::new();

	for entry in tiers.into_iter().flatten() {
		match best.get(&entry.record_id) {
			Some(current) if cmp_boosted(&entry, current) != Ordering::Less => {},
			_ => {
				best.insert(entry.record_id.clone(), entry);
			},
		}
	}

	let mut merged: Vec<BoostedEntry> = best.into_values().collect();

	merged.sort_by(|left, right| {
		cmp_boosted(left, right).then_with(|| left.record_id.cmp(&right.record_id))
	});

	merged.into_iter().map(MergedResult::from).collect()
}

/// `Less` means `left` ranks ahead of `right`.
fn cmp_boosted(left: &BoostedEntry, right: &BoostedEntry) -> Ordering {
	cmp_f64_desc(left.boosted_score, right.boosted_score)
		.then_with(|| left.tier.priority().cmp(&right.tier.priority()))
		.then_with(|| left.item_id.cmp(&right.item_id))
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	fn entry(item_id: &str, record_id: &str, tier: TierId, boosted_score: f64) -> BoostedEntry {
		BoostedEntry {
			item_id: item_id.to_string(),
			record_id: record_id.to_string(),
			tier,
			fused_score: boosted_score,
			boosted_score,
			similarity_rank: Some(1),
			keyword_rank: None,
			boosts: Vec::new(),
		}
	}

	#[test]
	fn keeps_highest_scoring_tier_per_record() {
		let merged = merge([
			vec![],
			vec![entry("Z#0", "Z", TierId::EquipmentType, 0.040)],
			vec![],
			vec![
				entry("Z#0", "Z", TierId::Semantic, 0.028),
				entry("Y#0", "Y", TierId::Semantic, 0.030),
			],
		]);

		assert_eq!(merged.len(), 2);
		assert_eq!(merged[0].record_id, "Z");
		assert_eq!(merged[0].final_score, 0.040);
		assert_eq!(merged[0].match_type, TierId::EquipmentType);
		assert_eq!(merged[0].match_type.as_str(), "equipment-type");
		assert_eq!(merged[1].record_id, "Y");
	}

	#[test]
	fn equal_scores_prefer_higher_priority_tier() {
		let merged = merge([
			vec![entry("A#1", "A", TierId::Semantic, 0.05)],
			vec![entry("A#0", "A", TierId::EquipmentSpecific, 0.05)],
		]);

		assert_eq!(merged.len(), 1);
		assert_eq!(merged[0].match_type, TierId::EquipmentSpecific);
		assert_eq!(merged[0].item_id, "A#0");
	}

	#[test]
	fn chunks_of_one_record_collapse() {
		let merged = merge([vec![
			entry("A#0", "A", TierId::Semantic, 0.01),
			entry("A#1", "A", TierId::Semantic, 0.02),
			entry("B#0", "B", TierId::Semantic, 0.02),
		]]);

		assert_eq!(
			merged.iter().map(|result| result.item_id.as_str()).collect::<Vec<_>>(),
			vec!["A#1", "B#0"]
		);
	}

	#[test]
	fn no_record_appears_twice() {
		let tiers: Vec<Vec<BoostedEntry>> = TierId::ALL
			.iter()
			.enumerate()
			.map(|(t, tier)| {
				(0..20)
					.map(|i| {
						entry(
							&format!("{}#{t}", i % 7),
							&format!("R{}", i % 7),
							*tier,
							f64::from((i * 13 + t as u32 * 5) % 11) / 100.0,
						)
					})
					.collect()
			})
			.collect();
		let merged = merge(tiers);
		let unique: HashSet<&str> = merged.iter().map(|result| result.record_id.as_str()).collect();

		assert_eq!(unique.len(), merged.len());
		assert_eq!(merged.len(), 7);
		assert!(merged.windows(2).all(|pair| pair[0].boosted_score >= pair[1].boosted_score));
	}

	#[test]
	fn merge_is_deterministic() {
		let build = || {
			vec![
				vec![entry("A#0", "A", TierId::EquipmentSpecific, 0.03)],
				vec![entry("B#0", "B", TierId::EquipmentType, 0.03)],
				vec![entry("C#0", "C", TierId::Generic, 0.03)],
			]
		};

		assert_eq!(merge(build()), merge(build()));
		assert_eq!(
			merge(build()).iter().map(|result| result.record_id.as_str()).collect::<Vec<_>>(),
			vec!["A", "B", "C"]
		);
	}
}
