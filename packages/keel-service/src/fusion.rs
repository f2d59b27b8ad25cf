use std::{cmp::Ordering, collections::HashMap};

use serde::Serialize;

use crate::{
	dual::{RankedEntry, SignalKind},
	tiers::TierId,
};

/// One item's Reciprocal Rank Fusion score within one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedEntry {
	pub item_id: String,
	pub record_id: String,
	pub tier: TierId,
	pub fused_score: f64,
	pub similarity_rank: Option<u32>,
	pub keyword_rank: Option<u32>,
}

/// `1 / (k + rank)` for a 1-indexed rank. Rank zero means "absent" and contributes nothing.
pub fn rrf_contribution(rank: u32, k: u32) -> f64 {
	if rank == 0 {
		return 0.0;
	}

	1.0 / (f64::from(k) + f64::from(rank))
}

/// Sums RRF contributions across the tier's source lists. Output is ordered by fused score
/// descending, then record id and item id ascending, and cut at `width`.
///
/// `record_of` resolves an item id to its owning record; items it cannot resolve are dropped.
pub fn fuse<'a, F>(
	tier: TierId,
	lists: &[Vec<RankedEntry>],
	k: u32,
	width: u32,
	record_of: F,
) -> Vec<FusedEntry>
where
	F: Fn(&str) -> Option<&'a str>,
{
	let mut by_item: HashMap<&str, FusedEntry> = HashMap::new();

	for list in lists {
		for entry in list {
			if !by_item.contains_key(entry.item_id.as_str()) {
				let Some(record_id) = record_of(&entry.item_id) else {
					tracing::warn!(
						tier = tier.as_str(),
						item_id = %entry.item_id,
						"Ranked item is missing from the corpus."
					);

					continue;
				};

				by_item.insert(
					entry.item_id.as_str(),
					FusedEntry {
						item_id: entry.item_id.clone(),
						record_id: record_id.to_string(),
						tier,
						fused_score: 0.0,
						similarity_rank: None,
						keyword_rank: None,
					},
				);
			}

			let Some(fused) = by_item.get_mut(entry.item_id.as_str()) else { continue };
			let slot = match entry.source {
				SignalKind::Similarity => &mut fused.similarity_rank,
				SignalKind::Keyword => &mut fused.keyword_rank,
			};

			// A source contributes once per item, at its best rank.
			if slot.is_some_and(|rank| rank <= entry.rank) {
				continue;
			}

			*slot = Some(entry.rank);
		}
	}

	let mut fused: Vec<FusedEntry> = by_item
		.into_values()
		.map(|mut entry| {
			entry.fused_score = entry.similarity_rank.map_or(0.0, |rank| rrf_contribution(rank, k))
				+ entry.keyword_rank.map_or(0.0, |rank| rrf_contribution(rank, k));

			entry
		})
		.collect();

	fused.sort_by(cmp_fused);
	fused.truncate(width as usize);

	fused
}

fn cmp_fused(left: &FusedEntry, right: &FusedEntry) -> Ordering {
	cmp_f64_desc(left.fused_score, right.fused_score)
		.then_with(|| left.record_id.cmp(&right.record_id))
		.then_with(|| left.item_id.cmp(&right.item_id))
}

pub fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn list(source: SignalKind, ids: &[&str]) -> Vec<RankedEntry> {
		ids.iter()
			.enumerate()
			.map(|(idx, id)| RankedEntry { item_id: id.to_string(), rank: idx as u32 + 1, source })
			.collect()
	}

	fn record_of(item_id: &str) -> Option<&'static str> {
		match item_id {
			"a" => Some("R-3"),
			"b" => Some("R-1"),
			"c" => Some("R-2"),
			"d" => Some("R-0"),
			_ => None,
		}
	}

	fn item_ids(fused: &[FusedEntry]) -> Vec<&str> {
		fused.iter().map(|entry| entry.item_id.as_str()).collect()
	}

	#[test]
	fn contribution_matches_formula() {
		assert!((rrf_contribution(1, 60) - 1.0 / 61.0).abs() < 1e-12);
		assert!((rrf_contribution(1, 60) - 0.016393).abs() < 1e-6);
		assert_eq!(rrf_contribution(0, 60), 0.0);
	}

	#[test]
	fn contribution_strictly_decreases_with_rank() {
		for k in [1, 60, 1_000] {
			for rank in 1..200 {
				assert!(rrf_contribution(rank, k) > rrf_contribution(rank + 1, k));
			}
		}
	}

	#[test]
	fn sums_contributions_across_sources() {
		let lists = vec![
			list(SignalKind::Similarity, &["a", "b"]),
			list(SignalKind::Keyword, &["b", "c"]),
		];
		let fused = fuse(TierId::Semantic, &lists, 60, 10, record_of);

		assert_eq!(fused[0].item_id, "b");
		assert!((fused[0].fused_score - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
		assert_eq!(fused[0].similarity_rank, Some(2));
		assert_eq!(fused[0].keyword_rank, Some(1));
		assert_eq!(fused.len(), 3);
	}

	#[test]
	fn ties_break_by_record_id() {
		// "a" and "c" both sit at rank 1 of one source.
		let lists = vec![list(SignalKind::Similarity, &["a"]), list(SignalKind::Keyword, &["c"])];
		let fused = fuse(TierId::Generic, &lists, 60, 10, record_of);

		assert_eq!(item_ids(&fused), vec!["c", "a"]);
	}

	#[test]
	fn unknown_items_are_dropped_and_width_applies() {
		let lists = vec![list(SignalKind::Similarity, &["zzz", "a", "b", "c"])];
		let fused = fuse(TierId::Semantic, &lists, 60, 2, record_of);

		assert_eq!(item_ids(&fused), vec!["a", "b"]);
	}

	#[test]
	fn empty_lists_fuse_to_nothing() {
		assert!(fuse(TierId::Semantic, &[], 60, 10, record_of).is_empty());
	}
}
