use serde::{Deserialize, Serialize};

use keel_domain::{CorpusItem, QuerySignals};

use crate::{
	fusion::FusedEntry,
	tiers::{BoostRule, TierId, TierSpec},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedBoost {
	pub name: String,
	pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoostedEntry {
	pub item_id: String,
	pub record_id: String,
	pub tier: TierId,
	pub fused_score: f64,
	pub boosted_score: f64,
	pub similarity_rank: Option<u32>,
	pub keyword_rank: Option<u32>,
	pub boosts: Vec<AppliedBoost>,
}

/// Applies every rule of `spec` that fires for `item` and returns the boosted score with the
/// named factors that produced it. Factors stack multiplicatively. A tier factor of exactly 1.0
/// is a no-op and is not recorded.
pub fn boost(
	fused_score: f64,
	item: &CorpusItem,
	signals: &QuerySignals,
	spec: &TierSpec,
) -> (f64, Vec<AppliedBoost>) {
	let mut applied = Vec::new();

	for rule in &spec.boosts {
		match *rule {
			BoostRule::Tier(factor) =>
				if factor != 1.0 {
					applied.push(AppliedBoost {
						name: format!("tier:{}", spec.id.as_str()),
						factor,
					});
				},
			BoostRule::SeverityCritical(factor) =>
				if item.is_critical() {
					applied.push(AppliedBoost {
						name: "severity_critical".to_string(),
						factor,
					});
				},
			BoostRule::ProcedureOverlap { step, cap } => {
				let overlap = procedure_overlap(item, signals).min(cap as usize);

				if overlap > 0 {
					applied.push(AppliedBoost {
						name: "procedure_overlap".to_string(),
						factor: 1.0 + step * overlap as f64,
					});
				}
			},
		}
	}

	let multiplier: f64 = applied.iter().map(|boost| boost.factor).product();

	(fused_score * multiplier, applied)
}

pub fn boost_entry(
	fused: FusedEntry,
	item: &CorpusItem,
	signals: &QuerySignals,
	spec: &TierSpec,
) -> BoostedEntry {
	let (boosted_score, boosts) = boost(fused.fused_score, item, signals, spec);

	BoostedEntry {
		item_id: fused.item_id,
		record_id: fused.record_id,
		tier: fused.tier,
		fused_score: fused.fused_score,
		boosted_score,
		similarity_rank: fused.similarity_rank,
		keyword_rank: fused.keyword_rank,
		boosts,
	}
}

fn procedure_overlap(item: &CorpusItem, signals: &QuerySignals) -> usize {
	signals.procedures.intersection(&item.procedure_tags).count()
}
