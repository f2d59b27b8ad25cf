use std::fmt;

use serde::{Deserialize, Serialize};

use keel_config::Retrieval;
use keel_domain::{
	CorpusItem, QuerySignals, Scope, normalize_equipment_id, normalize_equipment_type,
};

/// Retrieval tiers in priority order. Declaration order is the tie-break order at merge time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TierId {
	EquipmentSpecific,
	EquipmentType,
	Generic,
	Semantic,
}
impl TierId {
	pub const ALL: [Self; 4] =
		[Self::EquipmentSpecific, Self::EquipmentType, Self::Generic, Self::Semantic];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::EquipmentSpecific => "equipment-specific",
			Self::EquipmentType => "equipment-type",
			Self::Generic => "generic",
			Self::Semantic => "semantic",
		}
	}

	pub fn priority(self) -> u8 {
		match self {
			Self::EquipmentSpecific => 1,
			Self::EquipmentType => 2,
			Self::Generic => 3,
			Self::Semantic => 4,
		}
	}
}
impl fmt::Display for TierId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A multiplicative adjustment a tier applies to fused scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoostRule {
	/// Applied once for the tier the candidate is scored in.
	Tier(f64),
	/// Applied when the item's severity is critical.
	SeverityCritical(f64),
	/// `1 + step * min(overlap, cap)` over shared procedure tags.
	ProcedureOverlap { step: f64, cap: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierSpec {
	pub id: TierId,
	pub width: u32,
	pub boosts: Vec<BoostRule>,
}
impl TierSpec {
	pub fn predicate<'a>(&self, signals: &'a QuerySignals) -> TierPredicate<'a> {
		TierPredicate { tier: self.id, signals }
	}
}

/// The tier filter bound to one query's signals.
#[derive(Debug, Clone, Copy)]
pub struct TierPredicate<'a> {
	pub tier: TierId,
	pub signals: &'a QuerySignals,
}
impl TierPredicate<'_> {
	pub fn admits(&self, item: &CorpusItem) -> bool {
		match self.tier {
			TierId::EquipmentSpecific => {
				let Some(job_id) = self.signals.equipment_id.as_deref() else { return false };

				normalize_equipment_id(item.equipment_id.as_deref()).as_deref() == Some(job_id)
			},
			TierId::EquipmentType => {
				let Some(job_type) = self.signals.equipment_type.as_deref() else { return false };
				let item_type = normalize_equipment_type(item.equipment_type.as_deref());

				if item_type.as_deref() == Some(job_type) {
					return true;
				}

				item.applicable_to
					.iter()
					.any(|kind| normalize_equipment_type(Some(kind)).as_deref() == Some(job_type))
			},
			TierId::Generic => item.scope == Scope::Universal,
			TierId::Semantic => true,
		}
	}
}

/// Builds the four tier specs, in priority order, from validated settings.
pub fn plan_tiers(cfg: &Retrieval) -> [TierSpec; 4] {
	let shared = [
		BoostRule::SeverityCritical(cfg.boosts.severity_critical),
		BoostRule::ProcedureOverlap {
			step: cfg.boosts.procedure_overlap_step,
			cap: cfg.boosts.procedure_overlap_cap,
		},
	];

	TierId::ALL.map(|id| {
		let settings = match id {
			TierId::EquipmentSpecific => cfg.tiers.equipment_specific,
			TierId::EquipmentType => cfg.tiers.equipment_type,
			TierId::Generic => cfg.tiers.universal,
			TierId::Semantic => cfg.tiers.semantic,
		};
		let mut boosts = Vec::with_capacity(3);

		boosts.push(BoostRule::Tier(settings.boost));
		boosts.extend(shared);

		TierSpec { id, width: settings.width, boosts }
	})
}
