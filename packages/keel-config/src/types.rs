use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_PROCEDURE_TAGS: [&str; 32] = [
	"installation",
	"commissioning",
	"startup",
	"shutdown",
	"inspection",
	"maintenance",
	"repair",
	"replacement",
	"calibration",
	"testing",
	"alignment",
	"balancing",
	"lubrication",
	"cleaning",
	"flushing",
	"isolation",
	"lockout_tagout",
	"permit_to_work",
	"confined_space",
	"hot_work",
	"cold_work",
	"lifting",
	"rigging",
	"scaffolding",
	"welding",
	"grinding",
	"cutting",
	"torque_spec",
	"quality_control",
	"verification",
	"training",
	"documentation",
];

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub providers: Providers,
	#[serde(default)]
	pub vocabulary: Vocabulary,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

/// Everything one `retrieve` call needs. Passed by reference per query, never held as
/// process-wide state.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub rrf_k: u32,
	pub rerank_top_n: u32,
	pub result_count: u32,
	/// Minimum reranked slots reserved per represented match type. Zero disables tier
	/// preservation.
	pub min_per_tier: u32,
	pub tiers: Tiers,
	pub boosts: Boosts,
	pub timeouts: Timeouts,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			rrf_k: 60,
			rerank_top_n: 50,
			result_count: 5,
			min_per_tier: 0,
			tiers: Tiers::default(),
			boosts: Boosts::default(),
			timeouts: Timeouts::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Tiers {
	pub equipment_specific: TierSettings,
	pub equipment_type: TierSettings,
	pub universal: TierSettings,
	pub semantic: TierSettings,
}
impl Default for Tiers {
	fn default() -> Self {
		Self {
			equipment_specific: TierSettings { width: 10, boost: 1.5 },
			equipment_type: TierSettings { width: 20, boost: 1.2 },
			universal: TierSettings { width: 20, boost: 1.3 },
			semantic: TierSettings { width: 30, boost: 1.0 },
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TierSettings {
	pub width: u32,
	pub boost: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Boosts {
	pub severity_critical: f64,
	pub procedure_overlap_step: f64,
	/// Upper bound on the overlap cardinality fed into the procedure boost.
	pub procedure_overlap_cap: u32,
}
impl Default for Boosts {
	fn default() -> Self {
		Self { severity_critical: 1.4, procedure_overlap_step: 0.1, procedure_overlap_cap: 5 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
	pub signal_ms: u64,
	pub rerank_ms: u64,
}
impl Default for Timeouts {
	fn default() -> Self {
		Self { signal_ms: 2_000, rerank_ms: 10_000 }
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct Providers {
	pub embedding: Option<EmbeddingProviderConfig>,
	pub rerank: Option<ProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
	pub procedure_tags: Vec<String>,
}
impl Default for Vocabulary {
	fn default() -> Self {
		Self { procedure_tags: DEFAULT_PROCEDURE_TAGS.iter().map(|tag| tag.to_string()).collect() }
	}
}
