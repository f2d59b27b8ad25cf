mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Boosts, Config, DEFAULT_PROCEDURE_TAGS, EmbeddingProviderConfig, ProviderConfig, Providers,
	Retrieval, Service, TierSettings, Tiers, Timeouts, Vocabulary,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	validate_retrieval(&cfg.retrieval)?;

	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		validate_endpoint(
			"providers.embedding",
			&embedding.api_base,
			&embedding.api_key,
			embedding.timeout_ms,
		)?;

		if embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
	}
	if let Some(rerank) = cfg.providers.rerank.as_ref() {
		validate_endpoint(
			"providers.rerank",
			&rerank.api_base,
			&rerank.api_key,
			rerank.timeout_ms,
		)?;
	}

	for tag in &cfg.vocabulary.procedure_tags {
		if normalize_tag(tag).as_deref() != Some(tag.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"vocabulary.procedure_tags entry {tag:?} must be ASCII letters, digits, \
					 underscores, or word separators."
				),
			});
		}
	}

	Ok(())
}

/// Validates the per-query retrieval settings. Every rejection here is fatal and happens before
/// any tier executes.
pub fn validate_retrieval(cfg: &Retrieval) -> Result<()> {
	if cfg.rrf_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.rrf_k must be greater than zero.".to_string(),
		});
	}
	if cfg.rerank_top_n == 0 {
		return Err(Error::Validation {
			message: "retrieval.rerank_top_n must be greater than zero.".to_string(),
		});
	}
	if cfg.result_count == 0 {
		return Err(Error::Validation {
			message: "retrieval.result_count must be greater than zero.".to_string(),
		});
	}

	for (label, tier) in [
		("equipment_specific", &cfg.tiers.equipment_specific),
		("equipment_type", &cfg.tiers.equipment_type),
		("universal", &cfg.tiers.universal),
		("semantic", &cfg.tiers.semantic),
	] {
		if tier.width == 0 {
			return Err(Error::Validation {
				message: format!("retrieval.tiers.{label}.width must be greater than zero."),
			});
		}

		validate_factor(&format!("retrieval.tiers.{label}.boost"), tier.boost)?;
	}

	validate_factor("retrieval.boosts.severity_critical", cfg.boosts.severity_critical)?;

	if !cfg.boosts.procedure_overlap_step.is_finite() {
		return Err(Error::Validation {
			message: "retrieval.boosts.procedure_overlap_step must be a finite number.".to_string(),
		});
	}
	if cfg.boosts.procedure_overlap_step < 0.0 {
		return Err(Error::Validation {
			message: "retrieval.boosts.procedure_overlap_step must be zero or greater.".to_string(),
		});
	}
	if cfg.timeouts.signal_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.timeouts.signal_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.timeouts.rerank_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.timeouts.rerank_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_factor(label: &str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if value <= 0.0 {
		return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
	}

	Ok(())
}

fn validate_endpoint(label: &str, api_base: &str, api_key: &str, timeout_ms: u64) -> Result<()> {
	if api_base.trim().is_empty() {
		return Err(Error::Validation { message: format!("{label}.api_base must be non-empty.") });
	}
	if api_key.trim().is_empty() {
		return Err(Error::Validation { message: format!("{label}.api_key must be non-empty.") });
	}
	if timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("{label}.timeout_ms must be greater than zero."),
		});
	}

	Ok(())
}

/// Canonical spelling of a procedure tag: lowercase words joined by `_`. Whitespace, `-`, and `/`
/// separate words. Returns `None` when nothing remains or a character outside ASCII letters,
/// digits, and `_` survives.
pub fn normalize_tag(raw: &str) -> Option<String> {
	let tag = raw
		.trim()
		.to_ascii_lowercase()
		.split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '/')
		.filter(|part| !part.is_empty())
		.collect::<Vec<_>>()
		.join("_");
	let valid = !tag.is_empty()
		&& tag.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');

	valid.then_some(tag)
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	let mut tags: Vec<String> = Vec::with_capacity(cfg.vocabulary.procedure_tags.len());

	for raw in &cfg.vocabulary.procedure_tags {
		// Invalid entries stay as written so validation can name them.
		let tag = normalize_tag(raw).unwrap_or_else(|| raw.clone());

		if !tags.contains(&tag) {
			tags.push(tag);
		}
	}

	cfg.vocabulary.procedure_tags = tags;
}
