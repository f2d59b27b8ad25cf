use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, RerankProvider, merge::MergedResult, tiers::TierId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RerankStatus {
	Applied,
	/// The scorer failed, timed out, or was cancelled; pre-rerank order was kept.
	Skipped { reason: String },
	/// No scorer is configured.
	Disabled,
	NoCandidates,
}

#[derive(Debug)]
pub struct RerankOutcome {
	pub results: Vec<MergedResult>,
	pub status: RerankStatus,
	pub failure: Option<Error>,
}

pub struct RerankArgs<'a, F> {
	pub provider: Option<&'a dyn RerankProvider>,
	pub query: &'a str,
	pub top_n: u32,
	pub timeout: Duration,
	pub cancel: F,
}

/// Scores the top `top_n` merged results against the query and reorders them. Any failure keeps
/// the pre-rerank order and reports why.
pub async fn rerank<'a, F, T>(
	args: RerankArgs<'a, F>,
	mut results: Vec<MergedResult>,
	text_of: T,
) -> RerankOutcome
where
	F: Future<Output = ()>,
	T: Fn(&str) -> Option<&'a str>,
{
	let RerankArgs { provider, query, top_n, timeout, cancel } = args;

	results.truncate(top_n as usize);

	let Some(provider) = provider else {
		return RerankOutcome { results, status: RerankStatus::Disabled, failure: None };
	};

	if results.is_empty() {
		return RerankOutcome { results, status: RerankStatus::NoCandidates, failure: None };
	}

	let docs: Vec<String> = results
		.iter()
		.map(|result| text_of(&result.item_id).unwrap_or_default().to_string())
		.collect();
	let outcome = tokio::select! {
		scored = tokio::time::timeout(timeout, provider.rerank(query, &docs)) => match scored {
			Ok(Ok(scores)) => check_scores(scores, docs.len()),
			Ok(Err(err)) => Err(Error::RerankUnavailable { message: err.to_string() }),
			Err(_) => Err(Error::RerankUnavailable {
				message: format!("Timed out after {} ms.", timeout.as_millis()),
			}),
		},
		_ = cancel => Err(Error::RerankUnavailable { message: "Cancelled.".to_string() }),
	};

	match outcome {
		Ok(scores) => {
			apply_scores(&mut results, &scores);

			RerankOutcome { results, status: RerankStatus::Applied, failure: None }
		},
		Err(err) => {
			tracing::warn!(
				error = %err,
				candidates = results.len(),
				"Rerank skipped; keeping retrieval order."
			);

			RerankOutcome {
				results,
				status: RerankStatus::Skipped { reason: err.to_string() },
				failure: Some(err),
			}
		},
	}
}

fn check_scores(scores: Vec<f32>, expected: usize) -> Result<Vec<f32>, Error> {
	if scores.len() != expected {
		return Err(Error::RerankUnavailable {
			message: format!("Scorer returned {} scores for {expected} pairs.", scores.len()),
		});
	}
	if scores.iter().any(|score| !score.is_finite()) {
		return Err(Error::RerankUnavailable {
			message: "Scorer returned a non-finite score.".to_string(),
		});
	}

	Ok(scores)
}

/// Stable reorder by score descending; equal scores keep their retrieval order. Raw scores are
/// kept as returned and min-max normalized onto 0..=100 for `rerank_score` and `final_score`.
/// When every score is equal there is no spread to normalize, so all results get 50.
fn apply_scores(results: &mut Vec<MergedResult>, scores: &[f32]) {
	let (min, max) = scores.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), score| {
		(min.min(f64::from(*score)), max.max(f64::from(*score)))
	});
	let range = max - min;
	let mut scored: Vec<(MergedResult, f32)> =
		results.drain(..).zip(scores.iter().copied()).collect();

	scored.sort_by(|left, right| right.1.total_cmp(&left.1));

	for (mut result, raw) in scored {
		let normalized =
			if range > 0.0 { (f64::from(raw) - min) / range * 100.0 } else { 50.0 };

		result.rerank_score_raw = Some(raw);
		result.rerank_score = Some(normalized);
		result.final_score = normalized;

		results.push(result);
	}
}

/// Cuts the final list to `count`. With `min_per_tier > 0`, the best `min_per_tier` results of
/// each represented match type are kept first, in tier priority order, and the remaining slots
/// go to the best of the rest. Survivors keep their relative order.
pub fn select_results(
	results: Vec<MergedResult>,
	count: u32,
	min_per_tier: u32,
) -> Vec<MergedResult> {
	let count = count as usize;

	if min_per_tier == 0 || results.len() <= count {
		let mut results = results;

		results.truncate(count);

		return results;
	}

	let mut keep = vec![false; results.len()];
	let mut kept = 0;

	for tier in TierId::ALL {
		let mut taken = 0;

		for (idx, result) in results.iter().enumerate() {
			if kept >= count || taken >= min_per_tier {
				break;
			}
			if result.match_type == tier && !keep[idx] {
				keep[idx] = true;
				kept += 1;
				taken += 1;
			}
		}
	}
	for flag in keep.iter_mut() {
		if kept >= count {
			break;
		}
		if !*flag {
			*flag = true;
			kept += 1;
		}
	}

	results.into_iter().zip(keep).filter_map(|(result, keep)| keep.then_some(result)).collect()
}
