use std::{future::Future, time::Duration};

use serde::Serialize;

use keel_config::Retrieval;
use keel_domain::{JobRecord, QuerySignals};

use crate::{
	Error, Result, RetrievalService,
	boost::{BoostedEntry, boost_entry},
	dual::{TierStatus, rank_tier},
	fusion::fuse,
	merge::{MergedResult, merge},
	rerank::{RerankArgs, RerankStatus, rerank, select_results},
	signals::extract_signals,
	tiers::{TierId, TierSpec, plan_tiers},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
	SignalTimeout,
	SignalUnavailable,
	TierEmpty,
	RerankUnavailable,
	EmptyCorpus,
}

/// A condition that reduced the quality of a response without failing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
	pub kind: DegradationKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tier: Option<TierId>,
	pub message: String,
}
impl Degradation {
	fn from_error(err: &Error, tier: Option<TierId>) -> Option<Self> {
		let kind = match err {
			Error::Configuration { .. } => return None,
			Error::SignalTimeout { .. } => DegradationKind::SignalTimeout,
			Error::SignalUnavailable { .. } => DegradationKind::SignalUnavailable,
			Error::RerankUnavailable { .. } => DegradationKind::RerankUnavailable,
			Error::EmptyCorpus => DegradationKind::EmptyCorpus,
		};

		Some(Self { kind, tier, message: err.to_string() })
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierReport {
	pub tier: TierId,
	pub status: TierStatus,
	/// Items the tier predicate admitted.
	pub eligible: usize,
	pub entries: Vec<BoostedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResponse {
	pub results: Vec<MergedResult>,
	pub signals: QuerySignals,
	pub tiers: Vec<TierReport>,
	pub rerank: RerankStatus,
	pub degradations: Vec<Degradation>,
}
impl RetrievalResponse {
	pub fn is_degraded(&self) -> bool {
		!self.degradations.is_empty()
	}
}

struct TierRun {
	report: TierReport,
	failures: Vec<Error>,
}

impl RetrievalService {
	pub async fn retrieve(&self, job: &JobRecord, cfg: &Retrieval) -> Result<RetrievalResponse> {
		self.retrieve_with_cancel(job, cfg, std::future::pending()).await
	}

	/// Runs one query. Resolving `cancel` abandons an in-flight rerank and keeps the
	/// pre-rerank order; the tier stages always run to completion or timeout.
	pub async fn retrieve_with_cancel<F>(
		&self,
		job: &JobRecord,
		cfg: &Retrieval,
		cancel: F,
	) -> Result<RetrievalResponse>
	where
		F: Future<Output = ()>,
	{
		keel_config::validate_retrieval(cfg)?;

		let signals = extract_signals(job, self.providers.tagger.as_ref());
		let [t1, t2, t3, t4] = plan_tiers(cfg);
		let query_text = job.query_text();
		let query = query_text.as_str();
		let (r1, r2, r3, r4) = tokio::join!(
			self.run_tier(&t1, &signals, query, cfg),
			self.run_tier(&t2, &signals, query, cfg),
			self.run_tier(&t3, &signals, query, cfg),
			self.run_tier(&t4, &signals, query, cfg),
		);
		let mut tiers = Vec::with_capacity(4);
		let mut degradations = Vec::new();

		for run in [r1, r2, r3, r4] {
			let tier = run.report.tier;

			degradations.extend(
				run.failures.iter().filter_map(|err| Degradation::from_error(err, Some(tier))),
			);

			match run.report.status {
				TierStatus::DegradedEmpty => degradations.push(Degradation {
					kind: DegradationKind::TierEmpty,
					tier: Some(tier),
					message: "Both ranking signals failed.".to_string(),
				}),
				TierStatus::NoMatches => degradations.push(Degradation {
					kind: DegradationKind::TierEmpty,
					tier: Some(tier),
					message: "Tier predicate matched no items.".to_string(),
				}),
				TierStatus::Dual | TierStatus::SingleSignal { .. } => {},
			}

			tiers.push(run.report);
		}

		if tiers.iter().all(|report| report.eligible == 0) {
			tracing::info!(corpus_items = self.corpus.len(), "No eligible items in any tier.");

			degradations.extend(Degradation::from_error(&Error::EmptyCorpus, None));

			return Ok(RetrievalResponse {
				results: Vec::new(),
				signals,
				tiers,
				rerank: RerankStatus::NoCandidates,
				degradations,
			});
		}

		let merged = merge(tiers.iter().map(|report| report.entries.clone()));
		let candidates = merged.len();
		let outcome = rerank(
			RerankArgs {
				provider: self.providers.rerank.as_deref(),
				query,
				top_n: cfg.rerank_top_n,
				timeout: Duration::from_millis(cfg.timeouts.rerank_ms),
				cancel,
			},
			merged,
			|item_id| self.corpus.item(item_id).map(|item| item.text.as_str()),
		)
		.await;

		if let Some(err) = &outcome.failure {
			degradations.extend(Degradation::from_error(err, None));
		}

		let results = select_results(outcome.results, cfg.result_count, cfg.min_per_tier);

		tracing::info!(
			candidates,
			results = results.len(),
			rerank = ?outcome.status,
			degradations = degradations.len(),
			"Retrieval completed."
		);

		Ok(RetrievalResponse { results, signals, tiers, rerank: outcome.status, degradations })
	}

	async fn run_tier(
		&self,
		spec: &TierSpec,
		signals: &QuerySignals,
		query: &str,
		cfg: &Retrieval,
	) -> TierRun {
		let predicate = spec.predicate(signals);
		let eligible: Vec<String> =
			self.corpus.eligible(&predicate).into_iter().map(|item| item.item_id.clone()).collect();
		let ranking = rank_tier(
			spec.id,
			self.providers.similarity.as_ref(),
			self.providers.keyword.as_ref(),
			query,
			&eligible,
			spec.width,
			Duration::from_millis(cfg.timeouts.signal_ms),
		)
		.await;
		let fused = fuse(spec.id, &ranking.lists, cfg.rrf_k, spec.width, |item_id| {
			self.corpus.item(item_id).map(|item| item.record_id.as_str())
		});
		let entries: Vec<BoostedEntry> = fused
			.into_iter()
			.filter_map(|entry| {
				let item = self.corpus.item(&entry.item_id)?;

				Some(boost_entry(entry, item, signals, spec))
			})
			.collect();

		tracing::debug!(
			tier = spec.id.as_str(),
			eligible = eligible.len(),
			entries = entries.len(),
			"Tier ranked."
		);

		TierRun {
			report: TierReport {
				tier: spec.id,
				status: ranking.status,
				eligible: eligible.len(),
				entries,
			},
			failures: ranking.failures,
		}
	}
}
