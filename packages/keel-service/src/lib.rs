pub mod boost;
pub mod dual;
pub mod fusion;
pub mod merge;
pub mod rerank;
pub mod retrieve;
pub mod signals;
pub mod tiers;

mod error;

use std::{collections::BTreeSet, sync::Arc};

pub use boost::{AppliedBoost, BoostedEntry};
pub use dual::{RankedEntry, SignalKind, TierStatus};
pub use error::{Error, Result};
pub use fusion::{FusedEntry, rrf_contribution};
pub use merge::{MergedResult, ResultExplain};
pub use rerank::RerankStatus;
pub use retrieve::{Degradation, DegradationKind, RetrievalResponse, TierReport};
pub use tiers::{BoostRule, TierId, TierPredicate, TierSpec};

pub use keel_providers::BoxFuture;

use keel_config::ProviderConfig;
use keel_domain::{CorpusItem, ProcedureTag, VocabularyTagger};
use keel_providers::{Bm25Index, DenseIndex};
use keel_storage::Corpus;

/// A ranking signal. Returns item ids best first, drawn from `eligible` and at most `width` long.
pub trait Ranker
where
	Self: Send + Sync,
{
	fn rank<'a>(
		&'a self,
		query: &'a str,
		eligible: &'a [String],
		width: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>>;
}

/// A pairwise scorer. Returns one score per doc, in `docs` order.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait TagExtractor
where
	Self: Send + Sync,
{
	fn extract(&self, text: &str) -> BTreeSet<ProcedureTag>;
}

/// Read-only view of the corpus that stays consistent for the duration of a query.
pub trait CorpusSnapshot
where
	Self: Send + Sync,
{
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn eligible(&self, predicate: &TierPredicate<'_>) -> Vec<&CorpusItem>;

	fn item(&self, item_id: &str) -> Option<&CorpusItem>;
}

#[derive(Clone)]
pub struct Providers {
	pub similarity: Arc<dyn Ranker>,
	pub keyword: Arc<dyn Ranker>,
	/// `None` disables reranking.
	pub rerank: Option<Arc<dyn RerankProvider>>,
	pub tagger: Arc<dyn TagExtractor>,
}
impl Providers {
	pub fn new(
		similarity: Arc<dyn Ranker>,
		keyword: Arc<dyn Ranker>,
		rerank: Option<Arc<dyn RerankProvider>>,
		tagger: Arc<dyn TagExtractor>,
	) -> Self {
		Self { similarity, keyword, rerank, tagger }
	}
}

pub struct RetrievalService {
	pub corpus: Arc<dyn CorpusSnapshot>,
	pub providers: Providers,
}
impl RetrievalService {
	pub fn new(corpus: Arc<dyn CorpusSnapshot>, providers: Providers) -> Self {
		Self { corpus, providers }
	}
}

/// Rerank provider backed by the HTTP rerank endpoint.
pub struct HttpRerank {
	cfg: ProviderConfig,
}
impl HttpRerank {
	pub fn new(cfg: ProviderConfig) -> Self {
		Self { cfg }
	}
}

impl RerankProvider for HttpRerank {
	fn rerank<'a>(
		&'a self,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(keel_providers::rerank::rerank(&self.cfg, query, docs))
	}
}

impl Ranker for Bm25Index {
	fn rank<'a>(
		&'a self,
		query: &'a str,
		eligible: &'a [String],
		width: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(async move { Ok(self.search(query, eligible, width)) })
	}
}

impl Ranker for DenseIndex {
	fn rank<'a>(
		&'a self,
		query: &'a str,
		eligible: &'a [String],
		width: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(self.search(query, eligible, width))
	}
}

impl TagExtractor for VocabularyTagger {
	fn extract(&self, text: &str) -> BTreeSet<ProcedureTag> {
		VocabularyTagger::extract(self, text)
	}
}

impl CorpusSnapshot for Corpus {
	fn len(&self) -> usize {
		Corpus::len(self)
	}

	fn eligible(&self, predicate: &TierPredicate<'_>) -> Vec<&CorpusItem> {
		self.select(|item| predicate.admits(item))
	}

	fn item(&self, item_id: &str) -> Option<&CorpusItem> {
		self.get(item_id)
	}
}
