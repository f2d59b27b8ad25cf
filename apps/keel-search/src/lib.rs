use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use keel_config::Config;
use keel_domain::{JobRecord, VocabularyTagger};
use keel_providers::{Bm25Index, DenseIndex, EmbeddingProvider, HttpEmbedding};
use keel_service::{HttpRerank, Providers, RerankProvider, RetrievalResponse, RetrievalService};
use keel_storage::Corpus;

#[derive(Debug, Parser)]
#[command(
	version = keel_cli::VERSION,
	rename_all = "kebab",
	styles = keel_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, value_name = "FILE")]
	pub corpus: PathBuf,
	#[arg(
		long,
		short = 'j',
		value_name = "FILE",
		required_unless_present = "jobs",
		conflicts_with = "jobs"
	)]
	pub job: Option<PathBuf>,
	/// A JSON array of jobs, answered in order against one loaded corpus.
	#[arg(long, value_name = "FILE")]
	pub jobs: Option<PathBuf>,
	/// Overrides `retrieval.result_count`.
	#[arg(long, short = 'n', value_name = "N")]
	pub results: Option<u32>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let mut config = keel_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	if let Some(results) = args.results {
		config.retrieval.result_count = results;
	}

	let corpus = Corpus::load(&args.corpus)?;
	let rendered = match (&args.job, &args.jobs) {
		(_, Some(path)) => {
			let jobs = load_jobs(path)?;

			serde_json::to_string_pretty(&search_batch(&config, corpus, jobs).await?)?
		},
		(Some(path), None) => {
			let job = load_job(path)?;

			serde_json::to_string_pretty(&search(&config, corpus, &job).await?)?
		},
		(None, None) => return Err(eyre::eyre!("Either --job or --jobs is required.")),
	};

	println!("{rendered}");

	Ok(())
}

#[derive(Debug, Serialize)]
pub struct BatchEntry {
	pub job: JobRecord,
	pub response: RetrievalResponse,
}

/// Wires the in-memory corpus to the configured signals and runs one query.
pub async fn search(
	config: &Config,
	corpus: Corpus,
	job: &JobRecord,
) -> color_eyre::Result<RetrievalResponse> {
	let service = build_service(config, corpus)?;

	Ok(service.retrieve(job, &config.retrieval).await?)
}

/// Runs every job against one service, so the corpus and indexes are built once.
pub async fn search_batch(
	config: &Config,
	corpus: Corpus,
	jobs: Vec<JobRecord>,
) -> color_eyre::Result<Vec<BatchEntry>> {
	let service = build_service(config, corpus)?;
	let mut out = Vec::with_capacity(jobs.len());

	for job in jobs {
		let response = service.retrieve(&job, &config.retrieval).await?;

		out.push(BatchEntry { job, response });
	}

	tracing::info!(jobs = out.len(), "Batch completed.");

	Ok(out)
}

pub fn build_service(config: &Config, corpus: Corpus) -> color_eyre::Result<RetrievalService> {
	let keyword = Bm25Index::build(corpus.items());
	let embedding = config
		.providers
		.embedding
		.clone()
		.map(|cfg| Arc::new(HttpEmbedding::new(cfg)) as Arc<dyn EmbeddingProvider>);
	let similarity = DenseIndex::new(corpus.vectors(), embedding);
	let rerank = config
		.providers
		.rerank
		.clone()
		.map(|cfg| Arc::new(HttpRerank::new(cfg)) as Arc<dyn RerankProvider>);
	let tagger = VocabularyTagger::from_config(&config.vocabulary)?;

	if config.providers.embedding.is_none() {
		tracing::warn!("No embedding provider configured; similarity ranking is unavailable.");
	}

	tracing::info!(
		items = corpus.len(),
		vectors = similarity.len(),
		vocabulary = tagger.len(),
		rerank = rerank.is_some(),
		"Retrieval service built."
	);

	let providers =
		Providers::new(Arc::new(similarity), Arc::new(keyword), rerank, Arc::new(tagger));

	Ok(RetrievalService::new(Arc::new(corpus), providers))
}

pub fn load_job(path: &Path) -> color_eyre::Result<JobRecord> {
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read job file at {path:?}."))?;
	let job: JobRecord = serde_json::from_str(&raw)?;

	if !has_query_fields(&job) {
		return Err(eyre::eyre!("Job must include a description or equipment fields."));
	}

	Ok(job)
}

pub fn load_jobs(path: &Path) -> color_eyre::Result<Vec<JobRecord>> {
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read jobs file at {path:?}."))?;
	let jobs: Vec<JobRecord> = serde_json::from_str(&raw)?;

	if let Some(index) = jobs.iter().position(|job| !has_query_fields(job)) {
		return Err(eyre::eyre!("Job {index} must include a description or equipment fields."));
	}

	Ok(jobs)
}

fn has_query_fields(job: &JobRecord) -> bool {
	!job.query_text().is_empty()
		|| job.equipment_type.as_deref().is_some_and(|value| !value.trim().is_empty())
}
