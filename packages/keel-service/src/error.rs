use crate::dual::SignalKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Only `Configuration` aborts a query. Every other variant degrades the response and is
/// reported through [`crate::Degradation`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Signal {signal} timed out after {timeout_ms} ms.")]
	SignalTimeout { signal: SignalKind, timeout_ms: u64 },
	#[error("Signal {signal} unavailable: {message}")]
	SignalUnavailable { signal: SignalKind, message: String },
	#[error("Rerank unavailable: {message}")]
	RerankUnavailable { message: String },
	#[error("No eligible items in any tier.")]
	EmptyCorpus,
}
impl From<keel_config::Error> for Error {
	fn from(err: keel_config::Error) -> Self {
		Self::Configuration { message: err.to_string() }
	}
}
