pub mod corpus;

mod error;

pub use corpus::{Corpus, CorpusEntry, CorpusFile};
pub use error::{Error, Result};
