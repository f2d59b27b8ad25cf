pub mod item;
pub mod job;
pub mod tag;
pub mod text;
pub mod vocabulary;

pub use item::{CorpusItem, Scope, Severity};
pub use job::{JobRecord, QuerySignals, normalize_equipment_id, normalize_equipment_type};
pub use tag::{InvalidTag, ProcedureTag};
pub use vocabulary::VocabularyTagger;
