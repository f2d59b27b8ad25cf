use keel_domain::{JobRecord, QuerySignals, normalize_equipment_id, normalize_equipment_type};

use crate::TagExtractor;

/// Derives the job-side matching attributes. Missing fields produce absent signals; this never
/// fails. Procedure tags come from every text field of the job, not only the description.
pub fn extract_signals(job: &JobRecord, tagger: &dyn TagExtractor) -> QuerySignals {
	let text = job.query_text();
	let procedures = if text.is_empty() { Default::default() } else { tagger.extract(&text) };

	QuerySignals {
		equipment_id: normalize_equipment_id(job.equipment_id.as_deref()),
		equipment_type: normalize_equipment_type(job.equipment_type.as_deref()),
		procedures,
	}
}

#[cfg(test)]
mod tests {
	use keel_domain::VocabularyTagger;

	use super::*;

	fn tagger() -> VocabularyTagger {
		VocabularyTagger::new(["inspection", "lockout_tagout"]).expect("Vocabulary must be valid.")
	}

	#[test]
	fn derives_all_attributes() {
		let job = JobRecord {
			equipment_id: Some(" p-101 ".to_string()),
			equipment_type: Some("Centrifugal_Pump".to_string()),
			description: "Lockout tagout then inspection of the impeller.".to_string(),
			..Default::default()
		};
		let signals = extract_signals(&job, &tagger());

		assert_eq!(signals.equipment_id.as_deref(), Some("P-101"));
		assert_eq!(signals.equipment_type.as_deref(), Some("centrifugal_pump"));
		assert_eq!(
			signals.procedures.iter().map(|tag| tag.as_str()).collect::<Vec<_>>(),
			vec!["inspection", "lockout_tagout"]
		);
	}

	#[test]
	fn tags_come_from_title_and_job_type() {
		let job = JobRecord {
			title: Some("Lockout tagout".to_string()),
			job_type: Some("inspection".to_string()),
			..Default::default()
		};
		let signals = extract_signals(&job, &tagger());

		assert_eq!(
			signals.procedures.iter().map(|tag| tag.as_str()).collect::<Vec<_>>(),
			vec!["inspection", "lockout_tagout"]
		);
	}

	#[test]
	fn empty_job_yields_empty_signals() {
		let signals = extract_signals(&JobRecord::default(), &tagger());

		assert_eq!(signals, QuerySignals::default());
	}
}
