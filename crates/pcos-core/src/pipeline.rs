//! Validation → inference → record pipeline
//!
//! One call to [`PredictionPipeline::submit`] is one press of the predict
//! button: collect the session's draft, stop if anything is missing, classify,
//! append the record to the durable history, then to the session.

use crate::catalog::FeatureCatalog;
use crate::error::{PcosError, Result};
use crate::history::HistoryStore;
use crate::input::{FieldError, InputCollector, RawForm};
use crate::models::{Prediction, PredictionRecord};
use crate::observability::{PcosMetrics, StructuredLogger};
use crate::predictor::Predictor;
use crate::recommendation::Advice;
use crate::session::Session;
use crate::validator::Validator;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Everything shown after a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub prediction: Prediction,
    pub record: PredictionRecord,
    pub advice: Advice,
}

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictOutcome {
    Predicted(PredictionReport),
    /// Nothing was classified or recorded
    Incomplete {
        missing: Vec<String>,
        field_errors: Vec<FieldError>,
    },
}

pub struct PredictionPipeline {
    catalog: Arc<FeatureCatalog>,
    collector: InputCollector,
    validator: Validator,
    predictor: Predictor,
    store: HistoryStore,
    metrics: PcosMetrics,
    logger: StructuredLogger,
}

impl PredictionPipeline {
    pub fn new(predictor: Predictor, store: HistoryStore, logger: StructuredLogger) -> Self {
        let catalog = Arc::new(predictor.catalog().clone());
        Self {
            collector: InputCollector::new(&catalog),
            catalog,
            validator: Validator::new(),
            predictor,
            store,
            metrics: PcosMetrics::new(),
            logger,
        }
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn model_version(&self) -> &str {
        self.predictor.model_version()
    }

    /// Merge `inputs` into the session draft and try to predict from it
    pub fn submit(&self, session: &mut Session, inputs: RawForm) -> Result<PredictOutcome> {
        let start = Instant::now();
        session.update_draft(inputs);

        let form = self.collector.collect(session.draft());
        if !self.validator.validate(&form.vector) {
            let missing = form.vector.missing();
            self.metrics.inc_rejected_submissions();
            self.logger
                .log_rejected(&session.id().to_string(), &missing, form.errors.len());
            return Ok(PredictOutcome::Incomplete {
                missing,
                field_errors: form.errors,
            });
        }

        let features = self.validator.check(&form.vector)?;
        let prediction = self.predictor.predict(&features).map_err(|e| {
            self.metrics.inc_prediction_errors();
            e
        })?;
        let record = PredictionRecord::new(&prediction, &features);

        let path = self.store.path().display().to_string();
        if let Err(e) = self.store.append(&record) {
            self.metrics.inc_history_append_errors();
            self.logger.log_history_error(&path, &e.to_string());
            return Err(e);
        }
        self.logger.log_history_appended(&path, record.label.as_str());

        session.record(record.clone());
        self.metrics.inc_predictions(record.label.as_str());
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());
        self.logger
            .log_prediction(&session.id().to_string(), &record, self.model_version());

        Ok(PredictOutcome::Predicted(PredictionReport {
            advice: Advice::for_prediction(&prediction),
            prediction,
            record,
        }))
    }

    /// Treats incomplete input as an error
    #[cfg(test)]
    pub(crate) fn submit_strict(&self, session: &mut Session, inputs: RawForm) -> Result<PredictionReport> {
        match self.submit(session, inputs)? {
            PredictOutcome::Predicted(report) => Ok(report),
            PredictOutcome::Incomplete { missing, field_errors } => match field_errors.into_iter().next() {
                Some(err) => Err(err.into()),
                None => Err(PcosError::MissingInput { fields: missing }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_FILE_NAME;
    use crate::models::Label;
    use crate::predictor::FixedClassifier;
    use tempfile::TempDir;

    fn pipeline(dir: &TempDir, stub: Arc<FixedClassifier>) -> PredictionPipeline {
        let predictor = Predictor::new(stub, Arc::new(FeatureCatalog::pcos()));
        PredictionPipeline::new(
            predictor,
            HistoryStore::new(dir.path().join(HISTORY_FILE_NAME)),
            StructuredLogger::new("test"),
        )
    }

    fn scenario_form() -> RawForm {
        [
            ("Follicle No. (R)", "12"),
            ("Follicle No. (L)", "10"),
            ("Skin darkening (Y/N)", "Ya (1)"),
            ("Weight gain(Y/N)", "Ya (1)"),
            ("hair growth(Y/N)", "Tidak (0)"),
            ("Cycle(R/I)", "Irregular (1)"),
            ("AMH(ng/mL)", "6,2"),
            ("Cycle length(days)", "30"),
            ("FSH(mIU/mL)", "5.1"),
            ("LH(mIU/mL)", "8.3"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_scenario_predicts_and_records() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, Arc::new(FixedClassifier::new([0.3, 0.7])));
        let mut session = Session::new();

        let report = pipeline.submit_strict(&mut session, scenario_form()).unwrap();
        assert_eq!(report.prediction.label, Label::Positive);
        assert_eq!(report.prediction.probability_positive, 0.7);
        assert_eq!(report.advice.probability_text, "Probabilitas: 70.00%");

        let log = pipeline.store().load_all().unwrap();
        assert_eq!(log.len(), 1);
        let row = &log.records[0];
        assert_eq!(row.label, Label::Positive);
        assert_eq!(row.probability_positive, 0.7);
        assert_eq!(row.probability_negative, 0.3);
        assert_eq!(row.feature("AMH(ng/mL)"), Some(6.2));
        assert_eq!(row.feature("Cycle(R/I)"), Some(1.0));
        assert_eq!(session.history(), &[row.clone()]);
    }

    #[test]
    fn test_missing_input_skips_classifier_and_history() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(FixedClassifier::new([0.3, 0.7]));
        let pipeline = pipeline(&dir, stub.clone());
        let mut session = Session::new();

        let mut form = scenario_form();
        form.insert("LH(mIU/mL)".to_string(), String::new());
        form.insert("Cycle(R/I)".to_string(), crate::catalog::UNSELECTED.to_string());

        match pipeline.submit(&mut session, form).unwrap() {
            PredictOutcome::Incomplete { missing, field_errors } => {
                assert_eq!(missing, vec!["Cycle(R/I)", "LH(mIU/mL)"]);
                assert!(field_errors.is_empty());
            }
            other => panic!("expected Incomplete, got {:?}", other),
        }
        assert!(stub.last_input().is_none());
        assert!(pipeline.store().export().unwrap().is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_malformed_number_counts_as_missing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, Arc::new(FixedClassifier::new([0.3, 0.7])));
        let mut session = Session::new();

        let mut form = scenario_form();
        form.insert("AMH(ng/mL)".to_string(), "abc".to_string());

        let err = pipeline.submit_strict(&mut session, form).unwrap_err();
        assert!(matches!(err, PcosError::MalformedNumericInput { ref field, .. } if field == "AMH(ng/mL)"));
    }

    #[test]
    fn test_fixing_one_field_completes_the_draft() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, Arc::new(FixedClassifier::new([0.8, 0.2])));
        let mut session = Session::new();

        let mut form = scenario_form();
        form.remove("FSH(mIU/mL)");
        assert!(matches!(
            pipeline.submit(&mut session, form).unwrap(),
            PredictOutcome::Incomplete { .. }
        ));

        let fix: RawForm = [("FSH(mIU/mL)".to_string(), "5.1".to_string())].into_iter().collect();
        match pipeline.submit(&mut session, fix).unwrap() {
            PredictOutcome::Predicted(report) => assert_eq!(report.record.label, Label::Negative),
            other => panic!("expected Predicted, got {:?}", other),
        }
    }

    #[test]
    fn test_n_submissions_give_n_rows() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, Arc::new(FixedClassifier::new([0.4, 0.6])));
        let mut session = Session::new();

        for _ in 0..3 {
            pipeline.submit_strict(&mut session, scenario_form()).unwrap();
        }
        assert_eq!(pipeline.store().load_all().unwrap().len(), 3);
        assert_eq!(session.history().len(), 3);
    }
}
