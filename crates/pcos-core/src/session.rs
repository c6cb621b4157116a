//! Per-user form session
//!
//! A session lives from the moment a user opens the form until they leave.
//! It holds the current form draft and the predictions made in this session
//! only; the durable history is owned by [`crate::history::HistoryStore`].

use crate::input::RawForm;
use crate::models::PredictionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    touched_at: DateTime<Utc>,
    draft: RawForm,
    history: Vec<PredictionRecord>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            touched_at: now,
            draft: RawForm::new(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Last time the user acted on this session
    pub fn touched_at(&self) -> DateTime<Utc> {
        self.touched_at
    }

    pub fn touch(&mut self) {
        self.touched_at = Utc::now();
    }

    /// True once the session has gone unused for longer than `ttl`
    pub fn is_idle(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.touched_at > ttl
    }

    /// Current raw form values
    pub fn draft(&self) -> &RawForm {
        &self.draft
    }

    /// Merge edited fields into the draft; untouched fields keep their value
    pub fn update_draft(&mut self, inputs: RawForm) {
        self.draft.extend(inputs);
    }

    /// Clear every form field
    pub fn reset(&mut self) {
        self.draft.clear();
    }

    /// Predictions made in this session, oldest first
    pub fn history(&self) -> &[PredictionRecord] {
        &self.history
    }

    pub(crate) fn record(&mut self, record: PredictionRecord) {
        self.history.push(record);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
