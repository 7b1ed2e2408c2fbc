//! Typed JSON columns stored on the `sync_jobs` table.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

use crate::sync::{SyncOptions, SyncProgress};

/// Structured job metadata: the caller's options plus the most recent
/// progress snapshot and, once finished, a human-readable summary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct JobMetadata {
    pub options: SyncOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_progress: Option<SyncProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl JobMetadata {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            last_progress: None,
            summary: None,
        }
    }
}

/// Ordered list of error messages recorded against a job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ErrorDetails(pub Vec<String>);

impl ErrorDetails {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, messages: I) {
        self.0.extend(messages);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_omits_empty_snapshot_and_summary() {
        let metadata = JobMetadata::new(SyncOptions::default());
        let json = serde_json::to_value(&metadata).expect("serializable");

        assert!(json.get("options").is_some());
        assert!(json.get("last_progress").is_none());
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn error_details_serialize_as_plain_list() {
        let mut details = ErrorDetails::default();
        details.push("page 2: timeout");
        let json = serde_json::to_value(&details).expect("serializable");
        assert_eq!(json, serde_json::json!(["page 2: timeout"]));
    }
}
