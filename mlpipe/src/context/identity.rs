//! Run identity for tracking pipeline executions.

use crate::utils::{generate_run_id, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique, time-ordered ID for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: Timestamp,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: generate_run_id(),
            started_at: Utc::now(),
        }
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
        }
    }

    /// The run ID as a hyphenated string.
    #[must_use]
    pub fn run_id_string(&self) -> String {
        self.run_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identities_differ() {
        let a = RunIdentity::new();
        let b = RunIdentity::new();
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_with_run_id() {
        let id = Uuid::nil();
        let identity = RunIdentity::with_run_id(id);
        assert_eq!(identity.run_id_string(), "00000000-0000-0000-0000-000000000000");
    }
}
