//! Persistence of analysis results

pub mod sqlite;

use crate::error::Result;
use crate::processing::analyzer::AnalysisResult;
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteStore;

/// An analysis result as read back from storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: i64,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

pub trait ResultStore: Send + Sync {
    /// Persist one result and return its id
    fn save(&self, result: &AnalysisResult) -> Result<i64>;

    /// All results, most recent first
    fn fetch_all(&self) -> Result<Vec<StoredAnalysis>>;

    fn get(&self, id: i64) -> Result<Option<StoredAnalysis>>;
}
