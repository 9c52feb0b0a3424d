use std::fmt;

use thiserror::Error;

/// Conditions that abort a run before anything is published.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no season produced any rows; check the renderer or the season URLs")]
    NoSeasonData,
    #[error("no goal-count column among {columns:?}")]
    NoGoalsColumn { columns: Vec<String> },
    #[error("no team column among {columns:?}")]
    NoTeamColumn { columns: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Csv,
    Xlsx,
    Documents,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SinkKind::Csv => "csv",
            SinkKind::Xlsx => "xlsx",
            SinkKind::Documents => "documents",
        })
    }
}

/// A failed write on one sink for one dataset. Other sinks are unaffected.
#[derive(Debug, Error)]
#[error("{sink} sink failed writing {dataset}: {source:#}")]
pub struct PublishError {
    pub sink: SinkKind,
    pub dataset: String,
    #[source]
    pub source: anyhow::Error,
}
