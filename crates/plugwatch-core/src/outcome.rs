//! Per-unit results of a provisioning run

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// What happened to the template bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// No bundle configured
    Skipped,
    Imported {
        template: PathBuf,
    },
    Failed {
        template: PathBuf,
        reason: String,
    },
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::Skipped => f.write_str("skipped"),
            ImportOutcome::Imported { .. } => f.write_str("imported"),
            ImportOutcome::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// What happened to one declared host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    Created { hostid: String },
    /// Already on the server, left untouched
    Exists,
    /// Groups or templates did not resolve
    Skipped { reason: String },
    Failed { reason: String },
}

/// Outcome tagged with the host's technical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub host: String,
    pub outcome: HostOutcome,
}

/// Aggregated result of a run that reached `Success`
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub template: ImportOutcome,
    pub hosts: Vec<HostReport>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&HostOutcome) -> bool) -> usize {
        self.hosts.iter().filter(|r| pred(&r.outcome)).count()
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, HostOutcome::Created { .. }))
    }

    #[must_use]
    pub fn existing(&self) -> usize {
        self.count(|o| matches!(o, HostOutcome::Exists))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, HostOutcome::Skipped { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, HostOutcome::Failed { .. }))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} existing={} skipped={} failed={} template={}",
            self.created(),
            self.existing(),
            self.skipped(),
            self.failed(),
            self.template
        )
    }
}
