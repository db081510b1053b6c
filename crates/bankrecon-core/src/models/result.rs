//! Per-line results and execution outcomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::movement::{Action, BankMovement, ProcessKind};
use super::{Folio, LedgerNumber};

/// Terminal record for one statement line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineResult {
    pub movement: BankMovement,
    pub kind: ProcessKind,
    pub action: Action,
    /// Folios minted or touched for this line.
    pub folios: Vec<Folio>,
    /// Human-readable note.
    pub note: String,
}

impl LineResult {
    pub fn new(movement: BankMovement) -> Self {
        let kind = movement.kind_or_unknown();
        let action = if kind == ProcessKind::Unknown {
            Action::Unknown
        } else {
            Action::NotProcessed
        };
        Self {
            movement,
            kind,
            action,
            folios: Vec::new(),
            note: String::new(),
        }
    }

    /// Append to the note, separating pieces with " + ".
    pub fn append_note(&mut self, piece: impl AsRef<str>) {
        if self.note.is_empty() {
            self.note = piece.as_ref().to_string();
        } else {
            self.note = format!("{} + {}", self.note, piece.as_ref());
        }
    }
}

/// What actually happened when a plan was executed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub kind: String,
    pub description: String,
    /// Folios inserted, in plan order (reconciled-existing folios
    /// included).
    pub folios: Vec<Folio>,
    /// Last ledger number minted, when any.
    pub ledger_number: Option<LedgerNumber>,
    /// Movements skipped because they already existed reconciled.
    pub skipped_existing: usize,
    /// Movements found unreconciled and marked reconciled instead of
    /// inserted.
    pub reconciled_existing: usize,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn failure(kind: &str, description: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            kind: kind.to_string(),
            description: description.to_string(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// True when every plan movement pre-existed (nothing inserted).
    pub fn all_pre_existing(&self, plan_movements: usize) -> bool {
        plan_movements > 0 && self.skipped_existing + self.reconciled_existing == plan_movements
    }
}

/// Per-action counts emitted at job end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSummary {
    pub counts: BTreeMap<Action, usize>,
}

impl JobSummary {
    pub fn from_results(results: &[LineResult]) -> Self {
        let mut counts = BTreeMap::new();
        for r in results {
            *counts.entry(r.action).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, action: Action) -> usize {
        self.counts.get(&action).copied().unwrap_or(0)
    }
}
