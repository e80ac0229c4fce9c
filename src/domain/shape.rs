// ============================================================
// Layer 3 — Shape Contract
// ============================================================
// The artifact's interface is "any batch, then exactly
// (2500, 1)". Keeping that as a type instead of a list of
// numbers means both the exporter's dummy input and the
// verifier's probe are checked against the same rule.
//
//   axis 0  → symbolic, resolved per call (batch)
//   axis 1+ → fixed at export time

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::contract::{BATCH_AXIS_NAME, FEATURE_WIDTH, SEQUENCE_LENGTH};

/// One declared tensor axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dim {
    Fixed(usize),
    Symbolic(String),
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n)    => write!(f, "{n}"),
            Dim::Symbolic(s) => write!(f, "'{s}'"),
        }
    }
}

/// A leading symbolic batch axis followed by fixed axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeContract {
    batch_name: String,
    fixed:      Vec<usize>,
}

impl ShapeContract {
    pub fn batched(batch_name: impl Into<String>, fixed: impl Into<Vec<usize>>) -> Self {
        Self { batch_name: batch_name.into(), fixed: fixed.into() }
    }

    /// `(batch_size, 2500, 1)` — the contract of the ECG artifact.
    pub fn ecg() -> Self {
        Self::batched(BATCH_AXIS_NAME, [SEQUENCE_LENGTH, FEATURE_WIDTH])
    }

    /// Declared dims, batch first.
    pub fn dims(&self) -> Vec<Dim> {
        std::iter::once(Dim::Symbolic(self.batch_name.clone()))
            .chain(self.fixed.iter().copied().map(Dim::Fixed))
            .collect()
    }

    /// The concrete shape for one batch size.
    pub fn concrete(&self, batch: usize) -> Vec<usize> {
        std::iter::once(batch).chain(self.fixed.iter().copied()).collect()
    }

    /// True when `shape` is exactly this contract at `batch`.
    pub fn is_exact(&self, shape: &[usize], batch: usize) -> bool {
        shape == self.concrete(batch).as_slice()
    }

    /// Rebuild a contract from declared dims. Only succeeds for a symbolic
    /// first axis followed by fixed axes.
    pub fn from_dims(dims: &[Dim]) -> Option<Self> {
        let (first, rest) = dims.split_first()?;
        let Dim::Symbolic(batch_name) = first else {
            return None;
        };
        let fixed = rest
            .iter()
            .map(|d| match d {
                Dim::Fixed(n)    => Some(*n),
                Dim::Symbolic(_) => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self::batched(batch_name.clone(), fixed))
    }
}

impl fmt::Display for ShapeContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims().iter().map(ToString::to_string).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}
