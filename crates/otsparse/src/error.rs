//! Error type shared by the solvers and the sparsifier.

use std::fmt;

/// Input validation and numerical failures.
///
/// Solver outcomes that still produce a result (infeasible support,
/// iteration cap) are reported through `simplex::SolveStatus`, not here.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportError {
    EmptyInput {
        what: &'static str,
    },
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    InvalidParam {
        name: &'static str,
        reason: String,
    },
    InvalidWeights {
        reason: String,
    },
    MassImbalance {
        source_mass: f64,
        target_mass: f64,
    },
    NonFinite {
        what: &'static str,
    },
    NegativeCost {
        row: usize,
        col: usize,
        value: f64,
    },
}

impl TransportError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn weights(reason: impl Into<String>) -> Self {
        Self::InvalidWeights {
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(what: &'static str, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            got,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput { what } => write!(f, "empty input: {what}"),
            Self::ShapeMismatch {
                what,
                expected,
                got,
            } => write!(f, "shape mismatch for {what}: expected {expected}, got {got}"),
            Self::InvalidParam { name, reason } => write!(f, "invalid parameter {name}: {reason}"),
            Self::InvalidWeights { reason } => write!(f, "invalid marginal weights: {reason}"),
            Self::MassImbalance {
                source_mass,
                target_mass,
            } => write!(
                f,
                "unbalanced marginals: source mass {source_mass} != target mass {target_mass}"
            ),
            Self::NonFinite { what } => write!(f, "non-finite values in {what}"),
            Self::NegativeCost { row, col, value } => {
                write!(f, "negative ground cost {value} at ({row}, {col})")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Check that `w` is a usable marginal: finite, non-negative, positive total mass.
pub(crate) fn check_weights(w: &[f64], what: &'static str) -> Result<f64, TransportError> {
    if w.is_empty() {
        return Err(TransportError::EmptyInput { what });
    }
    let mut total = 0.0;
    for (i, &x) in w.iter().enumerate() {
        if !x.is_finite() || x < 0.0 {
            return Err(TransportError::weights(format!("{what}[{i}] = {x}")));
        }
        total += x;
    }
    if total <= 0.0 {
        return Err(TransportError::weights(format!("{what} has zero total mass")));
    }
    Ok(total)
}
