//! Error taxonomy for validation, integration and sweeps.
//!
//! Every variant carries the offending value together with the bound it
//! violated, so a failure can be reproduced from its message alone.

use std::fmt;
use thiserror::Error;

/// Raw sweep input rejected before any integration work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("initial state must have exactly {expected} values (prey, predator), got {found}")]
    InvalidInitialState { found: usize, expected: usize },

    #[error("no alpha values supplied; at least one is required")]
    NoAlphaValues,

    #[error("too many alpha values: got {found}, at most {max} may be swept")]
    TooManyAlphaValues { found: usize, max: usize },
}

/// Why the adaptive integrator gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceReason {
    /// The proposed step fell below the configured minimum.
    StepCollapsed,
    /// An accepted step produced NaN or infinite components.
    NonFiniteState,
    /// The configured step budget ran out before the end time.
    StepBudgetExhausted,
}

impl fmt::Display for DivergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceReason::StepCollapsed => write!(f, "step size collapsed below minimum"),
            DivergenceReason::NonFiniteState => write!(f, "state became non-finite"),
            DivergenceReason::StepBudgetExhausted => write!(f, "step budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error(
        "invalid time span [{start}, {end}] with {samples} samples: \
         end must exceed start and at least 2 samples are required"
    )]
    InvalidTimeSpan { start: f64, end: f64, samples: usize },

    #[error(
        "integration diverged at t = {t}: {reason} \
         (last step {step:e}, minimum step {min_step:e})"
    )]
    IntegrationDivergence {
        t: f64,
        step: f64,
        min_step: f64,
        reason: DivergenceReason,
    },

    #[error("system has zero dimension")]
    EmptySystem,

    #[error("state dimension mismatch: system expects {expected} values, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid integrator settings: {0}")]
    InvalidSettings(String),
}

/// Error type a `TrajectorySink` may report.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("sweep step {index} (alpha = {alpha}) failed: {source}")]
    SweepStepFailed {
        index: usize,
        alpha: f64,
        #[source]
        source: IntegrationError,
    },

    #[error("sink rejected output of sweep step {index} (alpha = {alpha}): {source}")]
    Sink {
        index: usize,
        alpha: f64,
        #[source]
        source: SinkError,
    },
}

impl SweepError {
    pub fn alpha(&self) -> f64 {
        match self {
            SweepError::SweepStepFailed { alpha, .. } | SweepError::Sink { alpha, .. } => *alpha,
        }
    }
}
