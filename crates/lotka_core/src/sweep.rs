//! Alpha sweeps: validate raw input once, then integrate the model for every
//! prey birth rate in the list and hand each trajectory to a sink.

use crate::error::{IntegrationError, SinkError, SweepError, ValidationError};
use crate::integrate::{integrate, IntegratorSettings, Solution, TimeGrid};
use crate::lotka_volterra::{LotkaVolterra, RateParameters, State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const MAX_ALPHA_VALUES: usize = 5;
pub const STATE_DIMENSION: usize = 2;

pub const TIME_LABEL: &str = "Time";
pub const PREY_LABEL: &str = "Prey population";
pub const PREDATOR_LABEL: &str = "Predator population";

/// Figure title for one sweep step.
pub fn plot_title(alpha: f64) -> String {
    format!("Lotka-Volterra equations, alpha={alpha}")
}

/// Unvalidated values as collected by a front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSweepInput {
    pub initial_state: Vec<f64>,
    pub alphas: Vec<f64>,
    pub beta: f64,
    pub delta: f64,
    pub gamma: f64,
}

/// A validated sweep: one shared initial state and beta/delta/gamma, 1 to 5 alphas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlphaSweepSpec {
    initial_state: State,
    alphas: Vec<f64>,
    beta: f64,
    delta: f64,
    gamma: f64,
}

impl AlphaSweepSpec {
    pub fn initial_state(&self) -> State {
        self.initial_state
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Rate constants for one sweep step.
    pub fn rates_for(&self, alpha: f64) -> RateParameters {
        RateParameters::new(alpha, self.beta, self.delta, self.gamma)
    }
}

/// Checks cardinality of raw input. Rate values are passed through unchanged;
/// negative or zero rates are the caller's policy.
pub struct ParameterValidator;

impl ParameterValidator {
    pub fn validate(input: &RawSweepInput) -> Result<AlphaSweepSpec, ValidationError> {
        let initial_state: State = input.initial_state.as_slice().try_into().map_err(|_| {
            ValidationError::InvalidInitialState {
                found: input.initial_state.len(),
                expected: STATE_DIMENSION,
            }
        })?;
        if input.alphas.is_empty() {
            return Err(ValidationError::NoAlphaValues);
        }
        if input.alphas.len() > MAX_ALPHA_VALUES {
            return Err(ValidationError::TooManyAlphaValues {
                found: input.alphas.len(),
                max: MAX_ALPHA_VALUES,
            });
        }
        Ok(AlphaSweepSpec {
            initial_state,
            alphas: input.alphas.clone(),
            beta: input.beta,
            delta: input.delta,
            gamma: input.gamma,
        })
    }
}

impl TryFrom<RawSweepInput> for AlphaSweepSpec {
    type Error = ValidationError;

    fn try_from(input: RawSweepInput) -> Result<Self, Self::Error> {
        ParameterValidator::validate(&input)
    }
}

/// What happens to the remaining alphas after one integration fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep going.
    #[default]
    Continue,
    /// Stop at the first failure.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub t_max: f64,
    pub samples: usize,
    pub failure_policy: FailurePolicy,
    /// Integrate alphas on scoped threads; emission order is unchanged.
    pub parallel: bool,
    pub integrator: IntegratorSettings,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            t_max: 10.0,
            samples: 50,
            failure_policy: FailurePolicy::Continue,
            parallel: false,
            integrator: IntegratorSettings::default(),
        }
    }
}

/// One completed sweep step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOutput {
    /// Position of `alpha` in the input list.
    pub index: usize,
    pub alpha: f64,
    pub rates: RateParameters,
    pub solution: Solution,
}

impl SweepOutput {
    pub fn title(&self) -> String {
        plot_title(self.alpha)
    }
}

/// Receives sweep outputs in input-list order.
pub trait TrajectorySink {
    fn accept(&mut self, output: SweepOutput) -> Result<(), SinkError>;
}

impl TrajectorySink for Vec<SweepOutput> {
    fn accept(&mut self, output: SweepOutput) -> Result<(), SinkError> {
        self.push(output);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SweepSummary {
    /// Alphas whose output reached the sink, in emission order.
    pub completed: Vec<f64>,
    /// Failures recorded under `FailurePolicy::Continue`.
    pub failures: Vec<SweepError>,
}

impl SweepSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct SweepOrchestrator {
    spec: AlphaSweepSpec,
    config: SweepConfig,
    grid: TimeGrid,
}

impl SweepOrchestrator {
    /// Fails before any integration if the time span or integrator settings are invalid.
    pub fn new(spec: AlphaSweepSpec, config: SweepConfig) -> Result<Self, IntegrationError> {
        config.integrator.validate()?;
        let grid = TimeGrid::linspace(0.0, config.t_max, config.samples)?;
        Ok(Self { spec, config, grid })
    }

    /// Runs one integration per alpha and emits outputs in list order.
    ///
    /// A sink error always aborts. An integration failure aborts under
    /// `FailurePolicy::Abort` and is collected in the summary otherwise.
    pub fn run<S: TrajectorySink + ?Sized>(&self, sink: &mut S) -> Result<SweepSummary, SweepError> {
        info!(
            alphas = self.spec.alphas.len(),
            samples = self.grid.len(),
            t_max = self.config.t_max,
            parallel = self.config.parallel,
            "starting sweep"
        );
        if self.config.parallel {
            let results = self.solve_parallel();
            self.emit(results.into_iter(), sink)
        } else {
            let results = self
                .spec
                .alphas
                .iter()
                .map(|&alpha| self.solve_one(alpha));
            self.emit(results, sink)
        }
    }

    fn solve_one(&self, alpha: f64) -> Result<Solution, IntegrationError> {
        let system = LotkaVolterra::new(self.spec.rates_for(alpha));
        integrate(
            &system,
            &self.spec.initial_state,
            &self.grid,
            &self.config.integrator,
        )
    }

    fn solve_parallel(&self) -> Vec<Result<Solution, IntegrationError>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .spec
                .alphas
                .iter()
                .map(|&alpha| scope.spawn(move || self.solve_one(alpha)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    fn emit<I, S>(&self, results: I, sink: &mut S) -> Result<SweepSummary, SweepError>
    where
        I: Iterator<Item = Result<Solution, IntegrationError>>,
        S: TrajectorySink + ?Sized,
    {
        let mut summary = SweepSummary::default();
        for (index, (&alpha, result)) in self.spec.alphas.iter().zip(results).enumerate() {
            match result {
                Ok(solution) => {
                    info!(
                        index,
                        alpha,
                        accepted = solution.stats.accepted_steps,
                        rejected = solution.stats.rejected_steps,
                        "sweep step completed"
                    );
                    let output = SweepOutput {
                        index,
                        alpha,
                        rates: self.spec.rates_for(alpha),
                        solution,
                    };
                    sink.accept(output)
                        .map_err(|source| SweepError::Sink {
                            index,
                            alpha,
                            source,
                        })?;
                    summary.completed.push(alpha);
                }
                Err(source) => {
                    let err = SweepError::SweepStepFailed {
                        index,
                        alpha,
                        source,
                    };
                    match self.config.failure_policy {
                        FailurePolicy::Abort => return Err(err),
                        FailurePolicy::Continue => {
                            warn!(index, alpha, error = %err, "sweep step failed, continuing");
                            summary.failures.push(err);
                        }
                    }
                }
            }
        }
        Ok(summary)
    }
}
