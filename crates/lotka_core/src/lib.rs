pub mod autodiff;
pub mod equilibrium;
pub mod error;
pub mod integrate;
pub mod lotka_volterra;
pub mod solvers;
pub mod sweep;
/// The `lotka_core` crate provides the numerical engine for the `lotka` CLI.
/// The derivative rule is generic over a `Scalar`, so the same code runs on plain
/// `f64` during integration and on Dual numbers when a Jacobian is needed.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODE right-hand side),
///   `EmbeddedStepper` (Runge-Kutta pairs with a local error estimate).
/// - **Lotka-Volterra**: rate parameters, the derivative rule and its conserved quantity.
/// - **Integrate**: adaptive-step driver that reports samples on a fixed `TimeGrid`.
/// - **Sweep**: input validation and the per-alpha sweep orchestrator.
/// - **Equilibrium**: Jacobian (via `autodiff`) and eigenvalue classification of fixed points.
pub mod traits;

pub use error::{DivergenceReason, IntegrationError, SweepError, ValidationError};
pub use integrate::{integrate, IntegrationStats, IntegratorSettings, Solution, TimeGrid, Trajectory};
pub use lotka_volterra::{LotkaVolterra, RateParameters, State};
pub use sweep::{
    AlphaSweepSpec, FailurePolicy, ParameterValidator, RawSweepInput, SweepConfig,
    SweepOrchestrator, SweepOutput, SweepSummary, TrajectorySink,
};
