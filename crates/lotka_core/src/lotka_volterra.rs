//! The Lotka-Volterra predator-prey model.
//!
//! ```text
//! dx/dt = α·x − β·x·y
//! dy/dt = δ·x·y − γ·y
//! ```
//!
//! `x` is the prey density and `y` the predator density. Nothing here clamps
//! populations to be non-negative: a discretized trajectory may dip below zero
//! and is reported as computed.

use crate::error::IntegrationError;
use crate::integrate::{integrate, IntegratorSettings, Solution, TimeGrid, Trajectory};
use crate::traits::{lift, DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

/// Population state: `[prey, predator]`.
pub type State = [f64; 2];

/// Rate constants of the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateParameters {
    /// Prey birth rate.
    pub alpha: f64,
    /// Predation rate.
    pub beta: f64,
    /// Predator growth from predation.
    pub delta: f64,
    /// Predator death rate.
    pub gamma: f64,
}

impl RateParameters {
    pub fn new(alpha: f64, beta: f64, delta: f64, gamma: f64) -> Self {
        Self {
            alpha,
            beta,
            delta,
            gamma,
        }
    }
}

/// The derivative rule as a `DynamicalSystem`, usable with any `Scalar`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotkaVolterra {
    pub rates: RateParameters,
}

impl LotkaVolterra {
    pub fn new(rates: RateParameters) -> Self {
        Self { rates }
    }
}

impl<T: Scalar> DynamicalSystem<T> for LotkaVolterra {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let alpha: T = lift(self.rates.alpha);
        let beta: T = lift(self.rates.beta);
        let delta: T = lift(self.rates.delta);
        let gamma: T = lift(self.rates.gamma);
        let (prey, predator) = (x[0], x[1]);

        out[0] = alpha * prey - beta * prey * predator;
        out[1] = delta * prey * predator - gamma * predator;
    }
}

/// Instantaneous rate of change at `state`.
pub fn derivative(state: &State, rates: &RateParameters) -> State {
    let mut out = [0.0; 2];
    DynamicalSystem::<f64>::apply(&LotkaVolterra::new(*rates), 0.0, state, &mut out);
    out
}

/// Integrates from t = 0 to `t_max`, reporting `samples` evenly spaced states
/// (both endpoints included).
pub fn solve_lotka_volterra(
    initial_state: State,
    t_max: f64,
    rates: RateParameters,
    samples: usize,
    settings: &IntegratorSettings,
) -> Result<Solution, IntegrationError> {
    let grid = TimeGrid::linspace(0.0, t_max, samples)?;
    integrate(&LotkaVolterra::new(rates), &initial_state, &grid, settings)
}

/// First integral H(x, y) = δ·x − γ·ln(x) + β·y − α·ln(y).
///
/// Constant along exact trajectories in the positive quadrant; NaN once either
/// population is non-positive.
pub fn conserved_quantity(state: &[f64], rates: &RateParameters) -> f64 {
    let (x, y) = (state[0], state[1]);
    if x <= 0.0 || y <= 0.0 {
        return f64::NAN;
    }
    rates.delta * x - rates.gamma * x.ln() + rates.beta * y - rates.alpha * y.ln()
}

/// Largest |H(t) − H(0)| over the trajectory.
pub fn max_invariant_drift(trajectory: &Trajectory, rates: &RateParameters) -> f64 {
    let Some(first) = trajectory.first() else {
        return 0.0;
    };
    let h0 = conserved_quantity(first, rates);
    trajectory
        .states()
        .map(|state| (conserved_quantity(state, rates) - h0).abs())
        .fold(0.0, f64::max)
}

/// Interior fixed point (γ/δ, α/β), where both species coexist.
pub fn coexistence_equilibrium(rates: &RateParameters) -> Option<State> {
    if rates.beta == 0.0 || rates.delta == 0.0 {
        return None;
    }
    Some([rates.gamma / rates.delta, rates.alpha / rates.beta])
}

/// Period of small oscillations around the coexistence point, 2π/√(αγ).
pub fn linearized_period(rates: &RateParameters) -> Option<f64> {
    let product = rates.alpha * rates.gamma;
    if product <= 0.0 || coexistence_equilibrium(rates).is_none() {
        return None;
    }
    Some(2.0 * std::f64::consts::PI / product.sqrt())
}
