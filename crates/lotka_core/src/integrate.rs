//! Adaptive-step integration reported on a fixed output grid.
//!
//! The internal step size is chosen by error control on the embedded Tsit5
//! pair; steps are shortened only where needed to land exactly on the next
//! requested sample time, so output resolution does not drive accuracy.

use crate::error::{DivergenceReason, IntegrationError};
use crate::solvers::Tsit5;
use crate::traits::{DynamicalSystem, EmbeddedStepper};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tolerances and step-size bounds of the adaptive integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorSettings {
    pub rtol: f64,
    pub atol: f64,
    /// Below this proposed step the run is declared divergent.
    pub min_step: f64,
    pub max_step: Option<f64>,
    /// First trial step; estimated from the initial derivative when absent.
    pub initial_step: Option<f64>,
    /// Budget of attempted (accepted + rejected) steps.
    pub max_steps: usize,
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-10,
            min_step: 1e-12,
            max_step: None,
            initial_step: None,
            max_steps: 1_000_000,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> Result<(), IntegrationError> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        let invalid = |message: String| Err(IntegrationError::InvalidSettings(message));

        if !positive(self.rtol) {
            return invalid(format!("rtol must be positive, got {}", self.rtol));
        }
        if !positive(self.atol) {
            return invalid(format!("atol must be positive, got {}", self.atol));
        }
        if !positive(self.min_step) {
            return invalid(format!("min_step must be positive, got {}", self.min_step));
        }
        if let Some(max_step) = self.max_step {
            if !positive(max_step) || max_step < self.min_step {
                return invalid(format!(
                    "max_step must be at least min_step ({}), got {}",
                    self.min_step, max_step
                ));
            }
        }
        if let Some(initial_step) = self.initial_step {
            if !positive(initial_step) {
                return invalid(format!("initial_step must be positive, got {initial_step}"));
            }
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be greater than zero".to_string());
        }
        if !positive(self.safety) || self.safety > 1.0 {
            return invalid(format!("safety must lie in (0, 1], got {}", self.safety));
        }
        if !positive(self.min_factor) || self.min_factor >= 1.0 {
            return invalid(format!("min_factor must lie in (0, 1), got {}", self.min_factor));
        }
        if !self.max_factor.is_finite() || self.max_factor <= 1.0 {
            return invalid(format!("max_factor must exceed 1, got {}", self.max_factor));
        }
        Ok(())
    }
}

/// Strictly increasing output times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeGrid {
    points: Vec<f64>,
}

impl TimeGrid {
    /// `samples` evenly spaced points over [start, end], both endpoints included.
    pub fn linspace(start: f64, end: f64, samples: usize) -> Result<Self, IntegrationError> {
        if !start.is_finite() || !end.is_finite() || end <= start || samples < 2 {
            return Err(IntegrationError::InvalidTimeSpan {
                start,
                end,
                samples,
            });
        }
        let last = samples - 1;
        let span = end - start;
        let points = (0..samples)
            .map(|i| {
                if i == last {
                    end
                } else {
                    start + span * (i as f64 / last as f64)
                }
            })
            .collect();
        Ok(Self { points })
    }

    /// Arbitrary spacing; every consecutive pair must be strictly increasing.
    pub fn from_points(points: Vec<f64>) -> Result<Self, IntegrationError> {
        let samples = points.len();
        if samples < 2 {
            let start = points.first().copied().unwrap_or(f64::NAN);
            return Err(IntegrationError::InvalidTimeSpan {
                start,
                end: start,
                samples,
            });
        }
        for pair in points.windows(2) {
            if !pair[0].is_finite() || !pair[1].is_finite() || pair[1] <= pair[0] {
                return Err(IntegrationError::InvalidTimeSpan {
                    start: pair[0],
                    end: pair[1],
                    samples,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.points[0]
    }

    pub fn end(&self) -> f64 {
        self.points[self.points.len() - 1]
    }
}

/// States sampled on a `TimeGrid`, stored row-major and index-aligned with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    dimension: usize,
    values: Vec<f64>,
}

/// Range and turning points of one state component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub min: f64,
    pub max: f64,
    pub local_maxima: usize,
    pub local_minima: usize,
}

impl Trajectory {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.values.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn state(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.dimension)?;
        self.values.get(start..start + self.dimension)
    }

    pub fn first(&self) -> Option<&[f64]> {
        self.state(0)
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.len().checked_sub(1).and_then(|index| self.state(index))
    }

    pub fn states(&self) -> std::slice::ChunksExact<'_, f64> {
        self.values.chunks_exact(self.dimension)
    }

    /// Time series of one state variable (0 = prey, 1 = predator).
    pub fn component(&self, index: usize) -> Vec<f64> {
        assert!(index < self.dimension, "component index out of range");
        self.states().map(|state| state[index]).collect()
    }

    pub fn summary(&self, index: usize) -> ComponentSummary {
        let series = self.component(index);
        let mut summary = ComponentSummary {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            local_maxima: 0,
            local_minima: 0,
        };
        for &value in &series {
            summary.min = summary.min.min(value);
            summary.max = summary.max.max(value);
        }
        for window in series.windows(3) {
            if window[1] > window[0] && window[1] > window[2] {
                summary.local_maxima += 1;
            } else if window[1] < window[0] && window[1] < window[2] {
                summary.local_minima += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}

/// Output of one integration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub grid: TimeGrid,
    pub trajectory: Trajectory,
    pub stats: IntegrationStats,
}

/// Solves the initial-value problem of `system` and samples it on `grid`.
///
/// The first sample is `initial_state` itself, taken at `grid.start()`.
pub fn integrate<S: DynamicalSystem<f64>>(
    system: &S,
    initial_state: &[f64],
    grid: &TimeGrid,
    settings: &IntegratorSettings,
) -> Result<Solution, IntegrationError> {
    settings.validate()?;
    let dim = system.dimension();
    if dim == 0 {
        return Err(IntegrationError::EmptySystem);
    }
    if initial_state.len() != dim {
        return Err(IntegrationError::DimensionMismatch {
            expected: dim,
            found: initial_state.len(),
        });
    }

    let divergence = |t: f64, step: f64, reason: DivergenceReason| {
        IntegrationError::IntegrationDivergence {
            t,
            step,
            min_step: settings.min_step,
            reason,
        }
    };

    let mut t = grid.start();
    if initial_state.iter().any(|v| !v.is_finite()) {
        return Err(divergence(t, 0.0, DivergenceReason::NonFiniteState));
    }

    let mut stepper: Tsit5<f64> = Tsit5::new(dim);
    let exponent = 1.0 / (stepper.error_order() as f64 + 1.0);
    let factor_for = |err: f64| {
        if err == 0.0 {
            settings.max_factor
        } else {
            (settings.safety * err.powf(-exponent)).clamp(settings.min_factor, settings.max_factor)
        }
    };
    let cap = |step: f64| match settings.max_step {
        Some(max_step) => step.min(max_step),
        None => step,
    };

    let mut stats = IntegrationStats::default();
    let span = grid.end() - t;
    let mut dt = match settings.initial_step {
        Some(step) => step.min(span),
        None => {
            stats.evaluations += 1;
            starting_step(system, t, initial_state, span, settings)
        }
    };
    dt = cap(dt);

    let mut state = initial_state.to_vec();
    let mut next = vec![0.0; dim];
    let mut error = vec![0.0; dim];
    let mut values = Vec::with_capacity(dim * grid.len());
    values.extend_from_slice(initial_state);

    for &target in &grid.points()[1..] {
        while t < target {
            let remaining = target - t;
            let clipped = remaining <= dt;
            let h = if clipped { remaining } else { dt };

            stepper.attempt(system, t, &state, h, &mut next, &mut error);
            let err = error_norm(&state, &next, &error, settings);

            // NaN compares false and is handled as a rejection.
            if err <= 1.0 {
                if next.iter().any(|v| !v.is_finite()) {
                    return Err(divergence(t, h, DivergenceReason::NonFiniteState));
                }
                state.copy_from_slice(&next);
                t = if clipped { target } else { t + h };
                stats.accepted_steps += 1;
                let proposal = h * factor_for(err);
                dt = if clipped { dt.max(proposal) } else { proposal };
            } else {
                stats.rejected_steps += 1;
                let factor = if err.is_finite() {
                    factor_for(err).min(1.0)
                } else {
                    settings.min_factor
                };
                dt = h * factor;
            }
            dt = cap(dt);

            if dt < settings.min_step {
                return Err(divergence(t, dt, DivergenceReason::StepCollapsed));
            }
            if stats.accepted_steps + stats.rejected_steps >= settings.max_steps
                && t < grid.end()
            {
                return Err(divergence(t, dt, DivergenceReason::StepBudgetExhausted));
            }
        }
        values.extend_from_slice(&state);
    }

    stats.evaluations += stepper.evaluations();
    debug!(
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        evaluations = stats.evaluations,
        samples = grid.len(),
        "integration finished"
    );

    Ok(Solution {
        grid: grid.clone(),
        trajectory: Trajectory {
            dimension: dim,
            values,
        },
        stats,
    })
}

/// Root-mean-square of the error scaled by atol + rtol·max(|y_old|, |y_new|).
fn error_norm(state: &[f64], next: &[f64], error: &[f64], settings: &IntegratorSettings) -> f64 {
    let sum: f64 = state
        .iter()
        .zip(next)
        .zip(error)
        .map(|((old, new), err)| {
            let scale = settings.atol + settings.rtol * old.abs().max(new.abs());
            (err / scale).powi(2)
        })
        .sum();
    (sum / state.len() as f64).sqrt()
}

/// First trial step from the ratio of state to derivative magnitude (Hairer, Nørsett, Wanner).
fn starting_step<S: DynamicalSystem<f64>>(
    system: &S,
    t: f64,
    state: &[f64],
    span: f64,
    settings: &IntegratorSettings,
) -> f64 {
    let mut rate = vec![0.0; state.len()];
    system.apply(t, state, &mut rate);

    let scaled_norm = |values: &[f64]| {
        let sum: f64 = values
            .iter()
            .zip(state)
            .map(|(v, y)| (v / (settings.atol + settings.rtol * y.abs())).powi(2))
            .sum();
        (sum / state.len() as f64).sqrt()
    };
    let d0 = scaled_norm(state);
    let d1 = scaled_norm(&rate);

    let h0 = if d0 < 1e-5 || d1 < 1e-5 || !d1.is_finite() {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    h0.min(span).max(settings.min_step)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay {
        rate: f64,
    }

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * x[0];
        }
    }

    /// dx/dt = x², which blows up at t = 1/x0.
    struct BlowUp;

    impl DynamicalSystem<f64> for BlowUp {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = x[0] * x[0];
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, IntegrationError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn linspace_includes_both_endpoints() {
        let grid = TimeGrid::linspace(0.0, 10.0, 50).expect("valid grid");
        assert_eq!(grid.len(), 50);
        assert_eq!(grid.start(), 0.0);
        assert_eq!(grid.end(), 10.0);
        let spacing = 10.0 / 49.0;
        for pair in grid.points().windows(2) {
            assert!((pair[1] - pair[0] - spacing).abs() < 1e-12);
        }
    }

    #[test]
    fn linspace_rejects_invalid_spans() {
        assert!(matches!(
            TimeGrid::linspace(0.0, 0.0, 10),
            Err(IntegrationError::InvalidTimeSpan { .. })
        ));
        assert!(matches!(
            TimeGrid::linspace(5.0, 1.0, 10),
            Err(IntegrationError::InvalidTimeSpan { .. })
        ));
        assert!(matches!(
            TimeGrid::linspace(0.0, 1.0, 1),
            Err(IntegrationError::InvalidTimeSpan { samples: 1, .. })
        ));
        assert!(matches!(
            TimeGrid::linspace(0.0, f64::NAN, 10),
            Err(IntegrationError::InvalidTimeSpan { .. })
        ));
    }

    #[test]
    fn from_points_requires_strict_increase() {
        assert!(TimeGrid::from_points(vec![0.0, 0.5, 3.0]).is_ok());
        assert!(TimeGrid::from_points(vec![0.0, 0.5, 0.5]).is_err());
        assert!(TimeGrid::from_points(vec![1.0]).is_err());
    }

    #[test]
    fn settings_validation_names_the_field() {
        let settings = IntegratorSettings {
            rtol: 0.0,
            ..IntegratorSettings::default()
        };
        assert_err_contains(settings.validate(), "rtol");

        let settings = IntegratorSettings {
            max_step: Some(1e-14),
            ..IntegratorSettings::default()
        };
        assert_err_contains(settings.validate(), "max_step");

        let settings = IntegratorSettings {
            min_factor: 1.5,
            ..IntegratorSettings::default()
        };
        assert_err_contains(settings.validate(), "min_factor");

        assert!(IntegratorSettings::default().validate().is_ok());
    }

    #[test]
    fn samples_align_with_grid_and_start_at_initial_state() {
        let grid = TimeGrid::linspace(0.0, 3.0, 7).expect("valid grid");
        let solution = integrate(
            &Decay { rate: 0.7 },
            &[2.0],
            &grid,
            &IntegratorSettings::default(),
        )
        .expect("decay integrates");

        assert_eq!(solution.trajectory.len(), grid.len());
        assert_eq!(solution.trajectory.first(), Some(&[2.0][..]));
        for (t, state) in grid.points().iter().zip(solution.trajectory.states()) {
            let exact = 2.0 * (-0.7 * t).exp();
            assert!((state[0] - exact).abs() < 1e-7, "t = {t}");
        }
        assert!(solution.stats.accepted_steps > 0);
        assert!(solution.stats.evaluations >= 7 * solution.stats.accepted_steps);
    }

    #[test]
    fn internal_steps_are_independent_of_output_resolution() {
        let settings = IntegratorSettings::default();
        let coarse = TimeGrid::linspace(0.0, 5.0, 3).expect("valid grid");
        let fine = TimeGrid::linspace(0.0, 5.0, 201).expect("valid grid");
        let a = integrate(&Decay { rate: 1.0 }, &[1.0], &coarse, &settings).expect("coarse");
        let b = integrate(&Decay { rate: 1.0 }, &[1.0], &fine, &settings).expect("fine");
        let end_a = a.trajectory.last().expect("end")[0];
        let end_b = b.trajectory.last().expect("end")[0];
        assert!((end_a - end_b).abs() < 1e-8);
        assert!((end_a - (-5.0f64).exp()).abs() < 1e-8);
    }

    #[test]
    fn blow_up_is_reported_as_divergence() {
        let grid = TimeGrid::linspace(0.0, 2.0, 5).expect("valid grid");
        let err = integrate(&BlowUp, &[1.0], &grid, &IntegratorSettings::default())
            .expect_err("finite-time blow-up must fail");
        match err {
            IntegrationError::IntegrationDivergence { t, .. } => assert!(t < 1.0 + 1e-6),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exhausted_step_budget_is_divergence() {
        let grid = TimeGrid::linspace(0.0, 100.0, 2).expect("valid grid");
        let settings = IntegratorSettings {
            max_steps: 3,
            max_step: Some(0.1),
            ..IntegratorSettings::default()
        };
        let err = integrate(&Decay { rate: 1.0 }, &[1.0], &grid, &settings)
            .expect_err("budget too small");
        assert!(matches!(
            err,
            IntegrationError::IntegrationDivergence {
                reason: DivergenceReason::StepBudgetExhausted,
                ..
            }
        ));
    }

    #[test]
    fn rejects_mismatched_or_non_finite_state() {
        let grid = TimeGrid::linspace(0.0, 1.0, 2).expect("valid grid");
        let settings = IntegratorSettings::default();
        assert_err_contains(
            integrate(&Decay { rate: 1.0 }, &[1.0, 2.0], &grid, &settings),
            "dimension mismatch",
        );
        assert_err_contains(
            integrate(&Decay { rate: 1.0 }, &[f64::NAN], &grid, &settings),
            "non-finite",
        );
    }

    #[test]
    fn summary_counts_turning_points() {
        let trajectory = Trajectory {
            dimension: 2,
            values: vec![0.0, 5.0, 1.0, 4.0, 0.5, 3.0, 2.0, 4.0, 1.0, 5.0],
        };
        let prey = trajectory.summary(0);
        assert_eq!((prey.min, prey.max), (0.0, 2.0));
        assert_eq!((prey.local_maxima, prey.local_minima), (2, 1));
        let predator = trajectory.summary(1);
        assert_eq!((predator.local_maxima, predator.local_minima), (0, 1));
    }
}
