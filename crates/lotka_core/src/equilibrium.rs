use crate::{
    autodiff::{jacobian, Dual},
    lotka_volterra::{coexistence_equilibrium, LotkaVolterra, RateParameters},
    traits::DynamicalSystem,
};
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Linear stability class of a planar fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquilibriumKind {
    Center,
    Saddle,
    StableNode,
    UnstableNode,
    StableFocus,
    UnstableFocus,
    /// At least one eigenvalue is (numerically) zero.
    Degenerate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquilibriumReport {
    pub state: Vec<f64>,
    pub residual_norm: f64,
    /// Row-major Jacobian at `state`.
    pub jacobian: Vec<f64>,
    pub eigenvalues: Vec<Complex<f64>>,
    pub kind: EquilibriumKind,
    /// 2π/|Im λ| for centers and foci.
    pub linear_period: Option<f64>,
}

pub fn analyze_equilibrium<S>(system: &S, state: &[f64], tolerance: f64) -> Result<EquilibriumReport>
where
    S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
{
    let dim = DynamicalSystem::<f64>::dimension(system);
    if dim == 0 {
        bail!("System has zero dimension.");
    }
    if state.len() != dim {
        bail!(
            "Equilibrium dimension mismatch. Expected {}, got {}.",
            dim,
            state.len()
        );
    }
    if tolerance <= 0.0 {
        bail!("tolerance must be positive.");
    }

    let mut residual = vec![0.0; dim];
    DynamicalSystem::<f64>::apply(system, 0.0, state, &mut residual);
    let residual_norm = residual.iter().map(|v| v * v).sum::<f64>().sqrt();
    if !(residual_norm <= tolerance) {
        bail!(
            "State {:?} is not an equilibrium (‖f(x)‖ = {} exceeds {}).",
            state,
            residual_norm,
            tolerance
        );
    }

    let jacobian = jacobian(system, 0.0, state);
    let matrix = DMatrix::from_row_slice(dim, dim, &jacobian);
    let eigenvalues: Vec<Complex<f64>> = matrix.complex_eigenvalues().iter().copied().collect();

    let scale = jacobian.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let kind = classify(&eigenvalues, 1e-9 * scale);
    let linear_period = match kind {
        EquilibriumKind::Center | EquilibriumKind::StableFocus | EquilibriumKind::UnstableFocus => {
            eigenvalues
                .iter()
                .map(|lambda| lambda.im.abs())
                .fold(None, |best: Option<f64>, im| Some(best.map_or(im, |b| b.max(im))))
                .map(|omega| 2.0 * std::f64::consts::PI / omega)
        }
        _ => None,
    };

    Ok(EquilibriumReport {
        state: state.to_vec(),
        residual_norm,
        jacobian,
        eigenvalues,
        kind,
        linear_period,
    })
}

/// Extinction point (0, 0) followed by the coexistence point when it exists.
pub fn lotka_volterra_equilibria(rates: &RateParameters) -> Result<Vec<EquilibriumReport>> {
    let system = LotkaVolterra::new(*rates);
    let mut reports = vec![analyze_equilibrium(&system, &[0.0, 0.0], 1e-12)?];
    if let Some(fixed) = coexistence_equilibrium(rates) {
        let scale = fixed.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
        reports.push(analyze_equilibrium(&system, &fixed, 1e-9 * scale * scale)?);
    }
    Ok(reports)
}

fn classify(eigenvalues: &[Complex<f64>], tol: f64) -> EquilibriumKind {
    if eigenvalues.iter().any(|lambda| lambda.norm() <= tol) {
        return EquilibriumKind::Degenerate;
    }
    let oscillatory = eigenvalues.iter().any(|lambda| lambda.im.abs() > tol);
    let all_neutral = eigenvalues.iter().all(|lambda| lambda.re.abs() <= tol);
    let all_stable = eigenvalues.iter().all(|lambda| lambda.re < -tol);
    let all_unstable = eigenvalues.iter().all(|lambda| lambda.re > tol);

    match (oscillatory, all_neutral, all_stable, all_unstable) {
        (true, true, _, _) => EquilibriumKind::Center,
        (true, _, true, _) => EquilibriumKind::StableFocus,
        (true, _, _, true) => EquilibriumKind::UnstableFocus,
        (false, _, true, _) => EquilibriumKind::StableNode,
        (false, _, _, true) => EquilibriumKind::UnstableNode,
        _ => EquilibriumKind::Saddle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn extinction_point_is_a_saddle() {
        let rates = RateParameters::new(1.0, 0.5, 0.2, 0.3);
        let reports = lotka_volterra_equilibria(&rates).expect("equilibria");
        let origin = &reports[0];
        assert_eq!(origin.state, vec![0.0, 0.0]);
        assert_eq!(origin.jacobian, vec![1.0, 0.0, 0.0, -0.3]);
        assert_eq!(origin.kind, EquilibriumKind::Saddle);
        assert!(origin.linear_period.is_none());
    }

    #[test]
    fn coexistence_point_is_a_center_with_linear_period() {
        let rates = RateParameters::new(2.0, 1.0, 0.5, 0.5);
        let reports = lotka_volterra_equilibria(&rates).expect("equilibria");
        assert_eq!(reports.len(), 2);
        let center = &reports[1];
        assert_eq!(center.state, vec![1.0, 2.0]);
        assert_eq!(center.kind, EquilibriumKind::Center);
        let period = center.linear_period.expect("center has a period");
        assert!((period - 2.0 * std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn uncoupled_rates_only_report_extinction() {
        let rates = RateParameters::new(0.5, 0.0, 0.0, 0.3);
        let reports = lotka_volterra_equilibria(&rates).expect("equilibria");
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn rejects_points_that_are_not_fixed() {
        let system = LotkaVolterra::new(RateParameters::new(1.0, 1.0, 1.0, 1.0));
        assert_err_contains(
            analyze_equilibrium(&system, &[2.0, 2.0], 1e-9),
            "not an equilibrium",
        );
        assert_err_contains(
            analyze_equilibrium(&system, &[1.0], 1e-9),
            "dimension mismatch",
        );
    }

    #[test]
    fn classify_covers_planar_cases() {
        let c = |re: f64, im: f64| Complex::new(re, im);
        assert_eq!(classify(&[c(-1.0, 0.0), c(-2.0, 0.0)], 1e-9), EquilibriumKind::StableNode);
        assert_eq!(classify(&[c(1.0, 0.0), c(2.0, 0.0)], 1e-9), EquilibriumKind::UnstableNode);
        assert_eq!(classify(&[c(-0.1, 1.0), c(-0.1, -1.0)], 1e-9), EquilibriumKind::StableFocus);
        assert_eq!(classify(&[c(0.1, 1.0), c(0.1, -1.0)], 1e-9), EquilibriumKind::UnstableFocus);
        assert_eq!(classify(&[c(0.0, 0.0), c(-1.0, 0.0)], 1e-9), EquilibriumKind::Degenerate);
    }
}
