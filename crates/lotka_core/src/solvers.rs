use crate::traits::{lift, DynamicalSystem, EmbeddedStepper, Scalar};

const STAGES: usize = 7;

// Tsitouras 5(4) tableau. Row 6 holds the propagated weights b, so the last
// stage is evaluated at the new state (first-same-as-last).
const C: [f64; STAGES] = [0.0, 0.161, 0.327, 0.9, 0.9800255409045097, 1.0, 1.0];

const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.161, 0.0, 0.0, 0.0, 0.0, 0.0],
    [-0.008480655492356989, 0.335480655492357, 0.0, 0.0, 0.0, 0.0],
    [2.897153057105493, -6.359448489975075, 4.3622954328695815, 0.0, 0.0, 0.0],
    [
        5.325864828439257,
        -11.748883564062828,
        7.4955393428898365,
        -0.09249506636175525,
        0.0,
        0.0,
    ],
    [
        5.86145544294642,
        -12.92096931784711,
        8.159367898576159,
        -0.071584973281401,
        -0.028269050394068383,
        0.0,
    ],
    [
        0.09646076681806523,
        0.01,
        0.4798896504144996,
        1.379008574103742,
        -3.290069515436081,
        2.324710524099774,
    ],
];

// Difference between the 5th and 4th order weights.
const BTILDE: [f64; STAGES] = [
    -0.00178001105222577714,
    -0.0008164344596567469,
    0.007880878010261995,
    -0.1447110071732629,
    0.5823571654525552,
    -0.45808210592918697,
    0.015151515151515152,
];

/// Tsitouras 5/4 Solver
///
/// Propagates the 5th order solution and estimates the local error from the
/// embedded 4th order solution.
pub struct Tsit5<T: Scalar> {
    k: [Vec<T>; STAGES],
    tmp: Vec<T>,
    a: [[T; STAGES - 1]; STAGES],
    c: [T; STAGES],
    btilde: [T; STAGES],
    evaluations: usize,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k: std::array::from_fn(|_| vec![z; dim]),
            tmp: vec![z; dim],
            a: A.map(|row| row.map(lift)),
            c: C.map(lift),
            btilde: BTILDE.map(lift),
            evaluations: 0,
        }
    }
}

impl<T: Scalar> EmbeddedStepper<T> for Tsit5<T> {
    fn error_order(&self) -> u32 {
        4
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn attempt(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        next: &mut [T],
        error: &mut [T],
    ) {
        let dim = state.len();

        // k1 = f(t, y)
        system.apply(t, state, &mut self.k[0]);

        for stage in 1..STAGES {
            for i in 0..dim {
                let mut sum = T::zero();
                for j in 0..stage {
                    sum = sum + self.a[stage][j] * self.k[j][i];
                }
                self.tmp[i] = state[i] + dt * sum;
            }
            if stage == STAGES - 1 {
                next.copy_from_slice(&self.tmp);
            }
            system.apply(t + self.c[stage] * dt, &self.tmp, &mut self.k[stage]);
        }
        self.evaluations += STAGES;

        for i in 0..dim {
            let mut sum = T::zero();
            for stage in 0..STAGES {
                sum = sum + self.btilde[stage] * self.k[stage][i];
            }
            error[i] = dt * sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Tsit5, A, C};
    use crate::traits::{DynamicalSystem, EmbeddedStepper};

    struct Decay;

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -x[0];
        }
    }

    struct Clock;

    impl DynamicalSystem<f64> for Clock {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, t: f64, _x: &[f64], out: &mut [f64]) {
            out[0] = 4.0 * t * t * t;
        }
    }

    #[test]
    fn single_step_matches_exponential_decay() {
        let mut stepper = Tsit5::new(1);
        let mut next = [0.0];
        let mut error = [0.0];
        stepper.attempt(&Decay, 0.0, &[1.0], 0.1, &mut next, &mut error);
        assert!((next[0] - (-0.1f64).exp()).abs() < 1e-8);
        assert!(error[0].abs() < 1e-5);
        assert_eq!(stepper.evaluations(), 7);
    }

    #[test]
    fn stage_weights_sum_to_nodes() {
        for (row, node) in A.iter().zip(C) {
            let sum: f64 = row.iter().sum();
            assert!((sum - node).abs() < 1e-14, "row sums to {sum}, node is {node}");
        }
    }

    #[test]
    fn state_dependent_step_is_fifth_order() {
        let local_error = |dt: f64| {
            let mut stepper = Tsit5::new(1);
            let mut next = [0.0];
            let mut error = [0.0];
            stepper.attempt(&Decay, 0.0, &[1.0], dt, &mut next, &mut error);
            (next[0] - (-dt).exp()).abs()
        };
        let fine = local_error(0.1);
        let coarse = local_error(0.2);
        assert!(fine < 1e-9, "local error {fine}");
        // Halving the step divides an O(h^6) local error by about 64.
        assert!(coarse / fine > 32.0, "ratio {}", coarse / fine);
    }

    #[test]
    fn quartic_time_dependence_is_integrated_exactly() {
        // x(t) = t^4 lies within the reach of a 5th order quadrature.
        let mut stepper = Tsit5::new(1);
        let mut next = [0.0];
        let mut error = [0.0];
        stepper.attempt(&Clock, 1.0, &[1.0], 0.5, &mut next, &mut error);
        assert!((next[0] - 1.5f64.powi(4)).abs() < 1e-10);
    }

    #[test]
    fn error_estimate_shrinks_with_step_size() {
        let mut stepper = Tsit5::new(1);
        let mut next = [0.0];
        let mut coarse = [0.0];
        let mut fine = [0.0];
        stepper.attempt(&Decay, 0.0, &[1.0], 0.4, &mut next, &mut coarse);
        stepper.attempt(&Decay, 0.0, &[1.0], 0.1, &mut next, &mut fine);
        assert!(fine[0].abs() < coarse[0].abs());
    }
}
