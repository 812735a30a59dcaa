use crate::traits::DynamicalSystem;
use num_traits::{FromPrimitive, Num, One, Zero};
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

/// Dual number for forward-mode differentiation.
/// val: real part
/// eps: infinitesimal part (the directional derivative)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Dual {
    pub val: f64,
    pub eps: f64,
}

impl Dual {
    pub fn new(val: f64, eps: f64) -> Self {
        Self { val, eps }
    }

    /// A constant: zero derivative.
    pub fn constant(val: f64) -> Self {
        Self::new(val, 0.0)
    }
}

impl Zero for Dual {
    fn zero() -> Self {
        Self::constant(0.0)
    }
    fn is_zero(&self) -> bool {
        self.val == 0.0 && self.eps == 0.0
    }
}

impl One for Dual {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl Add for Dual {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.val + rhs.val, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.val - rhs.val, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.val * rhs.val, self.val * rhs.eps + self.eps * rhs.val)
    }
}

impl Div for Dual {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Self::new(
            self.val / rhs.val,
            (self.eps * rhs.val - self.val * rhs.eps) / (rhs.val * rhs.val),
        )
    }
}

impl Rem for Dual {
    type Output = Self;
    fn rem(self, rhs: Self) -> Self {
        // Piecewise identity away from the jumps.
        Self::new(self.val % rhs.val, self.eps)
    }
}

impl Neg for Dual {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.val, -self.eps)
    }
}

impl Num for Dual {
    type FromStrRadixErr = <f64 as Num>::FromStrRadixErr;
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        f64::from_str_radix(str, radix).map(Self::constant)
    }
}

impl FromPrimitive for Dual {
    fn from_i64(n: i64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_u64(n: u64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_f64(n: f64) -> Option<Self> {
        Some(Self::constant(n))
    }
}

/// Jacobian of `system` at (t, state), row-major, one Dual sweep per column.
pub fn jacobian<S: DynamicalSystem<Dual>>(system: &S, t: f64, state: &[f64]) -> Vec<f64> {
    let n = state.len();
    let mut jacobian = vec![0.0; n * n];
    let mut dual_x = vec![Dual::zero(); n];
    let mut dual_out = vec![Dual::zero(); n];
    let t_dual = Dual::constant(t);

    for j in 0..n {
        for i in 0..n {
            dual_x[i] = Dual::new(state[i], if i == j { 1.0 } else { 0.0 });
        }
        system.apply(t_dual, &dual_x, &mut dual_out);
        for i in 0..n {
            jacobian[i * n + j] = dual_out[i].eps;
        }
    }

    jacobian
}

#[cfg(test)]
mod tests {
    use super::{jacobian, Dual};
    use crate::traits::DynamicalSystem;

    #[test]
    fn product_and_quotient_rules() {
        let x = Dual::new(3.0, 1.0);
        let y = Dual::constant(2.0);
        let product = x * x * y;
        assert_eq!(product.val, 18.0);
        assert_eq!(product.eps, 12.0);

        let quotient = y / x;
        assert!((quotient.val - 2.0 / 3.0).abs() < 1e-15);
        assert!((quotient.eps + 2.0 / 9.0).abs() < 1e-15);
    }

    struct Quadratic;

    impl DynamicalSystem<Dual> for Quadratic {
        fn dimension(&self) -> usize {
            2
        }

        fn apply(&self, _t: Dual, x: &[Dual], out: &mut [Dual]) {
            out[0] = -x[1] * x[1];
            out[1] = x[0] * x[1];
        }
    }

    #[test]
    fn jacobian_is_row_major() {
        let j = jacobian(&Quadratic, 0.0, &[2.0, 3.0]);
        // d(-y^2)/dx = 0, d(-y^2)/dy = -2y, d(xy)/dx = y, d(xy)/dy = x
        assert_eq!(j, vec![0.0, -6.0, 3.0, 2.0]);
    }
}
