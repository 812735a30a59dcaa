use num_traits::{FromPrimitive, Num};
use std::fmt::Debug;
use std::ops::Neg;

/// A trait for types that can be used as scalars in our dynamical systems.
/// Only field arithmetic and conversion from f64 are required, which keeps
/// Dual numbers usable without a full `Float` implementation.
pub trait Scalar: Num + Neg<Output = Self> + Copy + FromPrimitive + Debug + 'static {}

impl<T: Num + Neg<Output = T> + Copy + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` constant into the scalar type.
///
/// Every `Scalar` in this crate (`f64`, `Dual`) represents all finite `f64`
/// values, so the conversion cannot fail for coefficients and rates.
pub fn lift<T: Scalar>(value: f64) -> T {
    T::from_f64(value).expect("scalar type must represent f64 constants")
}

/// Represents a continuous-time dynamical system dx/dt = f(t, x).
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// x: current state
    /// t: current time
    /// out: buffer to write dx/dt into
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A Runge-Kutta pair that advances a system and estimates its local error.
pub trait EmbeddedStepper<T: Scalar> {
    /// Order of the embedded (lower-order) solution, used by step-size control.
    fn error_order(&self) -> u32;

    /// Number of right-hand side evaluations performed so far.
    fn evaluations(&self) -> usize;

    /// Attempts one step of size dt from (t, state).
    /// The candidate state is written to `next` and the local error estimate
    /// to `error`; `state` is left untouched so a rejected step can be retried.
    fn attempt(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        next: &mut [T],
        error: &mut [T],
    );
}
