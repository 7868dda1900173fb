//! The forced, damped Duffing oscillator
//!
//! x'' + δ x' + α x + β x³ = γ cos(ω t)
//!
//! written as the first-order system (x, v)' = (v, −δ v − α x − β x³ + γ cos(ω t)).

use crate::state::State;
use crate::traits::{DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuffingParams {
    /// δ
    pub damping: f64,
    /// α
    pub linear_stiffness: f64,
    /// β
    pub cubic_stiffness: f64,
    /// γ
    pub forcing_amplitude: f64,
    /// ω
    pub forcing_frequency: f64,
}

impl Default for DuffingParams {
    fn default() -> Self {
        Self {
            damping: 0.00001,
            linear_stiffness: 0.5,
            cubic_stiffness: 0.0625,
            forcing_amplitude: 5.0,
            forcing_frequency: 2.0,
        }
    }
}

impl DuffingParams {
    /// The same oscillator with damping and forcing removed.
    pub fn conservative(&self) -> Self {
        Self {
            damping: 0.0,
            forcing_amplitude: 0.0,
            ..*self
        }
    }

    /// E = v²/2 + α x²/2 + β x⁴/4. Conserved when δ = γ = 0.
    pub fn energy(&self, state: &State<f64>) -> f64 {
        let x = state.position;
        let v = state.velocity;
        0.5 * v * v + 0.5 * self.linear_stiffness * x * x + 0.25 * self.cubic_stiffness * x.powi(4)
    }
}

/// Evaluates the Duffing vector field at `state` and time `t`.
pub fn duffing_field<T: Scalar>(params: &DuffingParams, t: T, state: &State<T>) -> State<T> {
    let delta = T::coefficient(params.damping);
    let alpha = T::coefficient(params.linear_stiffness);
    let beta = T::coefficient(params.cubic_stiffness);
    let gamma = T::coefficient(params.forcing_amplitude);
    let omega = T::coefficient(params.forcing_frequency);

    let x = state.position;
    let v = state.velocity;
    State::new(
        v,
        -delta * v - alpha * x - beta * x * x * x + gamma * (omega * t).cos(),
    )
}

impl<T: Scalar> DynamicalSystem<T> for DuffingParams {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        let derivative = duffing_field(self, t, &State::new(x[0], x[1]));
        out[0] = derivative.position;
        out[1] = derivative.velocity;
    }
}
