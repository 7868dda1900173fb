//! Particle ensembles and the divergence statistics between two of them.

use crate::solvers::ExplicitRungeKutta;
use crate::state::State;
use crate::tableau::ButcherTableau;
use crate::traits::DynamicalSystem;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Every particle integrated with one scheme. The index of a state is the
/// particle's identity for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    states: Vec<State<f64>>,
}

impl Ensemble {
    pub fn new(initial: &[State<f64>]) -> Self {
        Self {
            states: initial.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[State<f64>] {
        &self.states
    }

    /// Advances every particle by one step from the common time `t`.
    pub fn advance(
        &mut self,
        tableau: &ButcherTableau,
        stepper: &mut ExplicitRungeKutta<f64>,
        system: &(impl DynamicalSystem<f64> + Sync),
        t: f64,
        dt: f64,
        parallel: bool,
    ) {
        if parallel {
            self.states.par_iter_mut().for_each_init(
                || ExplicitRungeKutta::<f64>::new(tableau, 2),
                |local, state| *state = local.advance(system, t, *state, dt),
            );
        } else {
            for state in &mut self.states {
                *state = stepper.advance(system, t, *state, dt);
            }
        }
    }

    /// Index and value of the first particle that left the finite reals.
    pub fn first_non_finite(&self) -> Option<(usize, State<f64>)> {
        self.states
            .iter()
            .enumerate()
            .find(|(_, state)| !state.is_finite())
            .map(|(index, state)| (index, *state))
    }
}

/// Divergence between the two ensembles at one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepDivergence {
    /// Mean of |x_low − x_high| and |v_low − v_high| over the ensemble.
    pub mean: State<f64>,
    /// Largest per-particle difference at this step.
    pub local_max: State<f64>,
}

/// Run-level statistics carried from one step to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DivergenceAccumulator {
    pub global_max: State<f64>,
    pub steps: usize,
}

/// Measures per-particle absolute differences between two equally sized
/// ensembles and folds them into the running accumulator.
///
/// Panics if the ensembles differ in size.
pub fn measure_divergence(
    low: &[State<f64>],
    high: &[State<f64>],
    accumulator: DivergenceAccumulator,
) -> (StepDivergence, DivergenceAccumulator) {
    assert_eq!(low.len(), high.len(), "ensemble sizes differ");

    let mut sum = State::new(0.0, 0.0);
    let mut local_max = State::new(0.0, 0.0);
    for (a, b) in low.iter().zip(high) {
        let diff = a.abs_diff(b);
        sum.position += diff.position;
        sum.velocity += diff.velocity;
        local_max = local_max.max(&diff);
    }

    let count = low.len().max(1) as f64;
    let step = StepDivergence {
        mean: State::new(sum.position / count, sum.velocity / count),
        local_max,
    };
    let next = DivergenceAccumulator {
        global_max: accumulator.global_max.max(&local_max),
        steps: accumulator.steps + 1,
    };
    (step, next)
}
