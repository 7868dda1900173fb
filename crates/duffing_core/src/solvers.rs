use crate::state::State;
use crate::tableau::ButcherTableau;
use crate::traits::{DynamicalSystem, Scalar, Steppable};

/// Fixed-step explicit Runge-Kutta solver driven by a Butcher tableau.
///
/// Coefficients are converted to `T` once; stage derivatives live in scratch
/// buffers that are reused across steps, so stepping does not allocate.
#[derive(Debug, Clone)]
pub struct ExplicitRungeKutta<T: Scalar> {
    c: Vec<T>,
    /// Row-major, `stages * stages`.
    a: Vec<T>,
    b: Vec<T>,
    stages: usize,
    k: Vec<Vec<T>>,
    tmp: Vec<T>,
}

impl<T: Scalar> ExplicitRungeKutta<T> {
    pub fn new(tableau: &ButcherTableau, dim: usize) -> Self {
        let stages = tableau.stages();
        let mut a = vec![T::zero(); stages * stages];
        for i in 0..stages {
            for j in 0..i {
                a[i * stages + j] = T::coefficient(tableau.a()[(i, j)]);
            }
        }
        Self {
            c: tableau.c().iter().map(|&v| T::coefficient(v)).collect(),
            a,
            b: tableau.b().iter().map(|&v| T::coefficient(v)).collect(),
            stages,
            k: vec![vec![T::zero(); dim]; stages],
            tmp: vec![T::zero(); dim],
        }
    }

    pub fn stages(&self) -> usize {
        self.stages
    }

    pub fn dimension(&self) -> usize {
        self.tmp.len()
    }

    /// Advances a two-dimensional state by one step starting at `t`.
    /// The caller's time is left untouched.
    pub fn advance(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: State<T>,
        dt: T,
    ) -> State<T> {
        let mut t = t;
        let mut values = state.to_array();
        self.step(system, &mut t, &mut values, dt);
        State::from_array(values)
    }
}

impl<T: Scalar> Steppable<T> for ExplicitRungeKutta<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;
        let dim = state.len();

        // k_i = f(t + c_i dt, y + dt Σ_{j<i} a_ij k_j)
        for i in 0..self.stages {
            self.tmp[..dim].copy_from_slice(state);
            for j in 0..i {
                let aij = self.a[i * self.stages + j];
                if aij == T::zero() {
                    continue;
                }
                let kj = &self.k[j];
                for n in 0..dim {
                    self.tmp[n] = self.tmp[n] + dt * aij * kj[n];
                }
            }
            system.apply(t0 + self.c[i] * dt, &self.tmp[..dim], &mut self.k[i]);
        }

        // y_next = y + dt Σ b_i k_i
        for n in 0..dim {
            let mut sum = T::zero();
            for i in 0..self.stages {
                let bi = self.b[i];
                if bi != T::zero() {
                    sum = sum + bi * self.k[i][n];
                }
            }
            state[n] = state[n] + dt * sum;
        }

        *t = t0 + dt;
    }
}
