pub mod driver;
pub mod duffing;
pub mod ensemble;
pub mod solvers;
pub mod state;
pub mod tableau;
/// The `duffing_core` crate compares explicit Runge-Kutta methods on ensembles of
/// forced Duffing oscillators.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (vector fields), `Steppable` (solvers).
/// - **Tableau**: validated Butcher tableaus (Euler, RK4, Prince-Dormand 13-stage) and custom ones.
/// - **Solvers**: `ExplicitRungeKutta`, one stepper for any explicit tableau.
/// - **Driver**: runs two ensembles side by side and streams trajectories and divergence into a `RunSink`.
pub mod traits;

pub use driver::{run_comparison, MemorySink, RunSettings, RunSink, RunSummary, Scheme};
pub use duffing::{duffing_field, DuffingParams};
pub use ensemble::{measure_divergence, DivergenceAccumulator, Ensemble, StepDivergence};
pub use solvers::ExplicitRungeKutta;
pub use state::State;
pub use tableau::{ButcherTableau, SchemeSpec, TableauError};
