//! Runs two ensembles side by side, one per tableau, and reports how far
//! apart their trajectories drift.

use crate::duffing::DuffingParams;
use crate::ensemble::{measure_divergence, DivergenceAccumulator, Ensemble, StepDivergence};
use crate::solvers::ExplicitRungeKutta;
use crate::state::State;
use crate::tableau::ButcherTableau;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Relative distance from an integer below which T/dt is taken to be that integer.
const STEP_COUNT_SNAP: f64 = 1e-9;

/// Upper bound on ⌊T/dt⌋ accepted by [`RunSettings::validate`].
pub const MAX_STEPS: usize = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Fixed step size.
    pub dt: f64,
    /// Total simulated time T. The run performs ⌊T/dt⌋ steps.
    pub duration: f64,
    /// Advance particles on the rayon thread pool.
    pub parallel: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dt: 0.01,
            duration: 200.0,
            parallel: false,
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            bail!("Step size dt must be positive and finite, got {}.", self.dt);
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            bail!(
                "Duration must be non-negative and finite, got {}.",
                self.duration
            );
        }
        let ratio = self.duration / self.dt;
        if !ratio.is_finite() {
            bail!(
                "Duration {} over step size {} gives an unbounded number of steps.",
                self.duration,
                self.dt
            );
        }
        if self.steps() > MAX_STEPS {
            bail!(
                "Duration {} over step size {} needs {ratio:e} steps; at most {MAX_STEPS} are allowed.",
                self.duration,
                self.dt
            );
        }
        if self.steps() == 0 {
            bail!(
                "Duration {} is shorter than one step of {}; at least one integration step is required.",
                self.duration,
                self.dt
            );
        }
        Ok(())
    }

    /// ⌊T/dt⌋, treating ratios within rounding distance of an integer as that
    /// integer so that e.g. 1.0 / 0.01 gives 100 steps.
    pub fn steps(&self) -> usize {
        let ratio = self.duration / self.dt;
        if !ratio.is_finite() || ratio <= 0.0 {
            return 0;
        }
        let nearest = ratio.round();
        if (ratio - nearest).abs() <= STEP_COUNT_SNAP * nearest.max(1.0) {
            nearest as usize
        } else {
            ratio.floor() as usize
        }
    }
}

/// Which of the two ensembles a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    Low,
    High,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Low => write!(f, "low-order"),
            Scheme::High => write!(f, "high-order"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub low_scheme: String,
    pub high_scheme: String,
    pub particles: usize,
    pub steps: usize,
    pub dt: f64,
    /// Time of the last measured step.
    pub final_time: f64,
    /// Largest |x_low − x_high| and |v_low − v_high| seen over the run.
    pub global_max: State<f64>,
}

/// Receives everything a run produces. Any error aborts the run.
pub trait RunSink {
    /// Full ensemble state of one scheme before the advance of `step`.
    fn trajectories(&mut self, step: usize, scheme: Scheme, states: &[State<f64>]) -> Result<()>;

    /// Divergence measured at `step`, time `t`.
    fn divergence(&mut self, step: usize, t: f64, divergence: &StepDivergence) -> Result<()>;

    /// Called once after the last step.
    fn summary(&mut self, summary: &RunSummary) -> Result<()>;
}

/// Keeps every record in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub low: Vec<Vec<State<f64>>>,
    pub high: Vec<Vec<State<f64>>>,
    pub divergence: Vec<(f64, StepDivergence)>,
    pub summary: Option<RunSummary>,
}

impl RunSink for MemorySink {
    fn trajectories(&mut self, _step: usize, scheme: Scheme, states: &[State<f64>]) -> Result<()> {
        match scheme {
            Scheme::Low => self.low.push(states.to_vec()),
            Scheme::High => self.high.push(states.to_vec()),
        }
        Ok(())
    }

    fn divergence(&mut self, _step: usize, t: f64, divergence: &StepDivergence) -> Result<()> {
        self.divergence.push((t, *divergence));
        Ok(())
    }

    fn summary(&mut self, summary: &RunSummary) -> Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}

/// Integrates the same initial conditions with `low` and `high` and streams
/// trajectories and divergence statistics into `sink`.
///
/// Divergence for a step is measured on the states that step emits, before
/// either ensemble is advanced. Both ensembles advance from the same `t`.
pub fn run_comparison(
    params: &DuffingParams,
    low: &ButcherTableau,
    high: &ButcherTableau,
    initial: &[State<f64>],
    settings: &RunSettings,
    sink: &mut impl RunSink,
) -> Result<RunSummary> {
    settings.validate()?;
    if initial.is_empty() {
        bail!("At least one particle is required.");
    }
    if let Some((index, state)) = initial
        .iter()
        .enumerate()
        .find(|(_, state)| !state.is_finite())
    {
        bail!("Initial condition {index} is not finite: {state:?}.");
    }

    let steps = settings.steps();
    let dt = settings.dt;
    info!(
        low = low.name(),
        high = high.name(),
        particles = initial.len(),
        steps,
        dt,
        parallel = settings.parallel,
        "starting comparison run"
    );

    let mut low_ensemble = Ensemble::new(initial);
    let mut high_ensemble = Ensemble::new(initial);
    let mut low_stepper = ExplicitRungeKutta::new(low, 2);
    let mut high_stepper = ExplicitRungeKutta::new(high, 2);
    let mut accumulator = DivergenceAccumulator::default();
    let progress_stride = (steps / 10).max(1);
    let mut t = 0.0;

    for step in 0..steps {
        let (divergence, next) =
            measure_divergence(low_ensemble.states(), high_ensemble.states(), accumulator);
        accumulator = next;

        sink.trajectories(step, Scheme::Low, low_ensemble.states())?;
        sink.trajectories(step, Scheme::High, high_ensemble.states())?;
        sink.divergence(step, t, &divergence)?;

        low_ensemble.advance(low, &mut low_stepper, params, t, dt, settings.parallel);
        high_ensemble.advance(high, &mut high_stepper, params, t, dt, settings.parallel);

        for (scheme, ensemble) in [(Scheme::Low, &low_ensemble), (Scheme::High, &high_ensemble)] {
            if let Some((particle, state)) = ensemble.first_non_finite() {
                warn!(%scheme, particle, step, t, ?state, "state left the finite reals");
                bail!(
                    "{scheme} ensemble produced a non-finite state for particle {particle} at step {step} (t = {t}): {state:?}."
                );
            }
        }

        if (step + 1) % progress_stride == 0 {
            debug!(
                step = step + 1,
                steps,
                mean_x = divergence.mean.position,
                mean_v = divergence.mean.velocity,
                "progress"
            );
        }
        t += dt;
    }

    let summary = RunSummary {
        low_scheme: low.name().to_string(),
        high_scheme: high.name().to_string(),
        particles: initial.len(),
        steps: accumulator.steps,
        dt,
        final_time: t - dt,
        global_max: accumulator.global_max,
    };
    sink.summary(&summary)?;
    info!(
        max_x = summary.global_max.position,
        max_v = summary.global_max.velocity,
        "comparison run finished"
    );
    Ok(summary)
}
