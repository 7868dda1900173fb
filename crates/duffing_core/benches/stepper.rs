//! Stepper throughput for the built-in tableaus and the full comparison loop.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use duffing_core::{
    run_comparison, ButcherTableau, DuffingParams, ExplicitRungeKutta, RunSettings, RunSink,
    RunSummary, Scheme, State, StepDivergence,
};

/// Drops every record so the benchmark measures integration only.
struct NullSink;

impl RunSink for NullSink {
    fn trajectories(
        &mut self,
        _step: usize,
        _scheme: Scheme,
        states: &[State<f64>],
    ) -> anyhow::Result<()> {
        black_box(states);
        Ok(())
    }

    fn divergence(
        &mut self,
        _step: usize,
        _t: f64,
        divergence: &StepDivergence,
    ) -> anyhow::Result<()> {
        black_box(divergence);
        Ok(())
    }

    fn summary(&mut self, _summary: &RunSummary) -> anyhow::Result<()> {
        Ok(())
    }
}

fn single_step(c: &mut Criterion) {
    let params = DuffingParams::default();
    let mut group = c.benchmark_group("single_step");
    for tableau in [
        ButcherTableau::euler(),
        ButcherTableau::rk4(),
        ButcherTableau::dormand_prince_87(),
    ] {
        let mut stepper = ExplicitRungeKutta::new(&tableau, 2);
        group.bench_with_input(
            BenchmarkId::from_parameter(tableau.name()),
            &State::new(1.0, -0.5),
            |b, state| {
                b.iter(|| stepper.advance(&params, black_box(0.3), *state, black_box(0.01)))
            },
        );
    }
    group.finish();
}

fn comparison_run(c: &mut Criterion) {
    let params = DuffingParams::default();
    let low = ButcherTableau::rk4();
    let high = ButcherTableau::dormand_prince_87();
    let mut group = c.benchmark_group("comparison_run");
    group.sample_size(10);
    for particles in [100usize, 1000] {
        let initial: Vec<State<f64>> = (0..particles)
            .map(|i| {
                let s = i as f64 / particles as f64;
                State::new(20.0 * s - 10.0, 10.0 - 20.0 * s)
            })
            .collect();
        for parallel in [false, true] {
            let settings = RunSettings {
                dt: 0.01,
                duration: 1.0,
                parallel,
            };
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, particles), &initial, |b, initial| {
                b.iter(|| run_comparison(&params, &low, &high, initial, &settings, &mut NullSink))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, single_step, comparison_run);
criterion_main!(benches);
