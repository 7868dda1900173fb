//! Whitespace-separated `.dat` output, one line per step, plus a TOML summary.
//!
//! Trajectory lines hold `x0 v0 x1 v1 ...` for every particle; divergence
//! lines hold `mean_x mean_v local_max_x local_max_v`. Floats use the shortest
//! representation that parses back to the same value.

use crate::config::OutputConfig;
use anyhow::{Context, Result};
use duffing_core::{RunSink, RunSummary, Scheme, State, StepDivergence};
use std::fs::{self, File};
use std::io::{BufWriter, Write};

struct Channel<W: Write> {
    label: String,
    writer: W,
}

impl<W: Write> Channel<W> {
    fn new(label: impl Into<String>, writer: W) -> Self {
        Self {
            label: label.into(),
            writer,
        }
    }

    fn write_line(&mut self, values: impl IntoIterator<Item = f64>) -> Result<()> {
        let mut line = String::new();
        for value in values {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&format!("{value:e}"));
        }
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .with_context(|| format!("Failed to write {}", self.label))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.label))
    }
}

pub struct DatFileSink<W: Write> {
    low: Option<Channel<W>>,
    high: Option<Channel<W>>,
    divergence: Channel<W>,
    summary: Channel<W>,
}

impl DatFileSink<BufWriter<File>> {
    /// Creates the output directory and truncates every output file.
    pub fn create(output: &OutputConfig) -> Result<Self> {
        fs::create_dir_all(&output.directory).with_context(|| {
            format!(
                "Failed to create output directory {}",
                output.directory.display()
            )
        })?;

        let open = |path: std::path::PathBuf| -> Result<Channel<BufWriter<File>>> {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Channel::new(path.display().to_string(), BufWriter::new(file)))
        };

        let (low, high) = if output.write_trajectories {
            (Some(open(output.low_path())?), Some(open(output.high_path())?))
        } else {
            (None, None)
        };
        Ok(Self {
            low,
            high,
            divergence: open(output.divergence_path())?,
            summary: open(output.summary_path())?,
        })
    }
}

#[cfg(test)]
impl<W: Write> DatFileSink<W> {
    /// Pass `None` for the trajectory writers to skip the per-step dumps.
    pub fn from_writers(low: Option<W>, high: Option<W>, divergence: W, summary: W) -> Self {
        Self {
            low: low.map(|w| Channel::new("low-order trajectories", w)),
            high: high.map(|w| Channel::new("high-order trajectories", w)),
            divergence: Channel::new("divergence", divergence),
            summary: Channel::new("summary", summary),
        }
    }

    pub fn into_writers(self) -> (Option<W>, Option<W>, W, W) {
        (
            self.low.map(|c| c.writer),
            self.high.map(|c| c.writer),
            self.divergence.writer,
            self.summary.writer,
        )
    }
}

impl<W: Write> RunSink for DatFileSink<W> {
    fn trajectories(&mut self, _step: usize, scheme: Scheme, states: &[State<f64>]) -> Result<()> {
        let channel = match scheme {
            Scheme::Low => self.low.as_mut(),
            Scheme::High => self.high.as_mut(),
        };
        match channel {
            Some(channel) => channel.write_line(states.iter().flat_map(|s| s.to_array())),
            None => Ok(()),
        }
    }

    fn divergence(&mut self, _step: usize, _t: f64, divergence: &StepDivergence) -> Result<()> {
        self.divergence.write_line([
            divergence.mean.position,
            divergence.mean.velocity,
            divergence.local_max.position,
            divergence.local_max.velocity,
        ])
    }

    fn summary(&mut self, summary: &RunSummary) -> Result<()> {
        let text = toml::to_string_pretty(summary).context("Failed to encode run summary")?;
        self.summary
            .writer
            .write_all(text.as_bytes())
            .with_context(|| format!("Failed to write {}", self.summary.label))?;

        for channel in [self.low.as_mut(), self.high.as_mut()]
            .into_iter()
            .flatten()
        {
            channel.flush()?;
        }
        self.divergence.flush()?;
        self.summary.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::DatFileSink;
    use duffing_core::{
        run_comparison, ButcherTableau, DuffingParams, RunSettings, RunSink, RunSummary, Scheme,
        State, StepDivergence,
    };
    use std::io::{self, Write};

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    fn memory_sink(trajectories: bool) -> DatFileSink<Vec<u8>> {
        if trajectories {
            DatFileSink::from_writers(Some(Vec::new()), Some(Vec::new()), Vec::new(), Vec::new())
        } else {
            DatFileSink::from_writers(None, None, Vec::new(), Vec::new())
        }
    }

    #[test]
    fn trajectory_lines_interleave_position_and_velocity() {
        let mut sink = memory_sink(true);
        let states = [State::new(1.5, -2.0), State::new(0.0, 0.25)];
        sink.trajectories(0, Scheme::Low, &states).unwrap();
        sink.trajectories(0, Scheme::High, &states[..1]).unwrap();

        let (low, high, _, _) = sink.into_writers();
        assert_eq!(text(low.unwrap()), "1.5e0 -2e0 0e0 2.5e-1\n");
        assert_eq!(text(high.unwrap()), "1.5e0 -2e0\n");
    }

    #[test]
    fn divergence_line_has_mean_then_local_max() {
        let mut sink = memory_sink(false);
        let divergence = StepDivergence {
            mean: State::new(0.5, 0.125),
            local_max: State::new(1.0, 3.0),
        };
        sink.divergence(0, 0.0, &divergence).unwrap();
        let (_, _, diff, _) = sink.into_writers();
        assert_eq!(text(diff), "5e-1 1.25e-1 1e0 3e0\n");
    }

    #[test]
    fn values_parse_back_exactly() {
        let mut sink = memory_sink(true);
        let value = 0.1 + 0.2;
        sink.trajectories(0, Scheme::Low, &[State::new(value, -1e-300)])
            .unwrap();
        let (low, _, _, _) = sink.into_writers();
        let line = text(low.unwrap());
        let parsed: Vec<f64> = line
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(parsed, vec![value, -1e-300]);
    }

    #[test]
    fn skipped_trajectories_still_record_divergence_and_summary() {
        let mut sink = memory_sink(false);
        let summary = run_comparison(
            &DuffingParams::default(),
            &ButcherTableau::rk4(),
            &ButcherTableau::dormand_prince_87(),
            &[State::new(1.0, 1.0), State::new(-1.0, 2.0)],
            &RunSettings {
                dt: 0.1,
                duration: 1.0,
                parallel: false,
            },
            &mut sink,
        )
        .unwrap();

        let (low, high, diff, summary_text) = sink.into_writers();
        assert!(low.is_none() && high.is_none());
        let diff = text(diff);
        assert_eq!(diff.lines().count(), 10);
        assert!(diff.lines().all(|line| line.split(' ').count() == 4));
        assert!(diff.starts_with("0e0 0e0 0e0 0e0\n"));

        let parsed: RunSummary = toml::from_str(&text(summary_text)).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn full_run_writes_one_line_per_step() {
        let mut sink = memory_sink(true);
        run_comparison(
            &DuffingParams::default(),
            &ButcherTableau::rk4(),
            &ButcherTableau::rk4(),
            &[State::new(1.0, 1.0), State::new(-1.0, 2.0), State::new(3.0, 0.0)],
            &RunSettings {
                dt: 0.05,
                duration: 1.0,
                parallel: false,
            },
            &mut sink,
        )
        .unwrap();

        let (low, high, _, _) = sink.into_writers();
        let (low, high) = (text(low.unwrap()), text(high.unwrap()));
        assert_eq!(low.lines().count(), 20);
        assert!(low.lines().all(|line| line.split(' ').count() == 6));
        assert_eq!(low, high);
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "device unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_name_the_channel() {
        let mut sink = DatFileSink::from_writers(None, None, BrokenWriter, BrokenWriter);
        let divergence = StepDivergence {
            mean: State::new(0.0, 0.0),
            local_max: State::new(0.0, 0.0),
        };
        let err = sink.divergence(0, 0.0, &divergence).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Failed to write divergence"), "{message}");
        assert!(message.contains("device unplugged"), "{message}");
    }
}
