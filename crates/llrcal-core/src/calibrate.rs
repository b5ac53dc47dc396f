//! Calibration loop: walk the exponent range and record every FFT length
//! transition LLR makes for a fixed `k`.
//!
//! Each iteration grows the exponent cursor geometrically until the probed
//! FFT length changes, pins the exact transition with
//! [`find_boundary`](crate::search::find_boundary), and emits a
//! [`CalibrationRecord`] for the outgoing length plus [`TestCase`]s next to
//! the transition.

use std::io;

use crate::config::limits::MAX_EXPONENT;
use crate::config::search::{BASELINE_FFTLEN, BASELINE_MERSENNE, GROWTH_FACTOR};
use crate::error::{CalibrationError, ProbeError};
use crate::model::LengthModel;
use crate::probe::Probe;
use crate::search::find_boundary;

/// When a calibration run ends. Exactly one ceiling applies per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAt {
    /// Keep going while the exponent cursor is at most this value.
    Exponent(u64),
    /// Keep going while the current FFT length is at most this value.
    FftLen(u64),
}

impl StopAt {
    fn keep_going(self, cursor: u64, fftlen: u64) -> bool {
        match self {
            StopAt::Exponent(max) => cursor <= max,
            StopAt::FftLen(max) => fftlen <= max,
        }
    }
}

/// Parameters of one calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationConfig {
    pub k: u64,
    pub stop: StopAt,
    /// Exponent to start from. Without it the cursor starts at the model's
    /// safe maximum for the smallest FFT length.
    pub min_n: Option<u64>,
}

impl CalibrationConfig {
    pub fn new(k: u64, stop: StopAt) -> Self {
        Self {
            k,
            stop,
            min_n: None,
        }
    }

    pub fn with_min_n(mut self, n: u64) -> Self {
        self.min_n = Some(n);
        self
    }
}

/// Largest exponent observed to still use `fftlen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRecord {
    pub fftlen: u64,
    pub max_n: u64,
    /// The transition exponent (`max_n + 1`) converted to a Mersenne
    /// reference with the run's length model, truncated; this is the value
    /// written to the table.
    pub mersenne: u64,
}

/// An exponent next to a transition, for later validation with LLR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase {
    pub k: u64,
    pub n: u64,
}

/// Receives calibration output as it is produced.
pub trait CalibrationSink {
    /// Called after every probe, including those of the boundary search.
    fn on_probe(&mut self, _n: u64, _fftlen: Option<u64>) {}

    fn on_test_case(&mut self, case: &TestCase) -> io::Result<()>;

    fn on_record(&mut self, record: &CalibrationRecord) -> io::Result<()>;
}

impl CalibrationSink for () {
    fn on_test_case(&mut self, _case: &TestCase) -> io::Result<()> {
        Ok(())
    }

    fn on_record(&mut self, _record: &CalibrationRecord) -> io::Result<()> {
        Ok(())
    }
}

/// Everything a run emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calibration {
    pub records: Vec<CalibrationRecord>,
    pub test_cases: Vec<TestCase>,
    pub probes: u64,
    /// Transitions whose boundary search gave up on unresolved probes.
    pub stalls: u64,
}

/// Forwards probes to the sink and counts them.
struct Observed<'a, P: ?Sized, S: ?Sized> {
    probe: &'a mut P,
    sink: &'a mut S,
    count: u64,
}

impl<P: Probe + ?Sized, S: CalibrationSink + ?Sized> Probe for Observed<'_, P, S> {
    fn probe(&mut self, k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
        self.count += 1;
        let fftlen = self.probe.probe(k, n)?;
        self.sink.on_probe(n, fftlen);
        Ok(fftlen)
    }
}

/// Next growth step; always advances by at least one.
fn grow(n: u64) -> u64 {
    ((n as f64 * GROWTH_FACTOR) as u64).max(n.saturating_add(1))
}

/// Starting exponent and FFT length: the configured minimum as reported by
/// `probe`, or the model's estimate at the baseline length.
fn seed<Q: Probe + ?Sized>(
    probe: &mut Q,
    config: &CalibrationConfig,
    default_start: u64,
) -> Result<(u64, u64), CalibrationError> {
    match config.min_n {
        Some(n) => {
            let len = probe
                .probe(config.k, n)?
                .ok_or(CalibrationError::UnresolvedStart(n))?;
            Ok((n, len))
        }
        None => Ok((default_start, BASELINE_FFTLEN)),
    }
}

/// Drives a [`Probe`] through a full calibration run.
pub struct Calibrator<P> {
    probe: P,
    model: LengthModel,
    config: CalibrationConfig,
    start: Option<(u64, u64)>,
}

impl<P: Probe> Calibrator<P> {
    /// # Errors
    /// * `CalibrationError::Model` if `config.k == 0`.
    pub fn new(probe: P, config: CalibrationConfig) -> Result<Self, CalibrationError> {
        let model = LengthModel::new(config.k)?;
        Ok(Self {
            probe,
            model,
            config,
            start: None,
        })
    }

    pub fn model(&self) -> &LengthModel {
        &self.model
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Resolves the starting exponent and FFT length ahead of [`run`](Self::run).
    ///
    /// With a configured minimum this probes it once; the answer is kept and
    /// `run` starts from it without probing again.
    ///
    /// # Errors
    /// * `CalibrationError::UnresolvedStart` if the minimum yields no FFT length.
    pub fn resolve_start(&mut self) -> Result<(u64, u64), CalibrationError> {
        if let Some(start) = self.start {
            return Ok(start);
        }
        let default_start = self.default_start();
        let start = seed(&mut self.probe, &self.config, default_start)?;
        self.start = Some(start);
        Ok(start)
    }

    /// Exponent the growth phase starts from when no minimum is configured.
    pub fn default_start(&self) -> u64 {
        let n = self.model.n_max(BASELINE_FFTLEN, BASELINE_MERSENNE).floor();
        if n < 1.0 {
            1
        } else {
            n as u64
        }
    }

    /// Runs the calibration, streaming output to `sink`.
    ///
    /// # Errors
    /// * `CalibrationError::UnresolvedStart` if a configured minimum exponent
    ///   yields no FFT length.
    /// * `CalibrationError::GrowthExhausted` if the cursor passes
    ///   `limits::MAX_EXPONENT` without a transition (FFT length ceiling only).
    /// * Probe and sink failures.
    pub fn run<S: CalibrationSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<Calibration, CalibrationError> {
        let k = self.config.k;
        let stop = self.config.stop;
        let model = self.model;
        let default_start = self.default_start();
        let mut out = Calibration::default();
        let mut probe = Observed {
            probe: &mut self.probe,
            sink,
            count: 0,
        };

        let (mut start_n, mut last_fftlen) = match self.start {
            Some(start) => start,
            None => seed(&mut probe, &self.config, default_start)?,
        };
        log::info!(
            "calibrating k={} from n={} (FFT length {})",
            k,
            start_n,
            last_fftlen
        );

        let mut next_n = start_n;
        let mut last_good_n = start_n;
        let mut first = true;

        'calibrate: while stop.keep_going(start_n, last_fftlen) {
            let next_fftlen = loop {
                next_n = grow(next_n);
                if next_n > MAX_EXPONENT {
                    // The exponent ceiling is already covered by last_fftlen.
                    if let StopAt::Exponent(_) = stop {
                        log::warn!(
                            "no FFT length after {} up to n={}, stopping",
                            last_fftlen,
                            MAX_EXPONENT
                        );
                        break 'calibrate;
                    }
                    return Err(CalibrationError::GrowthExhausted {
                        n: next_n,
                        fftlen: last_fftlen,
                    });
                }
                match probe.probe(k, next_n)? {
                    Some(len) if len != last_fftlen => break len,
                    Some(_) => last_good_n = next_n,
                    None => {}
                }
            };

            let boundary = find_boundary(&mut probe, k, next_fftlen, last_good_n, next_n)?;
            if boundary.stalled {
                out.stalls += 1;
            }

            if first {
                let mut below = boundary.right.saturating_sub(1);
                while below > 0 && probe.probe(k, below)?.is_none() {
                    below -= 1;
                }
                if below > 0 {
                    let case = TestCase { k, n: below };
                    probe.sink.on_test_case(&case)?;
                    out.test_cases.push(case);
                }
            }
            let case = TestCase {
                k,
                n: boundary.right,
            };
            probe.sink.on_test_case(&case)?;
            out.test_cases.push(case);

            let max_n = boundary.exponent.saturating_sub(1);
            let record = CalibrationRecord {
                fftlen: last_fftlen,
                max_n,
                mersenne: model
                    .mersenne(last_fftlen, boundary.exponent as f64)
                    .floor() as u64,
            };
            probe.sink.on_record(&record)?;
            out.records.push(record);
            log::info!(
                "FFT={} done: max n={} (boundary search: {} probes{})",
                last_fftlen,
                max_n,
                boundary.probes,
                if boundary.stalled { ", stalled" } else { "" }
            );

            last_fftlen = next_fftlen;
            start_n = next_n;
            last_good_n = next_n;
            first = false;
        }

        out.probes = probe.count;
        Ok(out)
    }
}
