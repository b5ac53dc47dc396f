//! Error types for calibration runs.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read a compact FFT length such as `4K` or `2M`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FftLenError {
    #[error("empty FFT length")]
    Empty,

    #[error("invalid FFT length '{0}'")]
    Invalid(String),

    #[error("FFT length '{0}' does not fit in 64 bits")]
    Overflow(String),

    #[error("FFT length must be positive")]
    Zero,
}

/// Invalid length model parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("multiplier k must be at least 1")]
    ZeroMultiplier,
}

/// Failure to run the external tool at all.
///
/// Timeouts and unrecognised output are not errors; they surface as an
/// unknown FFT length instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create scratch directory: {0}")]
    Workdir(#[source] std::io::Error),

    #[error("io error while probing: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a calibration run.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("probe at minimum exponent n={0} did not report an FFT length")]
    UnresolvedStart(u64),

    #[error("exponent cursor passed n={n} without leaving FFT length {fftlen}")]
    GrowthExhausted { n: u64, fftlen: u64 },

    #[error("failed to write calibration output: {0}")]
    Output(#[from] std::io::Error),
}

/// Failure to read a calibration table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("line {line}: expected '<fftlen> <mersenne_n>', found '{text}'")]
    Malformed { line: usize, text: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
