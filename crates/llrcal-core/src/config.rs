//! Configuration constants and tuning parameters for calibration runs.
//!
//! This module centralizes the search constants, probe timings and file
//! conventions so the calibration loop, the probe and the CLI agree on them.

/// Calibration search parameters.
pub mod search {
    /// Multiplier applied to the exponent cursor on each growth step.
    ///
    /// Small enough that a growth step rarely skips more than one FFT length,
    /// large enough that the cursor crosses the whole LLR range in a few
    /// hundred probes.
    pub const GROWTH_FACTOR: f64 = 1.02;

    /// Smallest FFT length LLR selects; seeds `last_fftlen` when no minimum
    /// exponent is given.
    pub const BASELINE_FFTLEN: u64 = 32;

    /// Mersenne reference exponent used with [`BASELINE_FFTLEN`] to derive the
    /// default start cursor.
    pub const BASELINE_MERSENNE: f64 = 700.0;

    /// Default multiplier when none is given on the command line.
    pub const DEFAULT_K: u64 = 100_005;
}

/// External tool invocation parameters.
pub mod probe {
    use std::time::Duration;

    /// Per-invocation time budget. LLR prints its FFT length well before
    /// finishing any real work, so the run is cut short on purpose.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Interval between `try_wait` polls while the tool runs.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Default path of the LLR executable.
    pub const DEFAULT_PROGRAM: &str = "./llr";
}

/// Length model parameters.
pub mod model {
    /// Multiplier from which LLR switches to zero-padded transforms.
    pub const ZERO_PADDING_K: u64 = 1 << 20;

    /// Per-element slack of the zero-padded safe-maximum formula.
    pub const ZERO_PADDED_SLACK: f64 = 0.3;
}

/// Output file conventions.
pub mod files {
    /// First line of every test-case file (NewPGen-style sieve header).
    pub const TEST_INPUT_HEADER: &str = "1000000000000:M:1:2:258";

    /// Default calibration table written by `generate`.
    pub const NEW_TABLE: &str = "maxlen.new.txt";

    /// Default calibration table read by `adjust`.
    pub const TABLE: &str = "maxlen.txt";

    /// Default test-case file written by `generate`.
    pub const NEW_TEST_INPUT: &str = "testinput.new.txt";
}

/// Safety limits.
pub mod limits {
    /// Largest exponent the growth phase will probe before giving up.
    ///
    /// LLR refuses exponents beyond 2^32 anyway.
    pub const MAX_EXPONENT: u64 = u32::MAX as u64;
}
