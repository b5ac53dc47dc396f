//! # LLRCal Core
//!
//! Calibration of LLR's FFT length choice for numbers of the form $k \cdot 2^n - 1$.
//!
//! For a fixed multiplier $k$, LLR picks larger transforms as $n$ grows. This
//! crate finds the exact exponents where that choice changes by probing LLR as
//! a black box, and converts the observed limits to and from the analytic
//! model LLRTools uses to predict safe maximum exponents for any $k$.
//!
//! ## Components
//!
//! - **Length model** ([`LengthModel`]): $n_{max}$ and its inverse for a given $k$.
//! - **Probe** ([`Probe`], [`LlrProbe`]): one short LLR run per exponent.
//! - **Boundary search** ([`find_boundary`]): leftmost binary search over a probe.
//! - **Calibration** ([`Calibrator`]): geometric growth plus boundary search
//!   over the whole exponent range.
//! - **Tables** ([`TableWriter`], [`read_table`], [`render_adjusted`]).
//!
//! ## Example
//!
//! ```rust
//! use llrcal_core::{CalibrationConfig, Calibrator, Probe, ProbeError, StopAt};
//!
//! // Stand-in for LLR: 32 below n=1000, 64 up to n=4999, 128 beyond.
//! struct Stub;
//! impl Probe for Stub {
//!     fn probe(&mut self, _k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
//!         Ok(Some(if n < 1000 { 32 } else if n < 5000 { 64 } else { 128 }))
//!     }
//! }
//!
//! let config = CalibrationConfig::new(100_005, StopAt::FftLen(64));
//! let result = Calibrator::new(Stub, config)?.run(&mut ())?;
//! assert_eq!(result.records[0].max_n, 999);
//! assert_eq!(result.records[1].max_n, 4999);
//! # Ok::<(), llrcal_core::CalibrationError>(())
//! ```

pub mod calibrate;
pub mod config;
pub mod error;
pub mod fftlen;
pub mod model;
pub mod probe;
pub mod search;
pub mod table;

pub use calibrate::{
    Calibration, CalibrationConfig, CalibrationRecord, CalibrationSink, Calibrator, StopAt,
    TestCase,
};
pub use error::{CalibrationError, FftLenError, ModelError, ProbeError, TableError};
pub use fftlen::{format_fftlen, parse_fftlen, FftLen};
pub use model::LengthModel;
pub use probe::{parse_probe_output, CachingProbe, LlrProbe, Probe};
pub use search::{find_boundary, Boundary};
pub use table::{read_table, render_adjusted, TableEntry, TableWriter};
