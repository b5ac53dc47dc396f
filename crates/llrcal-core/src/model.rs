//! Analytic FFT length model.
//!
//! LLR's safe maximum exponent for a transform of length `fftlen` shrinks as
//! the multiplier `k` grows: every element of the transform carries an extra
//! `log2(k)` bits of the product. The model keeps the table in "Mersenne"
//! units (the safe exponent for `k = 1`) and converts between those and the
//! exponent for a specific `k`:
//!
//! $$\text{adjust}(L) = \log_2 k + \log_2 k \cdot L / 2$$
//! $$n_{max}(L, m) = m - \text{adjust}(L)$$
//!
//! Once `k` reaches $2^{20}$ LLR switches to zero-padded transforms, for which
//! $n_{max}(L, m) = (m + 0.3 L) / 2$ applies instead.

use crate::config::model::{ZERO_PADDED_SLACK, ZERO_PADDING_K};
use crate::error::ModelError;

/// Length model for a fixed multiplier `k`.
///
/// A different `k` needs a different model; the `log2(k)` term is computed
/// once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthModel {
    k: u64,
    log2k: f64,
}

impl LengthModel {
    /// Creates the model for multiplier `k`.
    ///
    /// # Errors
    /// * `ModelError::ZeroMultiplier` if `k == 0`.
    pub fn new(k: u64) -> Result<Self, ModelError> {
        if k == 0 {
            return Err(ModelError::ZeroMultiplier);
        }
        Ok(Self {
            k,
            log2k: (k as f64).log2(),
        })
    }

    /// The multiplier this model was built for.
    #[inline]
    pub fn k(&self) -> u64 {
        self.k
    }

    /// Correction term in bits for a transform of length `fftlen`.
    #[inline]
    pub fn adjust(&self, fftlen: u64) -> f64 {
        self.log2k + self.log2k * (fftlen as f64 / 2.0)
    }

    /// Maximum safe exponent for a plain transform of length `fftlen`.
    #[inline]
    pub fn n_max(&self, fftlen: u64, mersenne: f64) -> f64 {
        mersenne - self.adjust(fftlen)
    }

    /// Maximum safe exponent for a zero-padded transform of length `fftlen`.
    ///
    /// Independent of `k`; the caller decides whether zero padding applies.
    #[inline]
    pub fn n_max_zero_padded(&self, fftlen: u64, mersenne: f64) -> f64 {
        (mersenne + ZERO_PADDED_SLACK * fftlen as f64) / 2.0
    }

    /// Inverse of [`n_max`](Self::n_max): the Mersenne reference for an
    /// observed maximum exponent.
    #[inline]
    pub fn mersenne(&self, fftlen: u64, n_max: f64) -> f64 {
        n_max + self.adjust(fftlen)
    }

    /// Whether LLR uses zero-padded transforms for this `k`.
    #[inline]
    pub fn uses_zero_padding(&self) -> bool {
        self.k >= ZERO_PADDING_K
    }

    /// Maximum safe exponent using whichever formula LLR applies for this `k`.
    pub fn adjusted_n_max(&self, fftlen: u64, mersenne: f64) -> f64 {
        if self.uses_zero_padding() {
            self.n_max_zero_padded(fftlen, mersenne)
        } else {
            self.n_max(fftlen, mersenne)
        }
    }
}
