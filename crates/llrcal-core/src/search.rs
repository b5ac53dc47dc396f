//! Leftmost binary search for an FFT length transition.
//!
//! Given exponents `start < finish` with `probe(start) < target <= probe(finish)`,
//! [`find_boundary`] narrows `[start, finish]` to the smallest exponent whose
//! FFT length reaches `target`, relying on the FFT length being a
//! non-decreasing step function of `n`.
//!
//! # Unknown probes
//!
//! When the midpoint cannot be resolved the search walks upward one exponent
//! at a time until a probe answers. A walk that runs into `right` without an
//! answer shrinks the interval to the part below the midpoint and the search
//! goes on there. The most recent unresolved exponent is remembered across
//! iterations; if a walk lands on it again the search gives up and returns
//! the walk position as a *stalled*, best-effort boundary. The result is also
//! stalled when the interval closes on an exponent that never answered.
//! A persistently silent tool therefore costs a bounded number of probes
//! instead of hanging the run, at the price of a possibly inexact boundary.

use crate::error::ProbeError;
use crate::probe::Probe;

/// Outcome of a boundary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Smallest exponent found to use at least the target FFT length.
    pub exponent: u64,
    /// Smallest exponent seen to use at least the target FFT length.
    /// Equal to `exponent` unless the search stalled.
    pub right: u64,
    /// Whether the search gave up on an unresolved run of probes.
    pub stalled: bool,
    /// Number of probes issued.
    pub probes: u64,
}

/// Finds the smallest `n` in `[start, finish]` with `probe(k, n) >= target`.
///
/// # Arguments
/// * `probe` - Oracle for the FFT length of `k*2^n-1`.
/// * `k` - Fixed multiplier.
/// * `target` - FFT length whose first exponent is sought.
/// * `start`, `finish` - Interval known to straddle the transition.
///
/// # Errors
/// Propagates probe failures; unknown answers are not errors.
///
/// # Example
/// ```
/// use llrcal_core::{find_boundary, Probe, ProbeError};
///
/// struct Steps;
/// impl Probe for Steps {
///     fn probe(&mut self, _k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
///         Ok(Some(if n < 1000 { 32 } else { 64 }))
///     }
/// }
///
/// let boundary = find_boundary(&mut Steps, 3, 64, 400, 1200).unwrap();
/// assert_eq!(boundary.exponent, 1000);
/// ```
pub fn find_boundary<P: Probe + ?Sized>(
    probe: &mut P,
    k: u64,
    target: u64,
    start: u64,
    finish: u64,
) -> Result<Boundary, ProbeError> {
    let mut left = start;
    let mut right = finish;
    // Drops below this only when a walk ran into `right` unanswered.
    let mut resolved_right = finish;
    let mut last_unresolved: Option<u64> = None;
    let mut probes = 0u64;

    'search: while left < right {
        let pivot = left + (right - left) / 2;
        let mut mid = pivot;
        probes += 1;
        let mut fftlen = probe.probe(k, mid)?;

        let fftlen = loop {
            if let Some(len) = fftlen {
                break len;
            }
            if last_unresolved == Some(mid) {
                return Ok(stalled(target, mid, resolved_right, probes));
            }
            last_unresolved = Some(mid);
            mid += 1;
            if mid >= right {
                // Nothing in [pivot, right) answered.
                right = pivot;
                continue 'search;
            }
            probes += 1;
            fftlen = probe.probe(k, mid)?;
        };

        log::debug!("n={}, FFT={}", mid, fftlen);
        if fftlen < target {
            left = mid + 1;
        } else {
            right = mid;
            resolved_right = mid;
        }
    }

    if right < resolved_right {
        return Ok(stalled(target, left, resolved_right, probes));
    }
    Ok(Boundary {
        exponent: left,
        right,
        stalled: false,
        probes,
    })
}

fn stalled(target: u64, exponent: u64, right: u64, probes: u64) -> Boundary {
    log::warn!(
        "boundary search for FFT length {} stalled at n={} (right={})",
        target,
        exponent,
        right
    );
    Boundary {
        exponent,
        right,
        stalled: true,
        probes,
    }
}
