//! Compact FFT length notation.
//!
//! LLR reports transform sizes as `FFT length 120K` or `FFT length 2M`;
//! `k`/`K` multiplies by 1024 and `m`/`M` by 1,048,576.

use std::fmt;
use std::str::FromStr;

use crate::error::FftLenError;

const KILO: u64 = 1 << 10;
const MEGA: u64 = 1 << 20;

/// Parses a compact FFT length (`4096`, `4K`, `2m`, ...) into an exact count.
///
/// # Errors
/// * `FftLenError::Empty` for an empty string.
/// * `FftLenError::Invalid` if anything but ASCII digits precedes the suffix.
/// * `FftLenError::Overflow` if the value does not fit in a `u64`.
pub fn parse_fftlen(text: &str) -> Result<u64, FftLenError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(FftLenError::Empty);
    }

    let (digits, scale) = match text.as_bytes()[text.len() - 1] {
        b'k' | b'K' => (&text[..text.len() - 1], KILO),
        b'm' | b'M' => (&text[..text.len() - 1], MEGA),
        _ => (text, 1),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FftLenError::Invalid(text.to_string()));
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(scale))
        .ok_or_else(|| FftLenError::Overflow(text.to_string()))
}

/// Formats an FFT length the way LLR prints it.
pub fn format_fftlen(len: u64) -> String {
    if len != 0 && len % MEGA == 0 {
        format!("{}M", len / MEGA)
    } else if len != 0 && len % KILO == 0 {
        format!("{}K", len / KILO)
    } else {
        len.to_string()
    }
}

/// A positive FFT length accepted in compact notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FftLen(u64);

impl FftLen {
    /// Exact transform size.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for FftLen {
    type Err = FftLenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_fftlen(s)? {
            0 => Err(FftLenError::Zero),
            len => Ok(FftLen(len)),
        }
    }
}

impl fmt::Display for FftLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fftlen(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixes() {
        assert_eq!(parse_fftlen("4096"), Ok(4096));
        assert_eq!(parse_fftlen("4K"), Ok(4096));
        assert_eq!(parse_fftlen("4k"), Ok(4096));
        assert_eq!(parse_fftlen("2m"), Ok(2_097_152));
        assert_eq!(parse_fftlen("1M"), Ok(1_048_576));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_fftlen(""), Err(FftLenError::Empty));
        assert_eq!(parse_fftlen("K"), Err(FftLenError::Invalid("K".into())));
        assert_eq!(parse_fftlen("1.5M"), Err(FftLenError::Invalid("1.5M".into())));
        assert_eq!(parse_fftlen("-4K"), Err(FftLenError::Invalid("-4K".into())));
        assert_eq!(parse_fftlen("12G"), Err(FftLenError::Invalid("12G".into())));
    }

    #[test]
    fn rejects_overflow() {
        let huge = format!("{}M", u64::MAX);
        assert_eq!(parse_fftlen(&huge), Err(FftLenError::Overflow(huge.clone())));
    }

    #[test]
    fn formats_compactly() {
        assert_eq!(format_fftlen(32), "32");
        assert_eq!(format_fftlen(1536), "1536");
        assert_eq!(format_fftlen(120 * 1024), "120K");
        assert_eq!(format_fftlen(2 * 1024 * 1024), "2M");
        assert_eq!(format_fftlen(0), "0");
    }

    #[test]
    fn fftlen_from_str() {
        assert_eq!("2M".parse::<FftLen>().map(FftLen::get), Ok(2_097_152));
        assert_eq!("0".parse::<FftLen>(), Err(FftLenError::Zero));
        assert_eq!("192K".parse::<FftLen>().unwrap().to_string(), "192K");
    }
}
