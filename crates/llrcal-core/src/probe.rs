//! LLR wrapper: one short diagnostic run per `(k, n)`.
//!
//! Each probe:
//! 1. Spawns `llr -w<dir> -d -q<k>*2^<n>-1`
//! 2. Drains stdout on a reader thread while polling for exit
//! 3. Kills the process once the time budget is spent
//! 4. Searches whatever was printed for `FFT length <N>[K|M]`
//!
//! LLR announces its transform size before starting the test, so a run cut
//! short by the timeout is the normal case.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

use regex::bytes::Regex;
use tempfile::TempDir;

use crate::config::probe::{DEFAULT_TIMEOUT, POLL_INTERVAL};
use crate::error::ProbeError;
use crate::fftlen::parse_fftlen;

static FFTLEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"FFT length (\d+[kmKM]?)").expect("invalid FFT length pattern")
});

/// Black-box oracle reporting the FFT length chosen for `k·2^n − 1`.
///
/// `Ok(None)` means the length could not be determined for this exponent;
/// callers retry at neighbouring exponents. `Err` aborts the run.
pub trait Probe {
    fn probe(&mut self, k: u64, n: u64) -> Result<Option<u64>, ProbeError>;
}

impl<P: Probe + ?Sized> Probe for &mut P {
    fn probe(&mut self, k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
        (**self).probe(k, n)
    }
}

impl<P: Probe + ?Sized> Probe for Box<P> {
    fn probe(&mut self, k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
        (**self).probe(k, n)
    }
}

/// Extracts the first reported FFT length from LLR output.
pub fn parse_probe_output(output: &[u8]) -> Option<u64> {
    let caps = FFTLEN_PATTERN.captures(output)?;
    let text = std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?;
    parse_fftlen(text).ok()
}

enum Workdir {
    Scratch(TempDir),
    Fixed(PathBuf),
}

impl Workdir {
    fn path(&self) -> &Path {
        match self {
            Workdir::Scratch(dir) => dir.path(),
            Workdir::Fixed(path) => path,
        }
    }
}

/// Probe backed by an LLR executable.
pub struct LlrProbe {
    program: PathBuf,
    workdir: Workdir,
    timeout: Duration,
}

impl LlrProbe {
    /// Creates a probe running `program` in a fresh scratch directory.
    ///
    /// The directory is removed when the probe is dropped.
    pub fn new(program: impl Into<PathBuf>) -> Result<Self, ProbeError> {
        let scratch = tempfile::Builder::new()
            .prefix("llrcal-")
            .tempdir()
            .map_err(ProbeError::Workdir)?;
        Ok(Self {
            program: program.into(),
            workdir: Workdir::Scratch(scratch),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Creates a probe running `program` in the existing directory `dir`.
    pub fn in_workdir(program: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: Workdir::Fixed(dir.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the per-invocation time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn args(&self, k: u64, n: u64) -> [String; 3] {
        [
            format!("-w{}", self.workdir.path().display()),
            "-d".to_string(),
            format!("-q{k}*2^{n}-1"),
        ]
    }

    /// Runs the tool once and returns everything it printed to stdout before
    /// exiting or being killed, plus whether the time budget ran out.
    fn run(&self, k: u64, n: u64) -> Result<(Vec<u8>, bool), ProbeError> {
        let mut child = Command::new(&self.program)
            .args(self.args(k, n))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Read on a separate thread so output is kept even if the child has to
        // be killed, and so a full pipe never blocks the child.
        let mut stdout = child.stdout.take();
        let reader = thread::spawn(move || -> std::io::Result<Vec<u8>> {
            let mut buf = Vec::new();
            if let Some(out) = stdout.as_mut() {
                out.read_to_end(&mut buf)?;
            }
            Ok(buf)
        });

        let start = Instant::now();
        let timed_out = loop {
            if child.try_wait()?.is_some() {
                break false;
            }
            if start.elapsed() >= self.timeout {
                // The child may exit between the poll and the kill.
                let _ = child.kill();
                child.wait()?;
                break true;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = reader
            .join()
            .map_err(|_| std::io::Error::other("stdout reader panicked"))??;
        Ok((output, timed_out))
    }
}

impl Probe for LlrProbe {
    fn probe(&mut self, k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
        let (output, timed_out) = self.run(k, n)?;
        let fftlen = parse_probe_output(&output);
        if timed_out && output.is_empty() {
            log::warn!(
                "{} printed nothing for {}*2^{}-1 within {:?}",
                self.program.display(),
                k,
                n,
                self.timeout
            );
        }
        log::debug!(
            "probe {}*2^{}-1: fftlen={:?} ({} bytes{})",
            k,
            n,
            fftlen,
            output.len(),
            if timed_out { ", timed out" } else { "" }
        );
        Ok(fftlen)
    }
}

/// Memoises defined answers of an inner probe for the duration of a run.
///
/// Unknown answers are not cached, so a retry at the same exponent reaches the
/// tool again.
pub struct CachingProbe<P> {
    inner: P,
    cache: HashMap<(u64, u64), u64>,
    hits: u64,
}

impl<P: Probe> CachingProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
            hits: 0,
        }
    }

    /// Number of answers served without invoking the inner probe.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Probe> Probe for CachingProbe<P> {
    fn probe(&mut self, k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
        if let Some(&len) = self.cache.get(&(k, n)) {
            self.hits += 1;
            return Ok(Some(len));
        }
        let answer = self.inner.probe(k, n)?;
        if let Some(len) = answer {
            self.cache.insert((k, n), len);
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_llr_banner() {
        let out = b"Starting Lucas Lehmer Riesel prime test of 100005*2^5000-1\n\
                    Using all-complex FMA3 FFT length 64, a = 3\n";
        assert_eq!(parse_probe_output(out), Some(64));
    }

    #[test]
    fn parses_suffixed_lengths() {
        assert_eq!(parse_probe_output(b"zero-padded FFT length 120K, a = 3"), Some(122_880));
        assert_eq!(parse_probe_output(b"FFT length 2M"), Some(2_097_152));
        assert_eq!(parse_probe_output(b"FFT length 1m"), Some(1_048_576));
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(parse_probe_output(b"FFT length 32\nFFT length 64\n"), Some(32));
    }

    #[test]
    fn missing_pattern_is_unknown() {
        assert_eq!(parse_probe_output(b""), None);
        assert_eq!(parse_probe_output(b"Starting test...\n"), None);
        assert_eq!(parse_probe_output(b"FFT length: 64"), None);
    }

    #[test]
    fn tolerates_non_utf8_noise() {
        let mut out = vec![0xff, 0xfe, b'\n'];
        out.extend_from_slice(b"FFT length 48K\n");
        assert_eq!(parse_probe_output(&out), Some(49_152));
    }

    #[test]
    fn builds_llr_arguments() {
        let probe = LlrProbe::in_workdir("llr", "/tmp/work");
        assert_eq!(
            probe.args(100_005, 4242),
            ["-w/tmp/work".to_string(), "-d".to_string(), "-q100005*2^4242-1".to_string()]
        );
    }

    #[test]
    fn workdir_kinds() {
        let fixed = LlrProbe::in_workdir("llr", "/tmp/work");
        assert_eq!(fixed.workdir(), Path::new("/tmp/work"));
        assert_eq!(fixed.timeout(), DEFAULT_TIMEOUT);

        let scratch = LlrProbe::new("llr").unwrap();
        let dir = scratch.workdir().to_path_buf();
        assert!(dir.is_dir());
        drop(scratch);
        assert!(!dir.exists());
    }

    #[test]
    fn missing_program_is_an_error() {
        let mut probe = LlrProbe::new("/nonexistent/llr-binary").unwrap();
        assert!(matches!(probe.probe(3, 100), Err(ProbeError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_keeps_partial_output() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-llr");
        std::fs::write(&script, "#!/bin/sh\necho 'Using FFT length 96K'\nexec sleep 5\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mut probe = LlrProbe::new(&script)
            .unwrap()
            .with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        assert_eq!(probe.probe(3, 100).unwrap(), Some(98_304));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    struct Counting {
        calls: u64,
    }

    impl Probe for Counting {
        fn probe(&mut self, _k: u64, n: u64) -> Result<Option<u64>, ProbeError> {
            self.calls += 1;
            Ok(if n % 2 == 0 { Some(32) } else { None })
        }
    }

    #[test]
    fn cache_keeps_only_defined_answers() {
        let mut probe = CachingProbe::new(Counting { calls: 0 });
        assert_eq!(probe.probe(3, 10).unwrap(), Some(32));
        assert_eq!(probe.probe(3, 10).unwrap(), Some(32));
        assert_eq!(probe.probe(3, 11).unwrap(), None);
        assert_eq!(probe.probe(3, 11).unwrap(), None);
        assert_eq!(probe.hits(), 1);
        assert_eq!(probe.into_inner().calls, 3);
    }
}
