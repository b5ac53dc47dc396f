//! Calibration table and test-case files.
//!
//! The table holds one `<fftlen> <mersenne_n>` line per FFT length, in the
//! same right-aligned layout LLRTools reads. The test-case file starts with a
//! sieve-style header followed by `<k> <n>` lines.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use crate::calibrate::{CalibrationRecord, CalibrationSink, TestCase};
use crate::config::files::TEST_INPUT_HEADER;
use crate::error::TableError;
use crate::model::LengthModel;

/// One line of a calibration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub fftlen: u64,
    pub mersenne_n: u64,
}

impl From<&CalibrationRecord> for TableEntry {
    fn from(record: &CalibrationRecord) -> Self {
        Self {
            fftlen: record.fftlen,
            mersenne_n: record.mersenne,
        }
    }
}

fn table_line(fftlen: u64, n: u64) -> String {
    format!("{:>8} {:>9}", fftlen, n)
}

/// Writes calibration output to a table and a test-case file.
///
/// Lines are flushed as they are written so an interrupted run still leaves
/// every completed transition on disk.
pub struct TableWriter<T: Write, C: Write> {
    table: T,
    tests: C,
}

impl<T: Write, C: Write> TableWriter<T, C> {
    /// Wraps the two outputs and writes the test-case header.
    pub fn new(table: T, mut tests: C) -> io::Result<Self> {
        writeln!(tests, "{}", TEST_INPUT_HEADER)?;
        tests.flush()?;
        Ok(Self { table, tests })
    }

    pub fn into_inner(self) -> (T, C) {
        (self.table, self.tests)
    }
}

impl<T: Write, C: Write> CalibrationSink for TableWriter<T, C> {
    fn on_test_case(&mut self, case: &TestCase) -> io::Result<()> {
        writeln!(self.tests, "{} {}", case.k, case.n)?;
        self.tests.flush()
    }

    fn on_record(&mut self, record: &CalibrationRecord) -> io::Result<()> {
        writeln!(self.table, "{}", table_line(record.fftlen, record.mersenne))?;
        self.table.flush()
    }
}

/// Reads a calibration table.
///
/// # Errors
/// * `TableError::Malformed` for any non-blank line that is not two integers.
pub fn read_table<R: BufRead>(reader: R) -> Result<Vec<TableEntry>, TableError> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let entry = match (fields.next(), fields.next(), fields.next()) {
            (None, _, _) => continue,
            (Some(fftlen), Some(n), None) => fftlen
                .parse()
                .ok()
                .zip(n.parse().ok())
                .map(|(fftlen, mersenne_n)| TableEntry { fftlen, mersenne_n }),
            _ => None,
        };
        match entry {
            Some(entry) => entries.push(entry),
            None => {
                return Err(TableError::Malformed {
                    line: idx + 1,
                    text: line,
                })
            }
        }
    }
    Ok(entries)
}

/// Renders the table with every maximum exponent adjusted for the model's `k`.
pub fn render_adjusted(model: &LengthModel, entries: &[TableEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "FFT lengths for k={}", model.k());
    for entry in entries {
        let n = model.adjusted_n_max(entry.fftlen, entry.mersenne_n as f64);
        let _ = writeln!(out, "{:>8} {:>9}", entry.fftlen, n.trunc() as i64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_layout() {
        let mut writer = TableWriter::new(Vec::new(), Vec::new()).unwrap();
        writer.on_test_case(&TestCase { k: 100_005, n: 416 }).unwrap();
        writer
            .on_record(&CalibrationRecord {
                fftlen: 32,
                max_n: 417,
                mersenne: 699,
            })
            .unwrap();
        writer
            .on_record(&CalibrationRecord {
                fftlen: 65_536,
                max_n: 1_000_000,
                mersenne: 1_544_289,
            })
            .unwrap();

        let (table, tests) = writer.into_inner();
        assert_eq!(
            String::from_utf8(table).unwrap(),
            "      32       699\n   65536   1544289\n"
        );
        assert_eq!(
            String::from_utf8(tests).unwrap(),
            "1000000000000:M:1:2:258\n100005 416\n"
        );
    }

    #[test]
    fn reads_aligned_table() {
        let text = "      32       699\n\n   65536   1544289\n";
        let entries = read_table(text.as_bytes()).unwrap();
        assert_eq!(
            entries,
            [
                TableEntry { fftlen: 32, mersenne_n: 699 },
                TableEntry { fftlen: 65_536, mersenne_n: 1_544_289 },
            ]
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        for bad in ["32", "32 699 1", "32 abc", "-32 699"] {
            let text = format!("64 1300\n{bad}\n");
            match read_table(text.as_bytes()) {
                Err(TableError::Malformed { line, text }) => {
                    assert_eq!(line, 2);
                    assert_eq!(text, bad);
                }
                other => panic!("expected malformed error for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn written_table_reads_back() {
        let record = CalibrationRecord {
            fftlen: 1024,
            max_n: 19_000,
            mersenne: 27_521,
        };
        let mut writer = TableWriter::new(Vec::new(), io::sink()).unwrap();
        writer.on_record(&record).unwrap();
        let (table, _) = writer.into_inner();
        assert_eq!(read_table(table.as_slice()).unwrap(), [TableEntry::from(&record)]);
    }

    #[test]
    fn render_uses_plain_formula_below_two_to_twenty() {
        // k = 1024: adjust(32) = 10 + 160 = 170
        let model = LengthModel::new(1024).unwrap();
        let out = render_adjusted(&model, &[TableEntry { fftlen: 32, mersenne_n: 700 }]);
        assert_eq!(out, "FFT lengths for k=1024\n      32       530\n");
    }

    #[test]
    fn render_uses_zero_padded_formula_from_two_to_twenty() {
        // (700 + 0.3 * 1000) / 2 = 500
        let model = LengthModel::new(1 << 20).unwrap();
        let out = render_adjusted(&model, &[TableEntry { fftlen: 1000, mersenne_n: 700 }]);
        assert_eq!(out, "FFT lengths for k=1048576\n    1000       500\n");
    }
}
