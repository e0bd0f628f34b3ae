// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Golden digest files written by `record` and checked by `verify`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Current on-disk format.
pub const GOLDEN_FORMAT: u16 = 1;

/// One recorded trace digest and what produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Golden {
    /// On-disk format version.
    pub format: u16,
    /// Digest hash function.
    pub hash_alg: String,
    /// Executor identifier.
    pub executor: String,
    /// Algorithm keyword and arguments as typed.
    pub invocation: Vec<String>,
    /// Trace length.
    pub snapshots: usize,
    /// Lowercase hex trace digest.
    pub digest_hex: String,
}

impl Golden {
    /// Golden record for a trace just produced.
    pub fn new(
        executor: &str,
        invocation: Vec<String>,
        snapshots: usize,
        digest_hex: String,
    ) -> Self {
        Self {
            format: GOLDEN_FORMAT,
            hash_alg: "BLAKE3".to_owned(),
            executor: executor.to_owned(),
            invocation,
            snapshots,
            digest_hex,
        }
    }

    /// Reads a golden file.
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open golden file {}", path.display()))?;
        let golden: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("malformed golden file {}", path.display()))?;
        if golden.format != GOLDEN_FORMAT {
            bail!(
                "golden file {} has format {}, expected {GOLDEN_FORMAT}",
                path.display(),
                golden.format
            );
        }
        Ok(golden)
    }

    /// Writes the golden file, replacing any existing one.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create golden file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Fails with a readable report unless `actual` matches this record.
    pub fn check(&self, actual: &Self) -> Result<()> {
        if self.invocation != actual.invocation {
            bail!(
                "golden file was recorded for `{}`, not `{}`",
                self.invocation.join(" "),
                actual.invocation.join(" ")
            );
        }
        if self.executor != actual.executor {
            bail!(
                "executor mismatch: golden has {}, run used {}",
                self.executor,
                actual.executor
            );
        }
        if self.snapshots != actual.snapshots || self.digest_hex != actual.digest_hex {
            bail!(
                "trace digest mismatch for {}.\nExpected: {} ({} snapshots)\nActual:   {} ({} snapshots)",
                self.executor,
                self.digest_hex,
                self.snapshots,
                actual.digest_hex,
                actual.snapshots
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sample() -> Golden {
        Golden::new("kmp", vec!["kmp".into(), "ab".into(), "b".into()], 7, "00ff".into())
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kmp.json");
        sample().write(&path).unwrap();
        assert_eq!(Golden::read(&path).unwrap(), sample());
    }

    #[test]
    fn check_reports_each_kind_of_drift() {
        let golden = sample();
        assert!(golden.check(&sample()).is_ok());

        let drifted = Golden {
            digest_hex: "0100".into(),
            ..sample()
        };
        let err = golden.check(&drifted).unwrap_err().to_string();
        assert!(err.contains("digest mismatch"), "{err}");

        let other_input = Golden {
            invocation: vec!["kmp".into(), "ab".into(), "a".into()],
            ..sample()
        };
        let err = golden.check(&other_input).unwrap_err().to_string();
        assert!(err.contains("recorded for `kmp ab b`"), "{err}");
    }

    #[test]
    fn unknown_format_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        let future = Golden {
            format: GOLDEN_FORMAT + 1,
            ..sample()
        };
        future.write(&path).unwrap();
        assert!(Golden::read(&path).is_err());
    }
}
