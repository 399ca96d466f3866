//! Probe implementation that shells out to `quotatool`.
//!
//! Output contract: one line of ten whitespace-separated fields —
//! uid, filesystem, blocks used, block soft limit, block hard limit,
//! block grace seconds, inodes used, inode soft limit, inode hard limit,
//! inode grace seconds.

use std::path::PathBuf;
use std::process::Command;

use crate::core::errors::{QnError, Result};
use crate::probe::{KindReading, ProbeReading, QuotaProbe};

/// Invokes the configured quota reporting tool per (account, filesystem).
pub struct QuotatoolProbe {
    command: PathBuf,
}

impl QuotatoolProbe {
    #[must_use]
    pub fn new(command: PathBuf) -> Self {
        Self { command }
    }
}

impl QuotaProbe for QuotatoolProbe {
    fn probe(&self, uid: u32, filesystem: &str) -> Result<ProbeReading> {
        let probe_err = |details: String| QnError::Probe {
            uid,
            filesystem: filesystem.to_string(),
            details,
        };

        let output = Command::new(&self.command)
            .arg("-u")
            .arg(uid.to_string())
            .arg("-d")
            .arg(filesystem)
            .output()
            .map_err(|error| probe_err(format!("failed to run quotatool: {error}")))?;

        if !output.status.success() {
            return Err(probe_err(format!(
                "quotatool exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_quotatool_line(&stdout)
    }
}

/// Parse one line of quotatool dump output into a reading.
pub fn parse_quotatool_line(line: &str) -> Result<ProbeReading> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 10 {
        return Err(QnError::ProbeParse {
            details: format!("expected 10 fields, got {}: '{}'", fields.len(), line.trim()),
        });
    }

    // Fields 0 and 1 echo the uid and filesystem; only the counts matter.
    let parse = |index: usize, name: &str| -> Result<u64> {
        fields[index].parse().map_err(|_| QnError::ProbeParse {
            details: format!("field {name} is not a count: '{}'", fields[index]),
        })
    };

    Ok(ProbeReading {
        block: KindReading {
            used: parse(2, "blocks_used")?,
            soft_limit: parse(3, "block_soft_limit")?,
            hard_limit: parse(4, "block_hard_limit")?,
            grace_seconds: parse(5, "block_grace_seconds")?,
        },
        inode: KindReading {
            used: parse(6, "inodes_used")?,
            soft_limit: parse(7, "inode_soft_limit")?,
            hard_limit: parse(8, "inode_hard_limit")?,
            grace_seconds: parse(9, "inode_grace_seconds")?,
        },
    })
}

// ──────────────────── tests ────────────────────
