//! Mount-table scan for filesystems with user quotas enabled.

use std::fs;
use std::path::Path;

use crate::core::errors::{QnError, Result};

/// Mount points whose options include `usrquota`, sorted and de-duplicated.
///
/// `mount_table` is an `/etc/mtab`-format file: device, mount point,
/// fstype, comma-separated options, dump, fsck — whitespace separated.
pub fn quota_filesystems(mount_table: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(mount_table).map_err(|source| QnError::Io {
        path: mount_table.to_path_buf(),
        source,
    })?;

    let mut filesystems = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(QnError::MountParse {
                details: format!(
                    "{}:{}: expected at least 4 fields, got {}",
                    mount_table.display(),
                    lineno + 1,
                    fields.len()
                ),
            });
        }
        let mountpoint = fields[1];
        let options = fields[3];
        if options.split(',').any(|opt| opt == "usrquota") {
            filesystems.push(mountpoint.to_string());
        }
    }

    filesystems.sort();
    filesystems.dedup();
    Ok(filesystems)
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn mtab_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn selects_only_usrquota_mounts() {
        let mtab = mtab_with(
            "/dev/sda1 / ext4 rw,relatime 0 1\n\
             /dev/sda2 /home ext4 rw,usrquota,relatime 0 2\n\
             /dev/sda3 /srv xfs rw,noatime,usrquota 0 2\n\
             tmpfs /tmp tmpfs rw 0 0\n",
        );
        let filesystems = quota_filesystems(mtab.path()).unwrap();
        assert_eq!(filesystems, vec!["/home".to_string(), "/srv".to_string()]);
    }

    #[test]
    fn usrquota_must_match_a_whole_option() {
        // "grpquota" and "usrquota=..." style options must not match.
        let mtab = mtab_with("/dev/sda1 /data ext4 rw,grpquota,nousrquota 0 1\n");
        let filesystems = quota_filesystems(mtab.path()).unwrap();
        assert!(filesystems.is_empty());
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let mtab = mtab_with(
            "/dev/sdb1 /srv ext4 rw,usrquota 0 2\n\
             /dev/sda2 /home ext4 rw,usrquota 0 2\n\
             /dev/sdb1 /srv ext4 rw,usrquota 0 2\n",
        );
        let filesystems = quota_filesystems(mtab.path()).unwrap();
        assert_eq!(filesystems, vec!["/home".to_string(), "/srv".to_string()]);
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let mtab = mtab_with("\n# managed by mount\n/dev/sda2 /home ext4 rw,usrquota 0 2\n");
        let filesystems = quota_filesystems(mtab.path()).unwrap();
        assert_eq!(filesystems, vec!["/home".to_string()]);
    }

    #[test]
    fn short_lines_are_a_mount_parse_error() {
        let mtab = mtab_with("/dev/sda2 /home ext4\n");
        let err = quota_filesystems(mtab.path()).unwrap_err();
        assert_eq!(err.code(), "QN-2101");
    }

    #[test]
    fn missing_table_is_an_io_error() {
        let err = quota_filesystems(Path::new("/nonexistent/mtab")).unwrap_err();
        assert_eq!(err.code(), "QN-3001");
    }
}
