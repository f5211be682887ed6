//! Timestamped copies of the database file, taken before it is overwritten.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const STAMP: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]-[hour][minute][second]");

/// `<path>.bak-<YYYYMMDD-HHMMSS>`
pub fn backup_path(path: &Path, at: OffsetDateTime) -> Result<PathBuf> {
    let stamp = at.format(STAMP).or_raise(|| ErrorKind::Backup(path.to_path_buf()))?;
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak-");
    name.push(stamp);
    Ok(PathBuf::from(name))
}

/// Copy the current bytes of `path` next to it. Returns the backup's path.
pub(crate) fn backup(path: &Path) -> Result<PathBuf> {
    // Local time, like the file manager the user will look at it in. The
    // local offset can be unavailable (multi-threaded Unix); fall back to UTC.
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let target = backup_path(path, now)?;
    fs::copy(path, &target).or_raise(|| ErrorKind::Backup(target.clone()))?;
    tracing::debug!(from = %path.display(), to = %target.display(), "Backed up id database");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_backup_path() {
        let at = datetime!(2026-01-02 03:04:05 UTC);
        assert_eq!(
            backup_path(Path::new("/data/id_database.json"), at).unwrap(),
            PathBuf::from("/data/id_database.json.bak-20260102-030405")
        );
    }

    #[test]
    fn test_backup_copies_bytes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("db.json");
        fs::write(&path, b"previous contents").unwrap();
        let target = backup(&path).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"previous contents");
        assert!(target.file_name().unwrap().to_string_lossy().starts_with("db.json.bak-"));
    }

    #[test]
    fn test_backup_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = backup(&temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Backup(_)));
    }
}
