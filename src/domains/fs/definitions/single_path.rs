//! Single-path operations.
//!
//! The async form resolves to `Err` on a denial and the `_sync` form returns
//! it; neither touches the disk in that case. On success the resolved path
//! replaces the caller's and every other argument is forwarded as given.

use std::fs::{self, Metadata, Permissions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::PathBuf;
use std::time::SystemTime;

use tokio::io::AsyncWriteExt;

use super::blocking;
use crate::core::error::Result;
use crate::domains::fs::{Operation, SafeFs};

// ============================================================================
// Blocking forms
// ============================================================================

impl SafeFs {
    /// Truncate or extend the file at `path` to `len` bytes.
    pub fn truncate_sync(&self, path: &str, len: u64) -> Result<()> {
        let path = self.guard_path(Operation::Truncate, path)?;
        let file = fs::OpenOptions::new().write(true).open(path)?;
        Ok(file.set_len(len)?)
    }

    /// Change owner and/or group, following symlinks. `None` leaves the id
    /// unchanged.
    pub fn chown_sync(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        let path = self.guard_path(Operation::Chown, path)?;
        Ok(std::os::unix::fs::chown(path, uid, gid)?)
    }

    /// Like [`Self::chown_sync`] but acts on a symlink itself.
    pub fn lchown_sync(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        let path = self.guard_path(Operation::Lchown, path)?;
        Ok(std::os::unix::fs::lchown(path, uid, gid)?)
    }

    pub fn chmod_sync(&self, path: &str, mode: u32) -> Result<()> {
        let path = self.guard_path(Operation::Chmod, path)?;
        Ok(fs::set_permissions(path, Permissions::from_mode(mode))?)
    }

    pub fn stat_sync(&self, path: &str) -> Result<Metadata> {
        let path = self.guard_path(Operation::Stat, path)?;
        Ok(fs::metadata(path)?)
    }

    pub fn lstat_sync(&self, path: &str) -> Result<Metadata> {
        let path = self.guard_path(Operation::Lstat, path)?;
        Ok(fs::symlink_metadata(path)?)
    }

    pub fn readlink_sync(&self, path: &str) -> Result<PathBuf> {
        let path = self.guard_path(Operation::Readlink, path)?;
        Ok(fs::read_link(path)?)
    }

    /// Canonicalize `path`. Only the input is checked against the root; the
    /// canonical result may lie outside it when a symlink points away.
    pub fn realpath_sync(&self, path: &str) -> Result<PathBuf> {
        let path = self.guard_path(Operation::Realpath, path)?;
        Ok(fs::canonicalize(path)?)
    }

    pub fn unlink_sync(&self, path: &str) -> Result<()> {
        let path = self.guard_path(Operation::Unlink, path)?;
        Ok(fs::remove_file(path)?)
    }

    pub fn rmdir_sync(&self, path: &str) -> Result<()> {
        let path = self.guard_path(Operation::Rmdir, path)?;
        Ok(fs::remove_dir(path)?)
    }

    /// Create one directory. `mode` defaults to `0o777` before the umask.
    pub fn mkdir_sync(&self, path: &str, mode: Option<u32>) -> Result<()> {
        let path = self.guard_path(Operation::Mkdir, path)?;
        let mut builder = fs::DirBuilder::new();
        if let Some(mode) = mode {
            builder.mode(mode);
        }
        Ok(builder.create(path)?)
    }

    /// Entry names of a directory, excluding `.` and `..`, in native order.
    pub fn readdir_sync(&self, path: &str) -> Result<Vec<String>> {
        let path = self.guard_path(Operation::Readdir, path)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Open `path` with the given native options.
    pub fn open_sync(&self, path: &str, options: &fs::OpenOptions) -> Result<fs::File> {
        let path = self.guard_path(Operation::Open, path)?;
        Ok(options.open(path)?)
    }

    pub fn utimes_sync(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        let path = self.guard_path(Operation::Utimes, path)?;
        Ok(set_times(path, atime, mtime)?)
    }

    pub fn read_file_sync(&self, path: &str) -> Result<Vec<u8>> {
        let path = self.guard_path(Operation::ReadFile, path)?;
        Ok(fs::read(path)?)
    }

    /// [`Self::read_file_sync`] decoded as UTF-8.
    pub fn read_to_string_sync(&self, path: &str) -> Result<String> {
        let path = self.guard_path(Operation::ReadFile, path)?;
        Ok(fs::read_to_string(path)?)
    }

    /// Create or replace the file at `path`.
    pub fn write_file_sync(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.guard_path(Operation::WriteFile, path)?;
        Ok(fs::write(path, contents)?)
    }

    /// Append to the file at `path`, creating it if needed.
    pub fn append_file_sync(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.guard_path(Operation::AppendFile, path)?;
        let mut file = fs::OpenOptions::new().append(true).create(true).open(path)?;
        Ok(file.write_all(contents.as_ref())?)
    }
}

// ============================================================================
// Async forms
// ============================================================================

impl SafeFs {
    pub async fn truncate(&self, path: &str, len: u64) -> Result<()> {
        let path = self.guard_path(Operation::Truncate, path)?;
        let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        Ok(file.set_len(len).await?)
    }

    pub async fn chown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        let path = self.guard_path(Operation::Chown, path)?;
        Ok(blocking(move || std::os::unix::fs::chown(path, uid, gid)).await?)
    }

    pub async fn lchown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        let path = self.guard_path(Operation::Lchown, path)?;
        Ok(blocking(move || std::os::unix::fs::lchown(path, uid, gid)).await?)
    }

    pub async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let path = self.guard_path(Operation::Chmod, path)?;
        Ok(tokio::fs::set_permissions(path, Permissions::from_mode(mode)).await?)
    }

    pub async fn stat(&self, path: &str) -> Result<Metadata> {
        let path = self.guard_path(Operation::Stat, path)?;
        Ok(tokio::fs::metadata(path).await?)
    }

    pub async fn lstat(&self, path: &str) -> Result<Metadata> {
        let path = self.guard_path(Operation::Lstat, path)?;
        Ok(tokio::fs::symlink_metadata(path).await?)
    }

    pub async fn readlink(&self, path: &str) -> Result<PathBuf> {
        let path = self.guard_path(Operation::Readlink, path)?;
        Ok(tokio::fs::read_link(path).await?)
    }

    /// See [`Self::realpath_sync`]: only the input is checked.
    pub async fn realpath(&self, path: &str) -> Result<PathBuf> {
        let path = self.guard_path(Operation::Realpath, path)?;
        Ok(tokio::fs::canonicalize(path).await?)
    }

    pub async fn unlink(&self, path: &str) -> Result<()> {
        let path = self.guard_path(Operation::Unlink, path)?;
        Ok(tokio::fs::remove_file(path).await?)
    }

    pub async fn rmdir(&self, path: &str) -> Result<()> {
        let path = self.guard_path(Operation::Rmdir, path)?;
        Ok(tokio::fs::remove_dir(path).await?)
    }

    pub async fn mkdir(&self, path: &str, mode: Option<u32>) -> Result<()> {
        let path = self.guard_path(Operation::Mkdir, path)?;
        let mut builder = tokio::fs::DirBuilder::new();
        if let Some(mode) = mode {
            builder.mode(mode);
        }
        Ok(builder.create(path).await?)
    }

    pub async fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let path = self.guard_path(Operation::Readdir, path)?;
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    pub async fn open(
        &self,
        path: &str,
        options: &tokio::fs::OpenOptions,
    ) -> Result<tokio::fs::File> {
        let path = self.guard_path(Operation::Open, path)?;
        Ok(options.open(path).await?)
    }

    pub async fn utimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        let path = self.guard_path(Operation::Utimes, path)?;
        Ok(blocking(move || set_times(path, atime, mtime)).await?)
    }

    pub async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let path = self.guard_path(Operation::ReadFile, path)?;
        Ok(tokio::fs::read(path).await?)
    }

    pub async fn read_to_string(&self, path: &str) -> Result<String> {
        let path = self.guard_path(Operation::ReadFile, path)?;
        Ok(tokio::fs::read_to_string(path).await?)
    }

    pub async fn write_file(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.guard_path(Operation::WriteFile, path)?;
        Ok(tokio::fs::write(path, contents).await?)
    }

    pub async fn append_file(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.guard_path(Operation::AppendFile, path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        file.write_all(contents.as_ref()).await?;
        Ok(file.flush().await?)
    }
}

fn set_times(path: PathBuf, atime: SystemTime, mtime: SystemTime) -> std::io::Result<()> {
    let times = fs::FileTimes::new()
        .set_accessed(atime)
        .set_modified(mtime);
    fs::File::open(path)?.set_times(times)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::security::GuardOptions;
    use crate::domains::fs::test_support::sandbox;
    use std::time::Duration;

    const DENIED: &str = "EACCES, permission denied '../outside.txt'";

    #[test]
    fn test_read_and_write_file_sync() {
        let (dir, safe) = sandbox();

        safe.write_file_sync("./foo/new.txt", "hello").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("foo/new.txt")).unwrap(),
            "hello"
        );
        assert_eq!(safe.read_file_sync("foo/new.txt").unwrap(), b"hello");
        assert_eq!(
            safe.read_to_string_sync("foo/index.js").unwrap(),
            "test foo/index.js"
        );
    }

    #[test]
    fn test_sync_denial_does_not_touch_disk() {
        let (dir, safe) = sandbox();
        let nested = dir.path().join("foo/bar");
        let nested = nested.to_str().unwrap();
        let safe = SafeFs::create(GuardOptions::new(nested).with_root_limit(nested));

        let err = safe.write_file_sync("../outside.txt", "x").unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(err.to_string(), DENIED);
        assert!(!dir.path().join("foo/outside.txt").exists());

        let err = safe.mkdir_sync("../outside.txt", None).unwrap_err();
        assert_eq!(err.to_string(), DENIED);
        assert!(!dir.path().join("foo/outside.txt").exists());
    }

    #[test]
    fn test_native_errors_pass_through() {
        let (_dir, safe) = sandbox();

        let err = safe.read_file_sync("foo/missing.txt").unwrap_err();
        assert!(!err.is_permission_denied());
        assert_eq!(err.code(), Some("ENOENT"));

        let err = safe.rmdir_sync("foo").unwrap_err();
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_truncate_sync() {
        let (dir, safe) = sandbox();
        safe.write_file_sync("foo/truncate.txt", "123456").unwrap();

        safe.truncate_sync("foo/truncate.txt", 3).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("foo/truncate.txt")).unwrap(),
            "123"
        );
        assert!(safe.truncate_sync("/etc/hosts", 0).unwrap_err().is_permission_denied());
    }

    #[test]
    fn test_append_file_sync() {
        let (_dir, safe) = sandbox();
        safe.append_file_sync("foo/log.txt", "a").unwrap();
        safe.append_file_sync("foo/log.txt", "b").unwrap();
        assert_eq!(safe.read_to_string_sync("foo/log.txt").unwrap(), "ab");
    }

    #[test]
    fn test_mkdir_readdir_rmdir_sync() {
        let (_dir, safe) = sandbox();

        safe.mkdir_sync("foo/made", Some(0o755)).unwrap();
        let mode = safe.stat_sync("foo/made").unwrap().permissions().mode();
        assert_eq!(mode & 0o700, 0o700);

        let mut names = safe.readdir_sync("./foo").unwrap();
        names.sort();
        assert_eq!(names, vec!["bar", "index.js", "links", "made"]);

        safe.rmdir_sync("foo/made").unwrap();
        assert!(!safe.exists_sync("foo/made"));
    }

    #[test]
    fn test_stat_lstat_readlink_sync() {
        let (dir, safe) = sandbox();
        std::os::unix::fs::symlink("index.js", dir.path().join("foo/alias.js")).unwrap();

        assert!(safe.stat_sync("foo/alias.js").unwrap().is_file());
        assert!(safe.lstat_sync("foo/alias.js").unwrap().file_type().is_symlink());
        assert_eq!(
            safe.readlink_sync("foo/alias.js").unwrap(),
            PathBuf::from("index.js")
        );
    }

    #[test]
    fn test_realpath_checks_input_only() {
        let (dir, safe) = sandbox();
        let outside = tempfile::TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("foo/escape")).unwrap();

        // the link itself is inside the root, so the call is allowed even
        // though its canonical target is not
        let resolved = safe.realpath_sync("foo/escape").unwrap();
        assert_eq!(resolved, fs::canonicalize(outside.path()).unwrap());

        assert!(safe.realpath_sync("..").unwrap_err().is_permission_denied());
    }

    #[test]
    fn test_chmod_sync() {
        let (_dir, safe) = sandbox();
        safe.chmod_sync("foo/index.js", 0o600).unwrap();
        let mode = safe.stat_sync("foo/index.js").unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_chown_sync_to_same_owner() {
        use std::os::unix::fs::MetadataExt;

        let (_dir, safe) = sandbox();
        let meta = safe.stat_sync("foo/index.js").unwrap();
        safe.chown_sync("foo/index.js", Some(meta.uid()), Some(meta.gid()))
            .unwrap();
        safe.lchown_sync("foo/index.js", None, None).unwrap();
        assert!(safe.chown_sync("/etc/passwd", None, None).unwrap_err().is_permission_denied());
    }

    #[test]
    fn test_utimes_sync() {
        let (_dir, safe) = sandbox();
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        safe.utimes_sync("foo/index.js", when, when).unwrap();
        assert_eq!(safe.stat_sync("foo/index.js").unwrap().modified().unwrap(), when);
    }

    #[test]
    fn test_open_sync() {
        use std::io::Read;

        let (_dir, safe) = sandbox();
        let mut file = safe
            .open_sync("foo/index.js", fs::OpenOptions::new().read(true))
            .unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "test foo/index.js");

        let err = safe
            .open_sync("/etc/passwd", fs::OpenOptions::new().read(true))
            .unwrap_err();
        assert_eq!(err.to_string(), "EACCES, permission denied '/etc/passwd'");
    }

    #[tokio::test]
    async fn test_async_read_write() {
        let (_dir, safe) = sandbox();

        safe.write_file("foo/async.txt", b"one").await.unwrap();
        safe.append_file("foo/async.txt", b" two").await.unwrap();
        assert_eq!(safe.read_to_string("foo/async.txt").await.unwrap(), "one two");
        assert_eq!(safe.read_file("./foo/async.txt").await.unwrap(), b"one two");

        safe.truncate("foo/async.txt", 3).await.unwrap();
        assert_eq!(safe.read_to_string("foo/async.txt").await.unwrap(), "one");
    }

    #[tokio::test]
    async fn test_async_denial_reports_error() {
        let (_dir, safe) = sandbox();

        let err = safe.read_file("../../../../../etc/hosts").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "EACCES, permission denied '../../../../../etc/hosts'"
        );
        assert!(safe.stat("/").await.unwrap_err().is_permission_denied());
        assert!(safe.unlink("/tmp/x").await.unwrap_err().is_permission_denied());
        assert!(safe.readdir("..").await.unwrap_err().is_permission_denied());
    }

    #[tokio::test]
    async fn test_async_directory_ops() {
        let (_dir, safe) = sandbox();

        safe.mkdir("foo/async_dir", None).await.unwrap();
        safe.write_file("foo/async_dir/a", "a").await.unwrap();
        assert_eq!(safe.readdir("foo/async_dir").await.unwrap(), vec!["a"]);

        safe.unlink("foo/async_dir/a").await.unwrap();
        safe.rmdir("foo/async_dir").await.unwrap();
        assert!(!safe.exists("foo/async_dir").await);
    }

    #[tokio::test]
    async fn test_async_metadata_ops() {
        let (dir, safe) = sandbox();
        std::os::unix::fs::symlink("index.js", dir.path().join("foo/alias.js")).unwrap();

        assert!(safe.stat("foo/alias.js").await.unwrap().is_file());
        assert!(safe.lstat("foo/alias.js").await.unwrap().file_type().is_symlink());
        assert_eq!(
            safe.readlink("foo/alias.js").await.unwrap(),
            PathBuf::from("index.js")
        );
        assert_eq!(
            safe.realpath("foo/alias.js").await.unwrap(),
            fs::canonicalize(dir.path().join("foo/index.js")).unwrap()
        );

        safe.chmod("foo/index.js", 0o640).await.unwrap();
        let mode = safe.stat("foo/index.js").await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);

        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000);
        safe.utimes("foo/index.js", when, when).await.unwrap();
        assert_eq!(safe.stat("foo/index.js").await.unwrap().modified().unwrap(), when);

        safe.chown("foo/index.js", None, None).await.unwrap();
        safe.lchown("foo/alias.js", None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_async_open() {
        use tokio::io::AsyncReadExt;

        let (_dir, safe) = sandbox();
        let mut file = safe
            .open("foo/index.js", tokio::fs::OpenOptions::new().read(true))
            .await
            .unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "test foo/index.js");
    }
}
