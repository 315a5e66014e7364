//! Descriptor operations.
//!
//! These act on a handle that is already open, so there is no path to check.
//! They forward straight to the native primitive. The guard already ran when
//! the handle was obtained through [`SafeFs::open`] or [`SafeFs::open_sync`].

use std::fs::{File, FileTimes, Metadata, Permissions};
use std::io::{Read, Write};
use std::os::unix::fs::{FileExt, PermissionsExt};
use std::time::SystemTime;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::blocking;
use crate::core::error::Result;
use crate::domains::fs::SafeFs;

// ============================================================================
// Blocking forms
// ============================================================================

impl SafeFs {
    pub fn fstat_sync(&self, file: &File) -> Result<Metadata> {
        Ok(file.metadata()?)
    }

    pub fn fchmod_sync(&self, file: &File, mode: u32) -> Result<()> {
        Ok(file.set_permissions(Permissions::from_mode(mode))?)
    }

    pub fn fchown_sync(&self, file: &File, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        Ok(std::os::unix::fs::fchown(file, uid, gid)?)
    }

    pub fn futimes_sync(&self, file: &File, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        let times = FileTimes::new().set_accessed(atime).set_modified(mtime);
        Ok(file.set_times(times)?)
    }

    pub fn fsync_sync(&self, file: &File) -> Result<()> {
        Ok(file.sync_all()?)
    }

    pub fn ftruncate_sync(&self, file: &File, len: u64) -> Result<()> {
        Ok(file.set_len(len)?)
    }

    /// Read into `buf`. With a `position` the read is positional and the
    /// file cursor does not move.
    pub fn read_sync(&self, file: &mut File, buf: &mut [u8], position: Option<u64>) -> Result<usize> {
        let read = match position {
            Some(offset) => file.read_at(buf, offset)?,
            None => file.read(buf)?,
        };
        Ok(read)
    }

    /// Write `buf`. With a `position` the write is positional and the file
    /// cursor does not move.
    pub fn write_sync(&self, file: &mut File, buf: &[u8], position: Option<u64>) -> Result<usize> {
        let written = match position {
            Some(offset) => file.write_at(buf, offset)?,
            None => file.write(buf)?,
        };
        Ok(written)
    }

    pub fn close_sync(&self, file: File) -> Result<()> {
        drop(file);
        Ok(())
    }
}

// ============================================================================
// Async forms
// ============================================================================

impl SafeFs {
    pub async fn fstat(&self, file: &tokio::fs::File) -> Result<Metadata> {
        Ok(file.metadata().await?)
    }

    pub async fn fchmod(&self, file: &tokio::fs::File, mode: u32) -> Result<()> {
        Ok(file.set_permissions(Permissions::from_mode(mode)).await?)
    }

    pub async fn fchown(
        &self,
        file: &tokio::fs::File,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> Result<()> {
        let std_file = file.try_clone().await?.into_std().await;
        Ok(blocking(move || std::os::unix::fs::fchown(&std_file, uid, gid)).await?)
    }

    pub async fn futimes(
        &self,
        file: &tokio::fs::File,
        atime: SystemTime,
        mtime: SystemTime,
    ) -> Result<()> {
        let std_file = file.try_clone().await?.into_std().await;
        let times = FileTimes::new().set_accessed(atime).set_modified(mtime);
        Ok(blocking(move || std_file.set_times(times)).await?)
    }

    pub async fn fsync(&self, file: &tokio::fs::File) -> Result<()> {
        Ok(file.sync_all().await?)
    }

    pub async fn ftruncate(&self, file: &tokio::fs::File, len: u64) -> Result<()> {
        Ok(file.set_len(len).await?)
    }

    /// Read into `buf`. With a `position` the read is positional and the
    /// file cursor does not move.
    pub async fn read(
        &self,
        file: &mut tokio::fs::File,
        buf: &mut [u8],
        position: Option<u64>,
    ) -> Result<usize> {
        let Some(offset) = position else {
            return Ok(file.read(buf).await?);
        };

        let std_file = file.try_clone().await?.into_std().await;
        let len = buf.len();
        let chunk = blocking(move || {
            let mut chunk = vec![0u8; len];
            let read = std_file.read_at(&mut chunk, offset)?;
            chunk.truncate(read);
            Ok(chunk)
        })
        .await?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    /// Write `buf`. With a `position` the write is positional and the file
    /// cursor does not move.
    pub async fn write(
        &self,
        file: &mut tokio::fs::File,
        buf: &[u8],
        position: Option<u64>,
    ) -> Result<usize> {
        let Some(offset) = position else {
            return Ok(file.write(buf).await?);
        };

        let std_file = file.try_clone().await?.into_std().await;
        let chunk = buf.to_vec();
        Ok(blocking(move || std_file.write_at(&chunk, offset)).await?)
    }

    /// Wait for in-flight writes, then release the handle.
    pub async fn close(&self, mut file: tokio::fs::File) -> Result<()> {
        file.flush().await?;
        drop(file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::fs::test_support::sandbox;
    use std::fs::OpenOptions;
    use std::time::Duration;

    #[test]
    fn test_descriptor_ops_sync() {
        let (_dir, safe) = sandbox();
        let mut file = safe
            .open_sync(
                "foo/index.js",
                OpenOptions::new().read(true).write(true),
            )
            .unwrap();

        assert_eq!(safe.fstat_sync(&file).unwrap().len(), 17);

        let mut buf = [0u8; 4];
        assert_eq!(safe.read_sync(&mut file, &mut buf, Some(5)).unwrap(), 4);
        assert_eq!(&buf, b"foo/");

        assert_eq!(safe.write_sync(&mut file, b"TEST", Some(0)).unwrap(), 4);
        safe.fsync_sync(&file).unwrap();
        safe.ftruncate_sync(&file, 8).unwrap();
        safe.fchmod_sync(&file, 0o600).unwrap();
        safe.fchown_sync(&file, None, None).unwrap();

        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(3_000_000);
        safe.futimes_sync(&file, when, when).unwrap();
        safe.close_sync(file).unwrap();

        assert_eq!(safe.read_to_string_sync("foo/index.js").unwrap(), "TEST foo");
        let meta = safe.stat_sync("foo/index.js").unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        assert_eq!(meta.modified().unwrap(), when);
    }

    #[tokio::test]
    async fn test_descriptor_ops_async() {
        let (_dir, safe) = sandbox();
        let mut file = safe
            .open(
                "foo/index.js",
                tokio::fs::OpenOptions::new().read(true).write(true),
            )
            .await
            .unwrap();

        assert_eq!(safe.fstat(&file).await.unwrap().len(), 17);

        let mut buf = [0u8; 4];
        assert_eq!(safe.read(&mut file, &mut buf, Some(0)).await.unwrap(), 4);
        assert_eq!(&buf, b"test");

        assert_eq!(safe.write(&mut file, b"BEST", Some(0)).await.unwrap(), 4);
        safe.fsync(&file).await.unwrap();
        safe.ftruncate(&file, 4).await.unwrap();
        safe.fchmod(&file, 0o640).await.unwrap();
        safe.fchown(&file, None, None).await.unwrap();

        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(4_000_000);
        safe.futimes(&file, when, when).await.unwrap();
        safe.close(file).await.unwrap();

        assert_eq!(safe.read_to_string("foo/index.js").await.unwrap(), "BEST");
        let meta = safe.stat("foo/index.js").await.unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o640);
        assert_eq!(meta.modified().unwrap(), when);
    }

    #[tokio::test]
    async fn test_positional_async_io_keeps_cursor() {
        let (_dir, safe) = sandbox();
        let mut file = safe
            .open(
                "foo/index.js",
                tokio::fs::OpenOptions::new().read(true).write(true),
            )
            .await
            .unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(safe.read(&mut file, &mut buf, Some(5)).await.unwrap(), 3);
        assert_eq!(&buf, b"foo");

        // the cursor is still at the start
        let mut buf = [0u8; 4];
        assert_eq!(safe.read(&mut file, &mut buf, None).await.unwrap(), 4);
        assert_eq!(&buf, b"test");

        assert_eq!(safe.write(&mut file, b"FOO", Some(5)).await.unwrap(), 3);
        let mut buf = [0u8; 4];
        assert_eq!(safe.read(&mut file, &mut buf, None).await.unwrap(), 4);
        assert_eq!(&buf, b" FOO");

        let mut buf = [0u8; 8];
        assert_eq!(safe.read(&mut file, &mut buf, Some(100)).await.unwrap(), 0);
        safe.close(file).await.unwrap();

        assert_eq!(
            safe.read_to_string("foo/index.js").await.unwrap(),
            "test FOO/index.js"
        );
    }
}
