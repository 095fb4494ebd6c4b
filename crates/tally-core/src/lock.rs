use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// Advisory lock errors for the data directory.
#[derive(Debug)]
pub enum LockError {
    Timeout { path: PathBuf, waited: Duration },
    IoError(io::Error),
}

impl From<io::Error> for LockError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::IoError(_) => ErrorCode::StoreSaveFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { path, waited } => {
                write!(
                    f,
                    "{}: lock timed out after {:?} at {}",
                    self.code().code(),
                    waited,
                    path.display()
                )
            }
            Self::IoError(err) => write!(f, "{}: {}", self.code().code(), err),
        }
    }
}

impl std::error::Error for LockError {}

/// RAII guard for the data-directory exclusive lock.
///
/// All aggregate mutation has a single logical owner; across OS processes
/// this lock is that rule. Acquire it before opening the engine, hold it for
/// the life of the process.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Acquire an exclusive advisory lock on `<data_dir>/tally.lock`,
    /// retrying until `timeout`.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join("tally.lock");

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Self { file, path });
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path,
                    waited: start.elapsed(),
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Explicitly release the lock. Release also happens automatically on
    /// drop.
    pub fn release(self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }

    /// Return the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::{DataDirLock, LockError};
    use crate::error::ErrorCode;
    use std::time::Duration;

    #[test]
    fn lock_allows_acquire_and_release() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let lock = DataDirLock::acquire(dir.path(), Duration::from_millis(50)).expect("acquire");
        assert!(lock.path().ends_with("tally.lock"));
        lock.release();
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let _held = DataDirLock::acquire(dir.path(), Duration::from_millis(50)).expect("acquire");
        let err = DataDirLock::acquire(dir.path(), Duration::from_millis(20))
            .expect_err("second acquire should fail");
        assert!(matches!(err, LockError::Timeout { .. }));
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());
    }

    #[test]
    fn release_allows_follow_up_lock() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        {
            let _first =
                DataDirLock::acquire(dir.path(), Duration::from_millis(50)).expect("acquire");
        }
        let _second = DataDirLock::acquire(dir.path(), Duration::from_millis(50))
            .expect("reacquire after drop");
    }

    #[test]
    fn acquire_creates_missing_data_dir() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let nested = dir.path().join("deep/data");
        let _lock = DataDirLock::acquire(&nested, Duration::from_millis(50)).expect("acquire");
        assert!(nested.exists());
    }
}
