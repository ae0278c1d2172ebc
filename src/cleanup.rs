use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// A staging file that is removed unless it is committed.
///
/// Dropping the guard is the only cleanup path, so an interrupted install
/// has to unwind through it rather than exit the process directly.
pub struct StagedFile<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    armed: bool,
}

impl<'a, R: Runtime> StagedFile<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file has been moved into place; leave it alone.
    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl<R: Runtime> Drop for StagedFile<'_, R> {
    fn drop(&mut self) {
        if !self.armed || !self.runtime.exists(&self.path) {
            return;
        }
        debug!("Removing staging file {:?}", self.path);
        if let Err(e) = self.runtime.remove_file(&self.path) {
            warn!("Failed to remove staging file {:?}: {:#}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    #[test]
    fn test_staged_file_removed_on_drop() {
        let path = PathBuf::from("/opt/share/.share.1.partial");
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(|_| true);
        runtime
            .expect_remove_file()
            .with(eq(path.clone()))
            .times(1)
            .returning(|_| Ok(()));

        drop(StagedFile::new(&runtime, path));
    }

    #[test]
    fn test_staged_file_drop_when_never_written() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);
        runtime.expect_remove_file().never();

        drop(StagedFile::new(
            &runtime,
            PathBuf::from("/opt/share/.share.1.partial"),
        ));
    }

    #[test]
    fn test_staged_file_remove_failure_is_not_fatal() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_remove_file()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("Permission denied")));

        drop(StagedFile::new(&runtime, PathBuf::from("/ro/.x.partial")));
    }

    #[test]
    fn test_staged_file_commit_keeps_file() {
        // No expectations = strict mode (panics if any method called)
        let runtime = MockRuntime::new();

        let staged = StagedFile::new(&runtime, PathBuf::from("/x/.y.partial"));
        assert_eq!(staged.path(), Path::new("/x/.y.partial"));
        staged.commit();
    }
}
