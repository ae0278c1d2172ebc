//! Passthrough execution of a child process.

use log::{debug, warn};
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self, args))]
    pub(crate) async fn exec_passthrough_impl(
        &self,
        program: &Path,
        args: &[OsString],
    ) -> std::io::Result<i32> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        // The terminal delivers Ctrl-C to the whole process group. The child
        // decides what it means; we only report how it ended.
        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => debug!("Interrupt received, waiting for {:?} to exit", program),
                    Err(e) => {
                        warn!("Cannot listen for interrupts ({}), waiting for child", e);
                        break child.wait().await?;
                    }
                },
            }
        };

        debug!("{:?} exited with {}", program, status);
        Ok(exit_code_of(status))
    }
}

/// Exit code to report for a finished child.
///
/// A child killed by a signal on Unix is reported as `128 + signal`, the
/// convention shells use.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    fn sh(script: &str) -> Vec<OsString> {
        vec!["-c".into(), script.into()]
    }

    #[tokio::test]
    async fn test_exec_passthrough_returns_zero() {
        let code = RealRuntime
            .exec_passthrough(Path::new("/bin/sh"), &sh("exit 0"))
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_exec_passthrough_forwards_nonzero_exit() {
        let code = RealRuntime
            .exec_passthrough(Path::new("/bin/sh"), &sh("exit 2"))
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_exec_passthrough_reports_signal() {
        let code = RealRuntime
            .exec_passthrough(Path::new("/bin/sh"), &sh("kill -TERM $$"))
            .await
            .unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[tokio::test]
    async fn test_exec_passthrough_missing_program() {
        let err = RealRuntime
            .exec_passthrough(Path::new("/nonexistent/bin/tool"), &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_exit_code_of_plain_status() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(exit_code_of(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code_of(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code_of(ExitStatus::from_raw(9)), 137);
    }
}
