//! One `su -c` process per command.

use super::{Output, RootProvider, Shell, elevation_program, spawn_err, su_binary_present};
use crate::ChannelError;
use async_trait::async_trait;
use std::{process::Stdio, time::Duration};
use tokio::time;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OneshotRoot {
    su: String,
    timeout: Duration,
    already_root: bool,
}

impl OneshotRoot {
    pub fn new(su: impl Into<String>, timeout: Duration) -> Self {
        Self {
            su: su.into(),
            timeout,
            already_root: false,
        }
    }

    /// Run commands with `sh -c` instead of `su -c` because we already are
    /// root.
    #[must_use]
    pub fn already_root(self, already_root: bool) -> Self {
        Self {
            already_root,
            ..self
        }
    }
}

#[async_trait]
impl RootProvider for OneshotRoot {
    fn is_root_available(&self) -> bool {
        self.already_root || su_binary_present(&self.su)
    }

    async fn open(&self) -> Result<Box<dyn Shell>, ChannelError> {
        let mut shell = Oneshot {
            program: elevation_program(&self.su, self.already_root).to_owned(),
            closed: false,
        };

        let id = time::timeout(self.timeout, shell.exec("id"))
            .await
            .map_err(|_| ChannelError::Timeout(self.timeout))??;

        if !id.reports_uid_root() {
            debug!("`su -c id` returned {id:?}");
            return Err(ChannelError::RootDenied);
        }

        Ok(Box::new(shell))
    }
}

#[derive(Debug)]
pub struct Oneshot {
    program: String,
    closed: bool,
}

impl Oneshot {
    fn command(&self, cmd: &str) -> Result<tokio::process::Command, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }

        let mut command = tokio::process::Command::new(&self.program);
        command.arg("-c").arg(cmd).stdin(Stdio::null());

        Ok(command)
    }
}

#[async_trait]
impl Shell for Oneshot {
    async fn exec(&mut self, cmd: &str) -> Result<Output, ChannelError> {
        // A timed out grant check must not leave a pending root prompt behind.
        let output = self
            .command(cmd)?
            .kill_on_drop(true)
            .output()
            .await
            .map_err(spawn_err)?;

        let lines = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(str::to_owned)
            .collect();

        Ok(Output {
            lines,
            success: output.status.success(),
        })
    }

    async fn submit(&mut self, cmd: &str) -> Result<(), ChannelError> {
        let child = self
            .command(cmd)?
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_err)?;
        debug!("submitted `{cmd}` as pid {:?}", child.id());

        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn merges_stdout_and_stderr() {
        let mut shell = Oneshot {
            program: "sh".to_string(),
            closed: false,
        };

        let out = shell.exec("echo 2; echo warn >&2").await.unwrap();
        assert_eq!(out.lines, vec!["2", "warn"]);
        assert!(out.success);

        let out = shell.exec("exit 3").await.unwrap();
        assert!(!out.success);
    }

    #[tokio::test]
    async fn refuses_commands_after_close() {
        let mut shell = Oneshot {
            program: "sh".to_string(),
            closed: false,
        };
        shell.close().await;

        assert!(matches!(
            shell.exec("true").await,
            Err(ChannelError::Closed)
        ));
        assert!(matches!(
            shell.submit("true").await,
            Err(ChannelError::Closed)
        ));
    }
}
