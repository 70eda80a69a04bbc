//! A single `su` shell kept open for the whole run.
//!
//! Commands are written to the shell's stdin, each followed by a sentinel
//! `echo` carrying the exit status. Output lines are read back until the
//! sentinel shows up.

use super::{Output, RootProvider, Shell, elevation_program, spawn_err, su_binary_present};
use crate::ChannelError;
use async_trait::async_trait;
use futures::StreamExt as _;
use std::{io, process::Stdio, time::Duration};
use tokio::{
    io::AsyncWriteExt as _,
    process::{Child, ChildStdin, ChildStdout},
    time,
};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

const MARKER: &str = "__SLOT_SWITCH_DONE__";
const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct SessionRoot {
    su: String,
    timeout: Duration,
    already_root: bool,
}

impl SessionRoot {
    pub fn new(su: impl Into<String>, timeout: Duration) -> Self {
        Self {
            su: su.into(),
            timeout,
            already_root: false,
        }
    }

    /// Run a plain `sh` instead of `su` because we already are root.
    #[must_use]
    pub fn already_root(self, already_root: bool) -> Self {
        Self {
            already_root,
            ..self
        }
    }
}

#[async_trait]
impl RootProvider for SessionRoot {
    fn is_root_available(&self) -> bool {
        self.already_root || su_binary_present(&self.su)
    }

    async fn open(&self) -> Result<Box<dyn Shell>, ChannelError> {
        let program = elevation_program(&self.su, self.already_root);
        let mut session = Session::spawn(program)?;

        let id = match time::timeout(self.timeout, session.exec("id")).await {
            Ok(id) => id,
            Err(_) => {
                session.kill();
                return Err(ChannelError::Timeout(self.timeout));
            }
        };

        match id {
            Ok(out) if out.reports_uid_root() => Ok(Box::new(session)),
            Ok(out) => {
                debug!("`id` in su session returned {out:?}");
                session.kill();
                Err(ChannelError::RootDenied)
            }
            // su exited instead of giving us a shell
            Err(ChannelError::Closed) => Err(ChannelError::RootDenied),
            Err(ChannelError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                Err(ChannelError::RootDenied)
            }
            Err(e) => {
                session.kill();
                Err(e)
            }
        }
    }
}

#[derive(Debug)]
pub struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: FramedRead<ChildStdout, LinesCodec>,
}

impl Session {
    fn spawn(program: &str) -> Result<Self, ChannelError> {
        debug!("spawning root session with `{program}`");

        let mut child = tokio::process::Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_err)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("su stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("su stdout was not captured"))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: FramedRead::new(
                stdout,
                LinesCodec::new_with_max_length(MAX_LINE_LEN),
            ),
        })
    }

    async fn write(&mut self, script: &str) -> Result<(), ChannelError> {
        let stdin = self.stdin.as_mut().ok_or(ChannelError::Closed)?;
        stdin.write_all(script.as_bytes()).await?;
        stdin.flush().await?;

        Ok(())
    }

    fn kill(&mut self) {
        self.stdin = None;
        if let Err(e) = self.child.start_kill() {
            warn!("failed to kill su session: {e}");
        }
    }
}

#[async_trait]
impl Shell for Session {
    async fn exec(&mut self, cmd: &str) -> Result<Output, ChannelError> {
        self.write(&format!("{{ {cmd}\n}} 2>&1\necho {MARKER} $?\n"))
            .await?;

        let mut lines = Vec::new();
        while let Some(line) = self.stdout.next().await {
            let line = line.map_err(|e| match e {
                LinesCodecError::Io(e) => ChannelError::Io(e),
                other => ChannelError::Io(io::Error::other(other)),
            })?;

            // Output without a trailing newline ends up on the marker's line.
            let Some(pos) = line.find(MARKER) else {
                lines.push(line);
                continue;
            };
            if pos > 0 {
                lines.push(line[..pos].to_string());
            }
            let status = line[pos + MARKER.len()..].trim();

            return Ok(Output {
                lines,
                success: status == "0",
            });
        }

        Err(ChannelError::Closed)
    }

    async fn submit(&mut self, cmd: &str) -> Result<(), ChannelError> {
        // Nobody reads the output once the session is closed.
        self.write(&format!("{{ {cmd}\n}} >/dev/null 2>&1\n")).await
    }

    async fn close(&mut self) {
        let Some(mut stdin) = self.stdin.take() else {
            return;
        };
        if let Err(e) = stdin.write_all(b"exit\n").await {
            debug!("could not send exit to su session: {e}");
        }
        if let Err(e) = stdin.shutdown().await {
            debug!("could not close su session stdin: {e}");
        }
    }
}
