use crate::{
    ChannelError,
    shell::{Output, Shell},
};
use std::fmt;
use tracing::{debug, trace};

/// Execution order of the fixed command set.
pub mod ordinal {
    pub const PROBE_BOOTCTL: u32 = 0;
    pub const HAL_INFO: u32 = 1;
    pub const NUMBER_SLOTS: u32 = 2;
    pub const CURRENT_SLOT: u32 = 3;
    pub const SUFFIX: u32 = 4;
    pub const SET_ACTIVE_SLOT: u32 = 5;
    pub const REBOOT: u32 = 6;
}

/// A command line to run through the [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub ordinal: u32,
    pub text: String,
    /// The channel only accepts privileged commands.
    pub privileged: bool,
}

impl Command {
    pub fn privileged(ordinal: u32, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
            privileged: true,
        }
    }

    /// `bootctl <args>`, with `bootctl` being the configured utility name.
    pub fn bootctl(ordinal: u32, bootctl: &str, args: impl fmt::Display) -> Self {
        Self::privileged(ordinal, format!("{bootctl} {args}"))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The privileged channel owned by one run of the pipeline.
///
/// Commands must be privileged and issued in non-decreasing ordinal order.
/// Once closed, [`Channel::run`] and [`Channel::queue`] fail with
/// [`ChannelError::Closed`] and further [`Channel::close`] calls do nothing.
#[derive(Debug)]
pub struct Channel {
    shell: Option<Box<dyn Shell>>,
    last_ordinal: Option<u32>,
}

impl Channel {
    pub fn new(shell: Box<dyn Shell>) -> Self {
        Self {
            shell: Some(shell),
            last_ordinal: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shell.is_none()
    }

    fn admit(&mut self, cmd: &Command) -> Result<&mut Box<dyn Shell>, ChannelError> {
        let shell = self.shell.as_mut().ok_or(ChannelError::Closed)?;
        if !cmd.privileged {
            return Err(ChannelError::Unprivileged {
                ordinal: cmd.ordinal,
            });
        }
        if let Some(last) = self.last_ordinal
            && cmd.ordinal < last
        {
            return Err(ChannelError::OutOfOrder {
                ordinal: cmd.ordinal,
                last,
            });
        }
        self.last_ordinal = Some(cmd.ordinal);

        Ok(shell)
    }

    /// Runs `cmd` and returns its complete output.
    pub async fn run(&mut self, cmd: &Command) -> Result<Output, ChannelError> {
        let shell = self.admit(cmd)?;
        debug!(ordinal = cmd.ordinal, "running `{cmd}`");

        let output = shell.exec(&cmd.text).await?;
        trace!(?output, "`{cmd}` finished");

        Ok(output)
    }

    /// Hands `cmd` to the shell without waiting for its output.
    pub async fn queue(&mut self, cmd: &Command) -> Result<(), ChannelError> {
        let shell = self.admit(cmd)?;
        debug!(ordinal = cmd.ordinal, "queueing `{cmd}`");

        shell.submit(&cmd.text).await
    }

    pub async fn close(&mut self) {
        if let Some(mut shell) = self.shell.take() {
            debug!("closing privileged channel");
            shell.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeShell;

    #[tokio::test]
    async fn rejects_commands_out_of_order() {
        let (shell, log) = FakeShell::new(vec![]);
        let mut channel = Channel::new(Box::new(shell));

        channel
            .run(&Command::bootctl(ordinal::CURRENT_SLOT, "bootctl", "get-current-slot"))
            .await
            .unwrap();
        let err = channel
            .run(&Command::bootctl(ordinal::HAL_INFO, "bootctl", "hal-info"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ChannelError::OutOfOrder {
                ordinal: ordinal::HAL_INFO,
                last: ordinal::CURRENT_SLOT
            }
        ));
        assert_eq!(log.commands(), vec!["bootctl get-current-slot"]);
    }

    #[tokio::test]
    async fn refuses_unprivileged_commands() {
        let (shell, log) = FakeShell::new(vec![]);
        let mut channel = Channel::new(Box::new(shell));
        let cmd = Command {
            privileged: false,
            ..Command::bootctl(ordinal::HAL_INFO, "bootctl", "hal-info")
        };

        let err = channel.queue(&cmd).await.unwrap_err();

        assert!(matches!(
            err,
            ChannelError::Unprivileged {
                ordinal: ordinal::HAL_INFO
            }
        ));
        assert!(log.commands().is_empty());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (shell, log) = FakeShell::new(vec![]);
        let mut channel = Channel::new(Box::new(shell));

        channel.close().await;
        channel.close().await;

        assert!(channel.is_closed());
        assert_eq!(log.close_count(), 1);
        let err = channel
            .run(&Command::privileged(ordinal::HAL_INFO, "true"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }
}
