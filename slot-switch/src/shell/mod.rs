//! Backends that run command lines with superuser privileges.
//!
//! A [`RootProvider`] knows whether root can be obtained at all and opens a
//! [`Shell`]. Two backends exist: [`session::SessionRoot`] keeps one `su`
//! shell alive for the whole run, [`oneshot::OneshotRoot`] spawns `su -c` per
//! command.

use crate::ChannelError;
use async_trait::async_trait;
use std::{
    env, fmt,
    path::{Path, PathBuf},
};

pub mod oneshot;
pub mod session;

/// Directories where Android root solutions install their `su` binary.
const SU_SEARCH_PATHS: &[&str] = &[
    "/system/bin",
    "/system/xbin",
    "/sbin",
    "/su/bin",
    "/system/sbin",
    "/vendor/bin",
    "/data/local/xbin",
    "/data/local/bin",
    "/data/local",
    "/debug_ramdisk",
];

/// Output of a command that ran to completion.
///
/// stdout and stderr are merged into `lines`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub lines: Vec<String>,
    pub success: bool,
}

impl Output {
    /// First line of output, without trailing whitespace. Blank lines count as
    /// missing.
    pub fn first_line(&self) -> Option<&str> {
        self.lines
            .first()
            .map(|line| line.trim_end())
            .filter(|line| !line.trim().is_empty())
    }

    pub(crate) fn reports_uid_root(&self) -> bool {
        self.success && self.lines.iter().any(|line| line.contains("uid=0"))
    }
}

/// An open privileged shell.
///
/// Implementations run one command at a time: `exec` only returns once the
/// command's output was fully read.
#[async_trait]
pub trait Shell: Send + fmt::Debug {
    /// Runs `cmd` and waits for all of its output.
    async fn exec(&mut self, cmd: &str) -> Result<Output, ChannelError>;

    /// Hands `cmd` to the shell without waiting for it to finish.
    async fn submit(&mut self, cmd: &str) -> Result<(), ChannelError>;

    /// Releases the shell. Commands already submitted keep running.
    async fn close(&mut self);
}

#[async_trait]
pub trait RootProvider: Send + Sync + fmt::Debug {
    /// Whether a root binary exists. Does not ask for access.
    fn is_root_available(&self) -> bool;

    /// Requests superuser access and returns the opened shell.
    async fn open(&self) -> Result<Box<dyn Shell>, ChannelError>;
}

/// Whether this process already has superuser rights, e.g. under `adb root`.
pub fn running_as_root() -> bool {
    rustix::process::geteuid().is_root()
}

/// Program used to get a root shell. When we already run as root there is no
/// need to go through `su`.
fn elevation_program(su: &str, already_root: bool) -> &str {
    if already_root { "sh" } else { su }
}

/// Looks for `su` either at the given path or in `PATH` and the usual Android
/// locations.
pub fn su_binary_present(su: &str) -> bool {
    let su = Path::new(su);
    if su.components().count() > 1 {
        return su.is_file();
    }

    let path = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&path)
        .chain(SU_SEARCH_PATHS.iter().map(PathBuf::from))
        .any(|dir| dir.join(su).is_file())
}

fn spawn_err(err: std::io::Error) -> ChannelError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ChannelError::RootUnavailable
    } else {
        ChannelError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_first_line_is_missing() {
        let out = Output {
            lines: vec!["   ".into(), "2".into()],
            success: true,
        };
        assert_eq!(out.first_line(), None);
    }

    #[test]
    fn first_line_drops_trailing_whitespace() {
        let out = Output {
            lines: vec!["_a\r".into()],
            success: true,
        };
        assert_eq!(out.first_line(), Some("_a"));
    }

    #[test]
    fn uid_check_requires_success() {
        let mut out = Output {
            lines: vec!["uid=0(root) gid=0(root)".into()],
            success: true,
        };
        assert!(out.reports_uid_root());

        out.success = false;
        assert!(!out.reports_uid_root());
    }

    #[test]
    fn missing_absolute_su_is_not_present() {
        assert!(!su_binary_present("/nonexistent/dir/su"));
    }

    #[test]
    fn root_processes_skip_su() {
        assert_eq!(elevation_program("/system/xbin/su", true), "sh");
        assert_eq!(elevation_program("/system/xbin/su", false), "/system/xbin/su");
    }
}
