use crate::{
    args::{Args, Backend, Commands},
    program::Action,
    shell::{self, RootProvider, oneshot::OneshotRoot, session::SessionRoot},
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: Backend,
    pub su: String,
    /// Name or path of the boot control utility, used as-is in command lines.
    pub bootctl: String,
    /// How long to wait for the superuser grant.
    pub root_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Session,
            su: "su".to_string(),
            bootctl: "bootctl".to_string(),
            root_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            backend: args.backend,
            su: args.su.clone(),
            bootctl: args.bootctl.clone(),
            root_timeout: Duration::from_secs(args.root_timeout),
        }
    }

    pub fn root_provider(&self) -> Box<dyn RootProvider> {
        let already_root = shell::running_as_root();
        match self.backend {
            Backend::Session => Box::new(
                SessionRoot::new(self.su.clone(), self.root_timeout)
                    .already_root(already_root),
            ),
            Backend::Oneshot => Box::new(
                OneshotRoot::new(self.su.clone(), self.root_timeout)
                    .already_root(already_root),
            ),
        }
    }
}

impl Args {
    pub fn action(&self) -> Action {
        match self.subcmd {
            None | Some(Commands::Status) => Action::Status,
            Some(Commands::Switch { .. }) => Action::Switch,
        }
    }

    /// Whether the switch confirmation is skipped.
    pub fn assume_yes(&self) -> bool {
        matches!(self.subcmd, Some(Commands::Switch { yes: true }))
    }
}
