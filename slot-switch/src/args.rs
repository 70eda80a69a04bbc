use clap::{
    Parser, Subcommand, ValueEnum,
    builder::{Styles, styling::AnsiColor},
};

#[derive(Debug, Parser)]
#[clap(
    version,
    about,
    long_about = "Shows the A/B boot slot state of this device through bootctl and \
                  switches to the other slot. Requires root.",
    styles = clap_v3_styles(),
)]
pub struct Args {
    /// How commands are run as superuser.
    #[clap(long, env = "SLOT_SWITCH_BACKEND", value_enum, default_value_t = Backend::Session)]
    pub backend: Backend,
    /// The su binary used to obtain root.
    #[clap(long, env = "SLOT_SWITCH_SU", default_value = "su")]
    pub su: String,
    /// Name or path of the boot control utility.
    #[clap(long, env = "SLOT_SWITCH_BOOTCTL", default_value = "bootctl")]
    pub bootctl: String,
    /// Seconds to wait for superuser access to be granted.
    #[clap(long, env = "SLOT_SWITCH_ROOT_TIMEOUT", default_value_t = 30)]
    pub root_timeout: u64,
    #[command(subcommand)]
    pub subcmd: Option<Commands>,
}

#[derive(Debug, Clone, Copy, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Print the boot slot state (default).
    #[command(name = "status", short_flag = 's')]
    Status,
    /// Activate the other slot and reboot into it.
    #[command(name = "switch")]
    Switch {
        /// Do not ask for confirmation.
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Backend {
    /// One `su` shell for the whole run.
    Session,
    /// A new `su -c` process per command.
    Oneshot,
}

fn clap_v3_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Green.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}
