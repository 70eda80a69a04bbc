//! Query and switch the active boot slot of an Android A/B device.
//!
//! The pipeline for one run is:
//! [`layout`] → [`gate`] → [`boot_state`] → [`operator`] → [`switcher`],
//! orchestrated by [`program::run`]. Every privileged command goes through a
//! single [`channel::Channel`] backed by one of the [`shell`] implementations.

#![allow(clippy::missing_errors_doc)]

use derive_more::Display;
use std::time::Duration;

pub mod args;
pub mod boot_state;
pub mod channel;
pub mod gate;
pub mod layout;
pub mod operator;
pub mod program;
pub mod settings;
pub mod shell;
pub mod switcher;
pub mod test_utils;

pub use boot_state::BootState;
pub use channel::{Channel, Command};
pub use gate::{Gated, SupportVerdict, UnsupportedReason};
pub use layout::PartitionLayout;

/// First API level with seamless (A/B) updates, Android 7.1.
pub const MIN_API_LEVEL: u32 = 25;

/// Errors raised while talking to the privileged channel.
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("no su binary found on this device")]
    RootUnavailable,
    #[error("superuser access was denied")]
    RootDenied,
    #[error("timed out after {0:?} waiting for superuser access")]
    Timeout(Duration),
    #[error("channel i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("channel is closed")]
    Closed,
    #[error("command #{ordinal} issued after command #{last}")]
    OutOfOrder { ordinal: u32, last: u32 },
    #[error("command #{ordinal} is not marked privileged")]
    Unprivileged { ordinal: u32 },
}

/// Error definition for library.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("`{command}` failed: {output}")]
    CommandFailed { command: String, output: String },
    #[error("unexpected output from `{command}`: {output:?}")]
    Parse { command: String, output: String },
    #[error("failed to queue `{command}`: {reason}")]
    Mutation { command: String, reason: String },
    #[error("unsupported slot layout: {slot_count} slot(s), current slot index {current}")]
    UnsupportedSlotCount { slot_count: u32, current: u32 },
    #[error("reading system properties failed: {0}")]
    Properties(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;

// Slots.
const SLOT_A: u32 = 0;
const SLOT_B: u32 = 1;

/// Representation of the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SlotLabel {
    /// The Slot A is represented as 0.
    #[display("A")]
    A,
    /// The Slot B is represented as 1.
    #[display("B")]
    B,
}

impl SlotLabel {
    /// Maps a `bootctl` slot index to its label. Only two-slot devices are
    /// supported, so anything but 0 and 1 is rejected.
    pub fn from_index(index: u32, slot_count: u32) -> Result<Self> {
        match index {
            SLOT_A => Ok(SlotLabel::A),
            SLOT_B => Ok(SlotLabel::B),
            current => Err(Error::UnsupportedSlotCount {
                slot_count,
                current,
            }),
        }
    }

    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            SlotLabel::A => SLOT_A,
            SlotLabel::B => SLOT_B,
        }
    }

    /// The slot that is not `self`.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            SlotLabel::A => SlotLabel::B,
            SlotLabel::B => SlotLabel::A,
        }
    }
}
