//! Read-only `bootctl` queries.

use crate::{Channel, Command, Error, Result, SlotLabel, channel::ordinal};
use std::{fmt, str::FromStr};
use tracing::info;

/// Snapshot of the boot slot state as reported by `bootctl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootState {
    pub hal_info: String,
    pub slot_count: u32,
    pub current_slot_index: u32,
    pub current_slot_suffix: String,
}

impl BootState {
    pub fn current_slot(&self) -> Result<SlotLabel> {
        SlotLabel::from_index(self.current_slot_index, self.slot_count)
    }

    /// The slot a switch would activate. Only defined on two-slot devices.
    pub fn target_slot(&self) -> Result<SlotLabel> {
        if self.slot_count != 2 {
            return Err(Error::UnsupportedSlotCount {
                slot_count: self.slot_count,
                current: self.current_slot_index,
            });
        }

        Ok(self.current_slot()?.other())
    }
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HAL info: {}", self.hal_info)?;
        writeln!(f, "Number of slots: {}", self.slot_count)?;
        match self.current_slot() {
            Ok(label) => writeln!(f, "Current slot: {label}")?,
            Err(_) => writeln!(f, "Current slot: #{}", self.current_slot_index)?,
        }
        write!(f, "Current slot suffix: {}", self.current_slot_suffix)
    }
}

/// Issues the four queries in order. Nothing else is sent once one of them
/// fails.
#[tracing::instrument(skip_all)]
pub async fn read(channel: &mut Channel, bootctl: &str) -> Result<BootState> {
    let hal_info = query(channel, Command::bootctl(ordinal::HAL_INFO, bootctl, "hal-info"))
        .await?;

    let slot_count: u32 = query_number(
        channel,
        Command::bootctl(ordinal::NUMBER_SLOTS, bootctl, "get-number-slots"),
    )
    .await?;
    if slot_count == 0 {
        return Err(Error::Parse {
            command: format!("{bootctl} get-number-slots"),
            output: slot_count.to_string(),
        });
    }

    let current_slot_index: u32 = query_number(
        channel,
        Command::bootctl(ordinal::CURRENT_SLOT, bootctl, "get-current-slot"),
    )
    .await?;

    let current_slot_suffix = query(
        channel,
        Command::bootctl(
            ordinal::SUFFIX,
            bootctl,
            format!("get-suffix {current_slot_index}"),
        ),
    )
    .await?;

    let state = BootState {
        hal_info,
        slot_count,
        current_slot_index,
        current_slot_suffix,
    };
    info!(?state, "boot state read");

    Ok(state)
}

/// First line of the command's output.
async fn query(channel: &mut Channel, cmd: Command) -> Result<String> {
    let output = channel.run(&cmd).await?;
    if !output.success {
        return Err(Error::CommandFailed {
            command: cmd.text,
            output: output.lines.join("\n"),
        });
    }

    match output.first_line() {
        Some(line) => Ok(line.to_owned()),
        None => Err(Error::Parse {
            command: cmd.text,
            output: output.lines.join("\n"),
        }),
    }
}

async fn query_number<T: FromStr>(channel: &mut Channel, cmd: Command) -> Result<T> {
    let text = cmd.text.clone();
    let line = query(channel, cmd).await?;

    line.trim().parse().map_err(|_| Error::Parse {
        command: text,
        output: line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(slot_count: u32, current_slot_index: u32) -> BootState {
        BootState {
            hal_info: "hal".into(),
            slot_count,
            current_slot_index,
            current_slot_suffix: "_a".into(),
        }
    }

    #[test]
    fn target_is_the_other_slot() {
        assert_eq!(state(2, 0).target_slot().unwrap(), SlotLabel::B);
        assert_eq!(state(2, 1).target_slot().unwrap(), SlotLabel::A);
    }

    #[test]
    fn no_target_without_exactly_two_slots() {
        assert!(matches!(
            state(3, 0).target_slot(),
            Err(Error::UnsupportedSlotCount { slot_count: 3, .. })
        ));
        assert!(state(1, 0).target_slot().is_err());
    }

    #[test]
    fn displays_slot_label() {
        let shown = state(2, 1).to_string();
        assert!(shown.contains("Current slot: B"));
        assert!(shown.contains("Number of slots: 2"));
    }
}
