//! The irreversible part: activate the other slot and reboot into it.

use crate::{Channel, Command, Error, Result, SlotLabel, channel::ordinal};
use tracing::{info, warn};

/// Graceful reboot through the power manager, forced reboot if `svc` cannot
/// be invoked.
pub const REBOOT_CMD: &str = "svc power reboot || reboot";

/// Marks the complement of `current_slot_index` active, queues a reboot and
/// closes the channel.
///
/// If activating the slot fails the reboot is never queued, so the device
/// stays on the slot it is running from. The reboot itself is not awaited.
#[tracing::instrument(skip(channel))]
pub async fn switch_slot(
    channel: &mut Channel,
    bootctl: &str,
    current_slot_index: u32,
) -> Result<SlotLabel> {
    let target = SlotLabel::from_index(current_slot_index, 2)?.other();

    let set_active = Command::bootctl(
        ordinal::SET_ACTIVE_SLOT,
        bootctl,
        format!("set-active-boot-slot {}", target.index()),
    );
    info!("activating slot {target}");
    match channel.run(&set_active).await {
        Ok(out) if out.success => {}
        Ok(out) => {
            return Err(Error::Mutation {
                command: set_active.text,
                reason: out.lines.join("\n"),
            });
        }
        Err(e) => {
            return Err(Error::Mutation {
                command: set_active.text,
                reason: e.to_string(),
            });
        }
    }

    let reboot = Command::privileged(ordinal::REBOOT, REBOOT_CMD);
    if let Err(e) = channel.queue(&reboot).await {
        warn!("slot {target} is active but the reboot could not be queued");
        return Err(Error::Mutation {
            command: reboot.text,
            reason: e.to_string(),
        });
    }

    channel.close().await;
    info!("rebooting into slot {target}");

    Ok(target)
}
