//! Whoever is in front of the device: gets told about the state and has the
//! last word before the slot is switched.

use crate::{BootState, MIN_API_LEVEL, SlotLabel, UnsupportedReason};
use async_trait::async_trait;
use color_eyre::eyre::{Context as _, Result};

#[async_trait]
pub trait Operator: Send + Sync {
    /// The device failed the capability gate. The run ends after this.
    async fn unsupported(&self, reason: UnsupportedReason);

    /// All four boot state queries completed.
    async fn state_ready(&self, state: &BootState);

    /// Asked exactly once, before anything is written.
    async fn confirm_switch(&self, from: SlotLabel, to: SlotLabel) -> Result<bool>;
}

/// Human readable explanation of why the device is unsupported.
pub fn reason_text(reason: UnsupportedReason) -> String {
    match reason {
        UnsupportedReason::MinApiNotMet => format!(
            "Android 7.1 (API level {MIN_API_LEVEL}) or newer is required, older \
             versions have no seamless updates."
        ),
        UnsupportedReason::NoABPartitions => {
            "This device has no A/B partitions, neither conventional nor virtual."
                .to_string()
        }
        UnsupportedReason::RootUnavailable => {
            "Root access is required but no su binary was found.".to_string()
        }
        UnsupportedReason::RootDenied => {
            "Superuser access was denied. Grant it and try again.".to_string()
        }
        UnsupportedReason::BootctlMissing => {
            "The bootctl utility is not available on this device.".to_string()
        }
    }
}

/// Prints to stdout and prompts on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal {
    pub assume_yes: bool,
}

#[async_trait]
impl Operator for Terminal {
    async fn unsupported(&self, reason: UnsupportedReason) {
        println!("Device not supported: {}", reason_text(reason));
    }

    async fn state_ready(&self, state: &BootState) {
        println!("{state}");
    }

    async fn confirm_switch(&self, from: SlotLabel, to: SlotLabel) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        let prompt = format!(
            "Switch from slot {from} to slot {to}? The device reboots right away."
        );
        tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await?
        .wrap_err("failed to get confirmation")
    }
}
