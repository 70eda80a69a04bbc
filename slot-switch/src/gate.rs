//! Decides whether this device can have its boot slot switched.
//!
//! Checks run from cheapest to most expensive and stop at the first failure:
//! API level, partition layout, `su` presence, superuser grant, `bootctl`.

use crate::{
    Channel, ChannelError, Command, Result,
    channel::ordinal,
    layout::{self, PartitionLayout, PropertySource},
    shell::RootProvider,
};
use derive_more::Display;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    #[display("API level too old for seamless updates")]
    MinApiNotMet,
    #[display("no A/B partitions")]
    NoABPartitions,
    #[display("root is not available")]
    RootUnavailable,
    #[display("root access denied")]
    RootDenied,
    #[display("bootctl is missing")]
    BootctlMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportVerdict {
    Supported,
    Unsupported(UnsupportedReason),
}

/// Outcome of the gate. The opened channel only exists for a supported device.
#[derive(Debug)]
pub enum Gated {
    Supported(Channel),
    Unsupported(UnsupportedReason),
}

impl Gated {
    pub fn verdict(&self) -> SupportVerdict {
        match self {
            Gated::Supported(_) => SupportVerdict::Supported,
            Gated::Unsupported(reason) => SupportVerdict::Unsupported(*reason),
        }
    }
}

#[derive(Debug)]
pub struct CapabilityGate<'a> {
    props: Arc<dyn PropertySource>,
    root: &'a dyn RootProvider,
    bootctl: &'a str,
}

impl<'a> CapabilityGate<'a> {
    pub fn new(
        props: Arc<dyn PropertySource>,
        root: &'a dyn RootProvider,
        bootctl: &'a str,
    ) -> Self {
        Self {
            props,
            root,
            bootctl,
        }
    }

    /// Runs all checks. A root `Timeout` or i/o failure while opening the
    /// channel is an error, not a verdict.
    #[tracing::instrument(skip(self))]
    pub async fn check_support(
        &self,
        min_api_level: u32,
        actual_api_level: u32,
    ) -> Result<Gated> {
        let gated = self.evaluate(min_api_level, actual_api_level).await?;
        match &gated {
            Gated::Supported(_) => info!("device supported"),
            Gated::Unsupported(reason) => warn!("device unsupported: {reason}"),
        }

        Ok(gated)
    }

    async fn evaluate(&self, min_api_level: u32, actual_api_level: u32) -> Result<Gated> {
        use UnsupportedReason::*;

        if actual_api_level < min_api_level {
            return Ok(Gated::Unsupported(MinApiNotMet));
        }

        let layout = layout::query_blocking(&self.props, layout::detect).await?;
        if layout == PartitionLayout::NonAB {
            return Ok(Gated::Unsupported(NoABPartitions));
        }
        info!(%layout, "A/B device");

        if !self.root.is_root_available() {
            return Ok(Gated::Unsupported(RootUnavailable));
        }

        let shell = match self.root.open().await {
            Ok(shell) => shell,
            Err(ChannelError::RootUnavailable) => {
                return Ok(Gated::Unsupported(RootUnavailable));
            }
            Err(ChannelError::RootDenied) => return Ok(Gated::Unsupported(RootDenied)),
            Err(e) => return Err(e.into()),
        };
        let mut channel = Channel::new(shell);

        let probe = Command::privileged(
            ordinal::PROBE_BOOTCTL,
            format!("command -v {}", self.bootctl),
        );
        let found = match channel.run(&probe).await {
            Ok(out) => out.success && out.first_line().is_some(),
            Err(e) => {
                channel.close().await;
                return Err(e.into());
            }
        };
        if !found {
            channel.close().await;
            return Ok(Gated::Unsupported(BootctlMissing));
        }

        Ok(Gated::Supported(channel))
    }
}
