//! Partition layout detection from Android system properties.
//!
//! * `ro.boot.slot_suffix` - set by the bootloader on conventional A/B devices
//! * `ro.virtual_ab.enabled` - `true` on devices using virtual A/B
//! * `ro.build.version.sdk` - API level of the running OS
//!
//! None of these need superuser access.

use crate::Result;
use derive_more::Display;
use std::{collections::HashMap, fmt, process::Command, sync::Arc};
use tracing::debug;

pub const PROP_SLOT_SUFFIX: &str = "ro.boot.slot_suffix";
pub const PROP_VIRTUAL_AB: &str = "ro.virtual_ab.enabled";
pub const PROP_SDK: &str = "ro.build.version.sdk";

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionLayout {
    #[display("non-A/B")]
    NonAB,
    #[display("conventional A/B")]
    ConventionalAB,
    #[display("virtual A/B")]
    VirtualAB,
}

/// Read-only access to system properties.
///
/// A property that does not exist, or cannot be read, is `None`.
pub trait PropertySource: Send + Sync + fmt::Debug {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads properties through the `getprop` utility.
#[derive(Debug, Default)]
pub struct Getprop;

impl PropertySource for Getprop {
    fn get(&self, name: &str) -> Option<String> {
        let output = Command::new("getprop").arg(name).output().ok()?;
        if !output.status.success() {
            debug!("getprop {name} exited with {}", output.status);
            return None;
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!value.is_empty()).then_some(value)
    }
}

impl PropertySource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Classifies the partition layout of the running device.
pub fn detect(props: &dyn PropertySource) -> PartitionLayout {
    let conventional = props
        .get(PROP_SLOT_SUFFIX)
        .is_some_and(|suffix| !suffix.trim().is_empty());
    let is_virtual = props
        .get(PROP_VIRTUAL_AB)
        .is_some_and(|enabled| enabled.trim() == "true");

    let layout = match (conventional, is_virtual) {
        (true, _) => PartitionLayout::ConventionalAB,
        (false, true) => PartitionLayout::VirtualAB,
        (false, false) => PartitionLayout::NonAB,
    };
    debug!(conventional, is_virtual, %layout, "detected partition layout");

    layout
}

/// API level of the running OS, 0 when it cannot be determined.
pub fn api_level(props: &dyn PropertySource) -> u32 {
    props
        .get(PROP_SDK)
        .and_then(|sdk| sdk.trim().parse().ok())
        .unwrap_or(0)
}

/// Runs `f` on the blocking pool. [`Getprop`] waits on a child process.
pub async fn query_blocking<T, F>(props: &Arc<dyn PropertySource>, f: F) -> Result<T>
where
    F: FnOnce(&dyn PropertySource) -> T + Send + 'static,
    T: Send + 'static,
{
    let props = Arc::clone(props);
    let value = tokio::task::spawn_blocking(move || f(props.as_ref())).await?;

    Ok(value)
}
