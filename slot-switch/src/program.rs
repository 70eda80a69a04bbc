use crate::{
    BootState, Channel, Gated, MIN_API_LEVEL, SlotLabel, UnsupportedReason, boot_state,
    gate::CapabilityGate,
    layout::{self, PropertySource},
    operator::Operator,
    settings::Settings,
    shell::RootProvider,
    switcher,
};
use color_eyre::Result;
use std::sync::Arc;
use tracing::info;

/// Dependencies of one run.
pub struct Deps {
    pub props: Arc<dyn PropertySource>,
    pub root: Box<dyn RootProvider>,
    pub operator: Box<dyn Operator>,
    pub settings: Settings,
}

impl Deps {
    pub fn new<P, R, O>(props: P, root: R, operator: O, settings: Settings) -> Self
    where
        P: PropertySource + 'static,
        R: RootProvider + 'static,
        O: Operator + 'static,
    {
        Self {
            props: Arc::new(props),
            root: Box::new(root),
            operator: Box::new(operator),
            settings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Status,
    Switch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unsupported(UnsupportedReason),
    Status(BootState),
    /// The operator did not confirm, nothing was written.
    Declined(BootState),
    /// The slot was activated and the reboot queued.
    Switched { from: SlotLabel, to: SlotLabel },
}

pub async fn run(deps: &Deps, action: Action) -> Result<Outcome> {
    let api_level = layout::query_blocking(&deps.props, layout::api_level).await?;
    let gate = CapabilityGate::new(
        Arc::clone(&deps.props),
        deps.root.as_ref(),
        &deps.settings.bootctl,
    );

    let mut channel = match gate.check_support(MIN_API_LEVEL, api_level).await? {
        Gated::Supported(channel) => channel,
        Gated::Unsupported(reason) => {
            deps.operator.unsupported(reason).await;
            return Ok(Outcome::Unsupported(reason));
        }
    };

    let result = with_channel(deps, action, &mut channel).await;
    channel.close().await;

    result
}

async fn with_channel(
    deps: &Deps,
    action: Action,
    channel: &mut Channel,
) -> Result<Outcome> {
    let bootctl = &deps.settings.bootctl;

    let state = boot_state::read(channel, bootctl).await?;
    deps.operator.state_ready(&state).await;

    if action == Action::Status {
        return Ok(Outcome::Status(state));
    }

    let from = state.current_slot()?;
    let to = state.target_slot()?;
    if !deps.operator.confirm_switch(from, to).await? {
        info!("switch from slot {from} to slot {to} declined");
        return Ok(Outcome::Declined(state));
    }

    switcher::switch_slot(channel, bootctl, state.current_slot_index).await?;

    Ok(Outcome::Switched { from, to })
}
