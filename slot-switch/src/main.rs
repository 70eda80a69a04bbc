use clap::Parser;
use color_eyre::eyre::Result;
use slot_switch::{
    args::Args,
    layout::Getprop,
    operator::Terminal,
    program::{self, Deps, Outcome},
    settings::Settings,
};
use std::{process::ExitCode, sync::Arc};
use tracing::{info, level_filters::LevelFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    // stdout is for the operator, keep stderr quiet unless asked for
    let tel_flusher = slot_switch_telemetry::TelemetryConfig::new()
        .with_default_level(LevelFilter::WARN)
        .init();

    let args = Args::parse();
    let result = run(&args).await;
    tel_flusher.flush().await;
    result
}

async fn run(args: &Args) -> Result<ExitCode> {
    info!("starting slot-switch: {:?}", args);

    let settings = Settings::from_args(args);
    let root = settings.root_provider();
    let deps = Deps {
        props: Arc::new(Getprop),
        root,
        operator: Box::new(Terminal {
            assume_yes: args.assume_yes(),
        }),
        settings,
    };

    match program::run(&deps, args.action()).await? {
        Outcome::Unsupported(_) => Ok(ExitCode::FAILURE),
        Outcome::Status(_) => Ok(ExitCode::SUCCESS),
        Outcome::Declined(_) => {
            println!("Nothing was changed.");
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Switched { from, to } => {
            println!("Switched from slot {from} to slot {to}, rebooting.");
            Ok(ExitCode::SUCCESS)
        }
    }
}
