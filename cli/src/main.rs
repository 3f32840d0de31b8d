mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, check, deploy, watch};
use converge_common::config::Config;
use converge_common::{error, info, warn};
use converge_core::Step;
use terminal::spinner::StepTracker;
use terminal::{logging, print};

/// Conventional status for a process ended by SIGINT.
const INTERRUPTED: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    let cfg = Config {
        quiet: commands.quiet,
        verbose: commands.verbose,
    };

    logging::init(&cfg);
    print::banner(cfg.quiet);

    let tracker = StepTracker::default();

    tokio::select! {
        result = run(&commands.command, &cfg, tracker.clone()) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            interrupted(&commands.command, tracker.current());
            ExitCode::from(INTERRUPTED)
        }
    }
}

async fn run(command: &Commands, cfg: &Config, tracker: StepTracker) -> anyhow::Result<()> {
    match command {
        Commands::Deploy {
            host,
            watch: args,
            user_data,
            yes,
        } => deploy::deploy(host, args, user_data, *yes, cfg, tracker).await,
        Commands::Watch { host, watch: args } => watch::watch(host, args, cfg, tracker).await,
        Commands::Check { host } => check::check(host, cfg).await,
    }
}

/// Nothing is undone remotely. Once cloud-init was reset the host keeps
/// provisioning on its own, so watching is enough to pick the run back up.
fn interrupted(command: &Commands, step: Option<Step>) {
    let target: String = command.host().target.to_string();

    match step {
        Some(step) => warn!("Interrupted during: {step}"),
        None => warn!("Interrupted"),
    }

    let resume: String = match (command, step) {
        (Commands::Deploy { .. }, None | Some(Step::Verify | Step::Confirm | Step::Upload)) => {
            "rerun the same deploy command".to_string()
        }
        (Commands::Check { .. }, _) => format!("converge check {target}"),
        _ => format!("converge watch {target}"),
    };
    info!("next: {resume}");
}
