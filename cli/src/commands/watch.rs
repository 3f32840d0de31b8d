use converge_common::config::{Config, DeployConfig};
use converge_core::Outcome;

use crate::commands::{HostArgs, WatchArgs, summary};
use crate::terminal::print;
use crate::terminal::spinner::{SpinnerSink, StepTracker};

/// Converge, health check and report.
const STEPS: usize = 3;

pub async fn watch(
    host: &HostArgs,
    watch: &WatchArgs,
    cfg: &Config,
    tracker: StepTracker,
) -> anyhow::Result<()> {
    print::header("watching provisioning", cfg.quiet);

    let config = DeployConfig {
        watch: watch.config(),
        ..DeployConfig::default()
    };
    let orchestrator = host.orchestrator(config);

    let outcome: Outcome = {
        let mut sink = SpinnerSink::new(cfg.quiet, STEPS, tracker);
        orchestrator.watch(&host.target(), &mut sink).await?
    };

    summary::outcome(&outcome, cfg);
    Ok(())
}
