use std::path::Path;

use converge_common::config::{Config, DeployConfig};
use converge_core::Outcome;

use crate::commands::{HostArgs, WatchArgs, summary};
use crate::terminal::print;
use crate::terminal::spinner::{SpinnerSink, StepTracker};

const STEPS: usize = 9;

pub async fn deploy(
    host: &HostArgs,
    watch: &WatchArgs,
    user_data: &Path,
    force: bool,
    cfg: &Config,
    tracker: StepTracker,
) -> anyhow::Result<()> {
    print::header("re-provisioning", cfg.quiet);

    let config = DeployConfig {
        watch: watch.config(),
        force,
        ..DeployConfig::default()
    };
    let orchestrator = host.orchestrator(config);
    let target = host.target();

    let outcome: Outcome = {
        let mut sink = SpinnerSink::new(cfg.quiet, STEPS, tracker);
        orchestrator.deploy(&target, user_data, &mut sink).await?
    };

    summary::outcome(&outcome, cfg);
    Ok(())
}
