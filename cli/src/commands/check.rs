use converge_common::config::{Config, DeployConfig};
use converge_core::orchestrator::Inspection;

use crate::commands::{HostArgs, summary};
use crate::terminal::{format, print};

pub async fn check(host: &HostArgs, cfg: &Config) -> anyhow::Result<()> {
    print::header("checking host", cfg.quiet);

    let orchestrator = host.orchestrator(DeployConfig::default());
    let inspection: Inspection = orchestrator.inspect(&host.target()).await?;

    print::align_keys(&["Address", "Status"]);
    for resolved in &inspection.addresses {
        print::aligned_line(
            "Address",
            format!(
                "{} ({})",
                format::address(&resolved.address, resolved.kind),
                resolved.kind
            ),
        );
    }
    print::aligned_line("Status", format::state(&inspection.state));

    summary::health(inspection.health.as_ref(), cfg);
    Ok(())
}
