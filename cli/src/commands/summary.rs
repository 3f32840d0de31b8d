use colored::*;
use converge_common::config::Config;
use converge_common::network::address::AddressKind;
use converge_common::{success, warn};
use converge_core::{AccessReport, HealthReport, Outcome};

use crate::cprint;
use crate::terminal::{colors, format, print};

pub fn outcome(outcome: &Outcome, cfg: &Config) {
    match outcome {
        Outcome::Aborted => {}
        Outcome::Converged(report) => finished(report, "Provisioning complete".green().bold(), cfg),
        Outcome::ConvergedWithWarnings(report) => finished(
            report,
            "Provisioning complete with recoverable errors".yellow().bold(),
            cfg,
        ),
    }
}

fn finished(report: &AccessReport, verdict: ColoredString, cfg: &Config) {
    health(report.health.as_ref(), cfg);

    print::header("access", cfg.quiet);
    print::align_keys(&["Public", "Mesh", "Service"]);
    print::aligned_line(
        "Public",
        format::address(&report.primary_address, AddressKind::Public),
    );
    if let Some(mesh) = &report.mesh_address {
        print::aligned_line("Mesh", format::address(mesh, AddressKind::Mesh));
    }
    print::aligned_line("Service", report.service_url.color(colors::ACCENT));

    let total_time: ColoredString = format::elapsed(report.elapsed).bold().yellow();
    let output: String = format!("{verdict} in {total_time}")
        .color(colors::TEXT_DEFAULT)
        .to_string();

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => {
            cprint!();
            success!("{}", output)
        }
    }
}

pub fn health(report: Option<&HealthReport>, cfg: &Config) {
    let Some(report) = report else {
        return;
    };

    print::header("health check", cfg.quiet);
    if !report.output.is_empty() {
        print::as_block("Output", &report.output);
    }
    if report.passed() {
        success!("Health check passed");
    } else {
        warn!("Health check exited {}", report.exit_code);
    }
}
