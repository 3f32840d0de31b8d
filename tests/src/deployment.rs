use std::path::{Path, PathBuf};
use std::time::Duration;

use converge_common::config::{DeployConfig, WatchConfig};
use converge_common::error::DeployError;
use converge_common::network::address::AddressKind;
use converge_core::commands::{self, PROBE, RESET};
use converge_core::{Orchestrator, Outcome, Step};
use converge_protocols::status::ConvergenceState;

use crate::support::{
    FakeDirectory, FakeHost, FakeOperator, MESH, PUBLIC, RecordingSink, Tick, target,
};

/// Any existing file will do; its content is opaque to the orchestrator.
fn user_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml")
}

fn orchestrator(
    host: &FakeHost,
    directory: &FakeDirectory,
    operator: &FakeOperator,
    config: DeployConfig,
) -> Orchestrator {
    Orchestrator::new(
        Box::new(host.clone()),
        Box::new(directory.clone()),
        Box::new(operator.clone()),
        config,
    )
}

/// The first tick is the one the reconnect probe lands on.
fn provisioning() -> Vec<Tick> {
    vec![
        Tick::not_started(),
        Tick::running().with_lines(&["Cloud-init v. 24.1 running 'modules:config'"]),
        Tick::done().with_lines(&["Cloud-init v. 24.1 finished"]),
    ]
}

#[tokio::test(start_paused = true)]
async fn deploys_a_fresh_host() {
    let host = FakeHost::ready(provisioning());
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(false);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());
    let mut sink = RecordingSink::default();

    let outcome = orchestrator
        .deploy(&target(), &user_data(), &mut sink)
        .await
        .unwrap();

    let Outcome::Converged(report) = outcome else {
        panic!("expected convergence, got {outcome:?}");
    };
    assert_eq!(report.primary_address, PUBLIC);
    assert_eq!(report.mesh_address, None);
    assert_eq!(report.service_url, "https://203.0.113.7:6443");
    assert!(report.health.as_ref().is_some_and(|health| health.passed()));

    assert_eq!(operator.asked(), 0);
    assert_eq!(
        host.uploads(),
        vec![(user_data(), commands::STAGING_PATH.to_string())]
    );
    assert_eq!(host.resets(), 1);
    assert_eq!(sink.lines, host.log());
    assert_eq!(
        sink.steps,
        vec![
            Step::Verify,
            Step::Confirm,
            Step::Upload,
            Step::Reset,
            Step::AwaitReboot,
            Step::Reconnect,
            Step::Converge,
            Step::HealthCheck,
            Step::Report,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn declining_reprovisioning_changes_nothing() {
    let host = FakeHost::ready(provisioning()).provisioned();
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(false);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());

    let outcome = orchestrator
        .deploy(&target(), &user_data(), &mut RecordingSink::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Aborted);
    assert_eq!(operator.asked(), 1);
    assert!(host.uploads().is_empty());
    assert_eq!(host.resets(), 0);
    assert!(host.is_provisioned());
}

#[tokio::test(start_paused = true)]
async fn confirming_reprovisioning_proceeds() {
    let host = FakeHost::ready(provisioning()).provisioned();
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(true);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());

    let outcome = orchestrator
        .deploy(&target(), &user_data(), &mut RecordingSink::default())
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Converged(_)));
    assert_eq!(operator.asked(), 1);
    assert_eq!(host.resets(), 1);
}

#[tokio::test(start_paused = true)]
async fn deploying_twice_is_idempotent() {
    let host = FakeHost::ready(provisioning());
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(false);
    let config = DeployConfig {
        force: true,
        ..DeployConfig::default()
    };
    let orchestrator = orchestrator(&host, &directory, &operator, config);

    let first = orchestrator
        .deploy(&target(), &user_data(), &mut RecordingSink::default())
        .await
        .unwrap();
    assert!(host.is_provisioned());
    let second = orchestrator
        .deploy(&target(), &user_data(), &mut RecordingSink::default())
        .await
        .unwrap();

    let (Outcome::Converged(first), Outcome::Converged(second)) = (first, second) else {
        panic!("both runs should converge");
    };
    assert_eq!(first.primary_address, second.primary_address);
    assert_eq!(first.mesh_address, second.mesh_address);
    assert_eq!(first.service_url, second.service_url);
    assert_eq!(operator.asked(), 0);
    assert_eq!(host.resets(), 2);
    assert_eq!(host.uploads().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn public_address_lost_after_reboot_recovers_over_mesh() {
    let mut script: Vec<Tick> = vec![Tick::running().mesh_only(); 18];
    script.push(Tick::running().mesh_only().with_lines(&["joined tailnet"]));
    script.push(Tick::done().mesh_only());

    let host = FakeHost::ready(script).with_reboot(1, 1);
    let directory = FakeDirectory::appears_on_query(1);
    let operator = FakeOperator::answering(false);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());
    let mut sink = RecordingSink::default();

    let outcome = orchestrator
        .deploy(&target(), &user_data(), &mut sink)
        .await
        .unwrap();

    let report = outcome.report().unwrap();
    assert_eq!(report.mesh_address.as_deref(), Some(MESH));
    assert_eq!(report.service_url, format!("https://{MESH}:6443"));
    assert_eq!(sink.switches.len(), 1);
    assert_eq!(sink.lines, vec!["joined tailnet"]);
    // Reconnect budget with the mesh enabled, then the poller's six.
    assert_eq!(host.count_on(PUBLIC, PROBE), 1 + 1 + 1 + 12 + 6);
}

#[tokio::test(start_paused = true)]
async fn reconnect_without_mesh_times_out() {
    let host = FakeHost::ready(provisioning()).with_reboot(1, 1_000);
    let directory = FakeDirectory::appears_on_query(1);
    let operator = FakeOperator::answering(false);
    let config = DeployConfig {
        watch: WatchConfig {
            mesh_enabled: false,
            ..WatchConfig::default()
        },
        ..DeployConfig::default()
    };
    let orchestrator = orchestrator(&host, &directory, &operator, config);

    let err = orchestrator
        .deploy(&target(), &user_data(), &mut RecordingSink::default())
        .await
        .unwrap_err();

    match err {
        DeployError::Timeout {
            operation, elapsed, ..
        } => {
            assert!(operation.contains("reconnect"));
            assert_eq!(elapsed, Duration::from_secs(59 * 5));
        }
        other => panic!("expected a timeout, got {other}"),
    }
    assert_eq!(directory.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn reboot_never_observed_is_not_fatal() {
    let host = FakeHost::ready(vec![Tick::done()]).with_reboot(31, 1);
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(false);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());

    let outcome = orchestrator
        .deploy(&target(), &user_data(), &mut RecordingSink::default())
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Converged(_)));
}

#[tokio::test(start_paused = true)]
async fn missing_user_data_fails_before_touching_the_host() {
    let host = FakeHost::ready(provisioning());
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(true);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());

    let err = orchestrator
        .deploy(
            &target(),
            Path::new("/nonexistent/user-data.yaml"),
            &mut RecordingSink::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::BootConfig { .. }));
    assert!(host.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unreachable_host_is_fatal_at_verification() {
    let host = FakeHost::converging(vec![Tick::dark()]);
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(true);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());

    let err = orchestrator
        .deploy(&target(), &user_data(), &mut RecordingSink::default())
        .await
        .unwrap_err();

    match &err {
        DeployError::Unreachable { destination, .. } => {
            assert_eq!(destination, "root@203.0.113.7")
        }
        other => panic!("expected unreachable, got {other}"),
    }
    assert!(err.to_string().contains("next: ssh -v root@203.0.113.7 true"));
    assert_eq!(host.count(RESET), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_health_check_does_not_change_the_outcome() {
    let host = FakeHost::converging(vec![Tick::done()]).with_health("FAIL etcd quorum", 3);
    let directory = FakeDirectory::never();
    let operator = FakeOperator::answering(false);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());
    let mut sink = RecordingSink::default();

    let outcome = orchestrator.watch(&target(), &mut sink).await.unwrap();

    let Outcome::Converged(report) = outcome else {
        panic!("expected convergence, got {outcome:?}");
    };
    let health = report.health.unwrap();
    assert!(!health.passed());
    assert_eq!(health.output, "FAIL etcd quorum");
    assert_eq!(sink.steps, vec![Step::Converge, Step::HealthCheck, Step::Report]);
    assert_eq!(host.resets(), 0);
}

#[tokio::test(start_paused = true)]
async fn inspect_lists_every_address() {
    let host = FakeHost::converging(vec![Tick::running()]);
    let directory = FakeDirectory::appears_on_query(1);
    let operator = FakeOperator::answering(false);
    let orchestrator = orchestrator(&host, &directory, &operator, DeployConfig::default());

    let inspection = orchestrator.inspect(&target()).await.unwrap();

    let kinds: Vec<(&str, AddressKind)> = inspection
        .addresses
        .iter()
        .map(|resolved| (resolved.address.as_str(), resolved.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![(PUBLIC, AddressKind::Public), (MESH, AddressKind::Mesh)]
    );
    assert_eq!(inspection.state, ConvergenceState::NotStarted);
    assert!(inspection.health.is_some());
}
