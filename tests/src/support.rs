//! A scripted VM, a scripted mesh directory and friends.
//!
//! The fake host goes through the same phases a real one does: it answers on
//! its public address until cloud-init is reset, disappears for a reboot and
//! then follows a script of [`Tick`]s, one per connectivity probe.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use converge_common::config::WatchConfig;
use converge_common::error::ConnectivityError;
use converge_common::network::target::Target;
use converge_core::directory::MeshDirectory;
use converge_core::resolver::AddressResolver;
use converge_core::switch::NetworkSwitch;
use converge_core::{CommandOutput, ConvergencePoller, Operator, ProgressSink, RemoteChannel, Step};
use converge_protocols::status::ConvergenceState;
use tokio::time::sleep;

pub const PUBLIC: &str = "203.0.113.7";
pub const MESH: &str = "100.101.102.103";
pub const HOSTNAME: &str = "edge-01";

/// What the host looks like between two probes.
#[derive(Debug, Clone)]
pub struct Tick {
    pub public: bool,
    pub mesh: bool,
    pub status: String,
    /// The probe answers but the status query never gets through.
    pub status_lost: bool,
    /// Appended to the install log when the tick starts.
    pub lines: Vec<String>,
}

impl Tick {
    pub fn status(status: &str) -> Self {
        Self {
            public: true,
            mesh: false,
            status: status.to_string(),
            status_lost: false,
            lines: Vec::new(),
        }
    }

    pub fn not_started() -> Self {
        Self::status("status: not started")
    }

    pub fn running() -> Self {
        Self::status("status: running")
    }

    pub fn done() -> Self {
        Self::status("status: done")
    }

    pub fn error() -> Self {
        Self::status("status: error")
    }

    /// Neither address answers, provisioning goes on.
    pub fn dark() -> Self {
        Self {
            public: false,
            ..Self::running()
        }
    }

    pub fn losing_status(mut self) -> Self {
        self.status_lost = true;
        self
    }

    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|line| line.to_string()).collect();
        self
    }

    /// Only the mesh address answers.
    pub fn mesh_only(mut self) -> Self {
        self.public = false;
        self.mesh = true;
        self
    }

    /// Both addresses answer.
    pub fn on_mesh(mut self) -> Self {
        self.mesh = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub address: String,
    pub command: String,
}

#[derive(Debug)]
enum Phase {
    /// Before the reset. Answers on the public address.
    Ready,
    Rebooting { up: u32, down: u32 },
    Converging,
}

#[derive(Debug)]
struct HostState {
    phase: Phase,
    script: VecDeque<Tick>,
    current: Tick,
    log: Vec<String>,
    provisioned: bool,
    reboot_up: u32,
    reboot_down: u32,
    health: (String, i32),
    latency: Duration,
    calls: Vec<Call>,
    uploads: Vec<(PathBuf, String)>,
    resets: u32,
}

impl HostState {
    fn reachable(&self, address: &str) -> bool {
        match self.phase {
            Phase::Ready => address == PUBLIC,
            Phase::Rebooting { .. } => false,
            Phase::Converging if address == PUBLIC => self.current.public,
            Phase::Converging if address == MESH => self.current.mesh,
            Phase::Converging => false,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        self.log.extend(self.current.lines.iter().cloned());
        // A repeated last tick must not write its lines twice.
        self.current.lines.clear();
        if self.current.status == "status: done" {
            self.provisioned = true;
        }
    }

    /// Handles a probe. Returns whether it was answered.
    fn probe(&mut self, address: &str) -> bool {
        if let Phase::Rebooting { up, down } = &mut self.phase {
            if *up > 0 {
                *up -= 1;
                return address == PUBLIC;
            }
            *down = down.saturating_sub(1);
            if *down == 0 {
                self.phase = Phase::Converging;
            }
            return false;
        }

        if matches!(self.phase, Phase::Converging) {
            self.advance();
        }
        self.reachable(address)
    }
}

/// The remote VM. Clones share state so tests can inspect what happened.
#[derive(Clone)]
pub struct FakeHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    /// A host that has already been reset and is provisioning.
    pub fn converging(script: Vec<Tick>) -> Self {
        Self::new(Phase::Converging, script)
    }

    /// A host that has not been touched yet.
    pub fn ready(script: Vec<Tick>) -> Self {
        Self::new(Phase::Ready, script)
    }

    fn new(phase: Phase, script: Vec<Tick>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                phase,
                script: script.into(),
                current: Tick::not_started(),
                log: Vec::new(),
                provisioned: false,
                reboot_up: 1,
                reboot_down: 3,
                health: ("PASS platform".to_string(), 0),
                latency: Duration::ZERO,
                calls: Vec::new(),
                uploads: Vec::new(),
                resets: 0,
            })),
        }
    }

    /// Probes answered after the reset, then probes lost to the reboot.
    pub fn with_reboot(self, up: u32, down: u32) -> Self {
        {
            let mut state = self.lock();
            state.reboot_up = up;
            state.reboot_down = down.max(1);
        }
        self
    }

    pub fn provisioned(self) -> Self {
        self.lock().provisioned = true;
        self
    }

    pub fn with_health(self, output: &str, exit_code: i32) -> Self {
        self.lock().health = (output.to_string(), exit_code);
        self
    }

    /// Every remote command takes this long to come back.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.command == command)
            .count()
    }

    pub fn count_on(&self, address: &str, command: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.address == address && call.command == command)
            .count()
    }

    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.lock().uploads.clone()
    }

    pub fn resets(&self) -> u32 {
        self.lock().resets
    }

    pub fn is_provisioned(&self) -> bool {
        self.lock().provisioned
    }
}

fn ok(stdout: impl Into<String>) -> Result<CommandOutput, ConnectivityError> {
    Ok(CommandOutput {
        stdout: stdout.into(),
        stderr: String::new(),
        exit_code: 0,
    })
}

fn exit(code: i32, stderr: &str) -> Result<CommandOutput, ConnectivityError> {
    Ok(CommandOutput {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: code,
    })
}

fn refused(address: &str) -> Result<CommandOutput, ConnectivityError> {
    Err(ConnectivityError::new(
        address,
        format!("ssh: connect to host {address} port 22: Connection timed out"),
    ))
}

#[async_trait]
impl RemoteChannel for FakeHost {
    async fn execute(&self, address: &str, command: &str) -> Result<CommandOutput, ConnectivityError> {
        let latency: Duration = self.lock().latency;
        if !latency.is_zero() {
            sleep(latency).await;
        }

        let mut state = self.lock();
        state.calls.push(Call {
            address: address.to_string(),
            command: command.to_string(),
        });

        if command == converge_core::commands::PROBE {
            return if state.probe(address) {
                ok("")
            } else {
                refused(address)
            };
        }

        if !state.reachable(address) {
            return refused(address);
        }

        match command {
            converge_core::commands::STATUS if state.current.status_lost => refused(address),
            converge_core::commands::STATUS | converge_core::commands::STATUS_LONG => {
                let status: String = state.current.status.clone();
                let code: i32 = match status.as_str() {
                    s if s.contains("recoverable") => 2,
                    s if s.contains("error") => 1,
                    _ => 0,
                };
                let detail: &str = if command == converge_core::commands::STATUS_LONG {
                    "\ndetail:\n  package_update_upgrade_install failed"
                } else {
                    ""
                };
                Ok(CommandOutput {
                    stdout: format!("{status}{detail}\n"),
                    stderr: String::new(),
                    exit_code: code,
                })
            }
            converge_core::commands::PROVISIONED_MARKER => {
                if state.provisioned {
                    ok("")
                } else {
                    exit(1, "")
                }
            }
            converge_core::commands::RESET => {
                state.resets += 1;
                state.provisioned = false;
                state.log.clear();
                state.phase = Phase::Rebooting {
                    up: state.reboot_up,
                    down: state.reboot_down,
                };
                refused(address)
            }
            converge_core::commands::MESH_SELF_ADDRESS => {
                if matches!(state.phase, Phase::Converging) && state.current.mesh {
                    ok(format!("{MESH}\n"))
                } else {
                    exit(1, "Tailscale is stopped.")
                }
            }
            c if c.starts_with("sudo tail -n +") => {
                let from: usize = c
                    .trim_start_matches("sudo tail -n +")
                    .split_whitespace()
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(1);
                let lines: Vec<String> = state.log.iter().skip(from - 1).cloned().collect();
                let mut out: String = lines.join("\n");
                if !lines.is_empty() {
                    out.push('\n');
                }
                ok(out)
            }
            c if c.starts_with("sudo install -d") => ok(""),
            _ => {
                let (output, code) = state.health.clone();
                Ok(CommandOutput {
                    stdout: output,
                    stderr: String::new(),
                    exit_code: code,
                })
            }
        }
    }

    async fn upload(
        &self,
        address: &str,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), ConnectivityError> {
        let mut state = self.lock();
        if !state.reachable(address) {
            return Err(ConnectivityError::new(address, "lost connection"));
        }
        state
            .uploads
            .push((local_path.to_path_buf(), remote_path.to_string()));
        Ok(())
    }
}

/// Knows the host once it has joined, after a number of queries.
#[derive(Clone)]
pub struct FakeDirectory {
    appears_after: Option<u32>,
    calls: Arc<AtomicU32>,
}

impl FakeDirectory {
    /// The peer is listed from query `n` on.
    pub fn appears_on_query(n: u32) -> Self {
        Self {
            appears_after: Some(n),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn never() -> Self {
        Self {
            appears_after: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MeshDirectory for FakeDirectory {
    async fn find_peer_address(&self, hostname_hint: &str) -> anyhow::Result<Option<IpAddr>> {
        let n: u32 = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let listed: bool = self.appears_after.is_some_and(|after| n >= after);
        if listed && hostname_hint == HOSTNAME {
            Ok(Some(MESH.parse()?))
        } else {
            Ok(None)
        }
    }
}

#[derive(Clone)]
pub struct FakeOperator {
    answer: bool,
    asked: Arc<AtomicU32>,
}

impl FakeOperator {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            asked: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn asked(&self) -> u32 {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Operator for FakeOperator {
    fn confirm(&self, _prompt: &str) -> anyhow::Result<bool> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
    pub states: Vec<ConvergenceState>,
    pub cursors: Vec<usize>,
    pub switches: Vec<(String, String)>,
    pub steps: Vec<Step>,
}

impl ProgressSink for RecordingSink {
    fn log_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn state(&mut self, state: &ConvergenceState, cursor: usize) {
        self.states.push(state.clone());
        self.cursors.push(cursor);
    }

    fn address_switched(&mut self, from: &str, to: &str) {
        self.switches.push((from.to_string(), to.to_string()));
    }

    fn step(&mut self, step: Step) {
        self.steps.push(step);
    }
}

pub fn target() -> Target {
    Target::new(PUBLIC)
        .with_user("root")
        .with_hostname_hint(HOSTNAME)
}

/// Runs the poller alone, the way the orchestrator does after reconnecting.
pub async fn poll(
    host: &FakeHost,
    directory: &FakeDirectory,
    config: &WatchConfig,
    session: &mut converge_core::Session,
    sink: &mut RecordingSink,
) -> Result<converge_core::Convergence, converge_common::error::DeployError> {
    let switch = NetworkSwitch::new(AddressResolver::new(host, directory), config);
    ConvergencePoller::new(host, switch, config)
        .run(session, sink)
        .await
}
