use std::time::Duration;

use colored::*;
use converge_common::network::address::AddressKind;
use converge_protocols::status::ConvergenceState;

use crate::terminal::colors;

pub fn address(address: &str, kind: AddressKind) -> ColoredString {
    match kind {
        AddressKind::Public => address.color(colors::PUBLIC_ADDR),
        AddressKind::Mesh => address.color(colors::MESH_ADDR),
    }
}

pub fn elapsed(duration: Duration) -> String {
    let secs: u64 = duration.as_secs();
    match secs {
        0..60 => format!("{:.1}s", duration.as_secs_f64()),
        _ => format!("{}m{:02}s", secs / 60, secs % 60),
    }
}

pub fn state(state: &ConvergenceState) -> ColoredString {
    let text: String = state.to_string();
    match state {
        ConvergenceState::Done => text.green().bold(),
        ConvergenceState::Error => text.red().bold(),
        ConvergenceState::ErrorRecoverable | ConvergenceState::Unknown(_) => text.yellow(),
        ConvergenceState::NotStarted | ConvergenceState::Running => text.color(colors::ACCENT),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
