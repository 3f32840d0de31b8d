use anyhow::Context;
use converge_core::Operator;
use dialoguer::{Confirm, theme::ColorfulTheme};

/// Asks on the controlling terminal.
pub struct TerminalOperator {
    theme: ColorfulTheme,
}

impl Default for TerminalOperator {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Operator for TerminalOperator {
    fn confirm(&self, prompt: &str) -> anyhow::Result<bool> {
        tracing_indicatif::suspend_tracing_indicatif(|| {
            Confirm::with_theme(&self.theme)
                .with_prompt(prompt)
                .default(false)
                .interact()
                .context("no interactive terminal")
        })
    }
}
