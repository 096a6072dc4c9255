use crate::error::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};

/// Blocking yes/no question. The partitioner uses this while waiting for
/// the operator to flip server-side preferences it cannot change itself.
pub trait Confirmation {
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Terminal-backed confirmation. Headless runs cannot wait for an operator,
/// so there every question is declined, which lets the waiting operation
/// cancel instead of spinning on a prompt.
pub struct TerminalPrompt {
    interactive: bool,
}

impl TerminalPrompt {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Confirmation for TerminalPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        if !self.interactive {
            return Ok(false);
        }

        Ok(Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(false)
            .interact()?)
    }
}

pub fn input(message: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .interact_text()?)
}

pub fn password(message: &str) -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_prompt_declines() {
        let prompt = TerminalPrompt::new(false);
        assert!(!prompt.confirm("Continue?").unwrap());
    }
}
