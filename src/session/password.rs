//! Master password input
//!
//! Passwords come from a [`PasswordPrompt`]. The binary uses
//! [`TerminalPrompt`] (masked raw-mode input) or, for automation,
//! [`EnvPrompt`] reading `WALLET_CORE_PASSWORD`.

use std::io::BufRead;
use std::io::Write;

use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::terminal;
use crossterm::tty::IsTty;
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::error::WalletError;

pub const PASSWORD_ENV_VAR: &str = "WALLET_CORE_PASSWORD";
pub const MIN_PASSWORD_LEN: usize = 6;

pub trait PasswordPrompt: Send {
    /// Shows `message` and reads one password.
    fn prompt_password(&mut self, message: &str) -> Result<Zeroizing<String>>;
}

/// Advisory classification shown during setup. Only
/// [`MIN_PASSWORD_LEN`] is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
pub enum PasswordStrength {
    #[strum(to_string = "too short")]
    TooShort,
    #[strum(to_string = "weak")]
    Weak,
    #[strum(to_string = "moderate")]
    Moderate,
    #[strum(to_string = "strong")]
    Strong,
}

impl PasswordStrength {
    pub fn of(password: &str) -> Self {
        let len = password.chars().count();
        if len < MIN_PASSWORD_LEN {
            return Self::TooShort;
        }

        let classes = [
            password.chars().any(|c| c.is_lowercase()),
            password.chars().any(|c| c.is_uppercase()),
            password.chars().any(|c| c.is_ascii_digit()),
            password
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace()),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();

        match (len, classes) {
            (16.., 3..) | (20.., _) => Self::Strong,
            (12.., 2..) | (8.., 4) => Self::Moderate,
            _ => Self::Weak,
        }
    }
}

/// Reads the master password from an environment variable.
///
/// Environment variables leak through process listings and shell history;
/// use only for scripted runs.
#[derive(Debug, Clone)]
pub struct EnvPrompt {
    var_name: String,
}

impl EnvPrompt {
    /// `None` if the variable is not set.
    pub fn from_env(var_name: &str) -> Option<Self> {
        std::env::var_os(var_name)?;
        warn!("Reading master password from environment variable {var_name}");
        Some(Self {
            var_name: var_name.to_string(),
        })
    }
}

impl PasswordPrompt for EnvPrompt {
    fn prompt_password(&mut self, _message: &str) -> Result<Zeroizing<String>> {
        std::env::var(&self.var_name)
            .map(Zeroizing::new)
            .map_err(|_| WalletError::NotFound(format!("environment variable {}", self.var_name)))
    }
}

/// Masked input on the controlling terminal. Falls back to reading one line
/// from stdin when stdin is not a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

/// Restores cooked mode when dropped, including on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Could not restore terminal mode: {e}");
        }
    }
}

impl TerminalPrompt {
    fn read_masked(&self) -> Result<Zeroizing<String>> {
        let mut password = Zeroizing::new(String::new());
        let mut stderr = std::io::stderr();
        let _guard = RawModeGuard::enable()?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => break,
                KeyCode::Esc => return Err(WalletError::Interrupted),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(WalletError::Interrupted)
                }
                KeyCode::Backspace => {
                    if password.pop().is_some() {
                        write!(stderr, "\u{8} \u{8}")?;
                    }
                }
                KeyCode::Char(c) => {
                    password.push(c);
                    write!(stderr, "*")?;
                }
                _ => {}
            }
            stderr.flush()?;
        }
        Ok(password)
    }

    fn read_line(&self) -> Result<Zeroizing<String>> {
        let mut line = Zeroizing::new(String::new());
        if std::io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(WalletError::Interrupted);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

impl PasswordPrompt for TerminalPrompt {
    fn prompt_password(&mut self, message: &str) -> Result<Zeroizing<String>> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{message}")?;
        stderr.flush()?;

        if std::io::stdin().is_tty() {
            let password = self.read_masked();
            writeln!(stderr)?;
            password
        } else {
            self.read_line()
        }
    }
}
