use std::fmt;
use std::io::{self, BufRead, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::error::SpotError;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait CredentialProvider {
    fn credentials(&self) -> Result<Credentials, SpotError>;
}

impl CredentialProvider for Credentials {
    fn credentials(&self) -> Result<Credentials, SpotError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Default, Clone)]
pub struct EnvCredentials {
    pub username: Option<String>,
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials, SpotError> {
        let username = self
            .username
            .clone()
            .or_else(|| std::env::var("SPOT_USERNAME").ok())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SpotError::Credentials("SPOT_USERNAME is not set".to_string()))?;
        let password = std::env::var("SPOT_PASSWORD")
            .map_err(|_| SpotError::Credentials("SPOT_PASSWORD is not set".to_string()))?;
        Ok(Credentials::new(username.trim(), password))
    }
}

#[derive(Debug, Default, Clone)]
pub struct PromptCredentials {
    pub username: Option<String>,
}

impl CredentialProvider for PromptCredentials {
    fn credentials(&self) -> Result<Credentials, SpotError> {
        let username = match self.username.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(username) => username.trim().to_string(),
            None => read_line("username: ")
                .map_err(|err| SpotError::Credentials(err.to_string()))?,
        };
        if username.is_empty() {
            return Err(SpotError::Credentials("empty username".to_string()));
        }
        let password = read_hidden(&format!("password for {username}: "))
            .map_err(|err| SpotError::Credentials(err.to_string()))?;
        Ok(Credentials::new(username, password))
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_hidden(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;

    enable_raw_mode()?;
    let result = read_hidden_keys();
    disable_raw_mode()?;
    stderr.write_all(b"\r\n")?;
    result
}

fn read_hidden_keys() -> io::Result<String> {
    let mut buffer = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(buffer),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "aborted"));
            }
            KeyCode::Esc => return Err(io::Error::new(io::ErrorKind::Interrupted, "aborted")),
            KeyCode::Char(ch) => buffer.push(ch),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("hmwood", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("hmwood"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn static_credentials_are_returned_as_is() {
        let creds = Credentials::new("hmwood", "pw");
        let provided = creds.credentials().unwrap();
        assert_eq!(provided.username, "hmwood");
        assert_eq!(provided.password(), "pw");
    }
}
