//! SSH host credentials referenced by `ssh_cmd` actions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, ValidationError};
use crate::id::HostId;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// A remote host the dispatcher may run commands on.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshHost {
    pub id: HostId,
    /// Hostname or IP address.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(flatten)]
    pub auth: SshAuth,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// How to authenticate against an [`SshHost`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "auth", rename_all = "snake_case")]
pub enum SshAuth {
    Password { password: String },
    PublicKey { key_path: PathBuf },
}

impl SshHost {
    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] when the address is empty.
    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.host.is_empty() {
            return Err(ValidationError::EmptyHost.into());
        }
        Ok(())
    }

    /// Copy of this entry with the password cleared.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let auth = match &self.auth {
            SshAuth::Password { .. } => SshAuth::Password {
                password: String::new(),
            },
            other => other.clone(),
        };
        Self {
            id: self.id.clone(),
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            auth,
        }
    }
}

impl fmt::Debug for SshHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshHost")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("auth", &self.auth)
            .finish()
    }
}

impl fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { .. } => f.write_str("Password(***)"),
            Self::PublicKey { key_path } => {
                f.debug_struct("PublicKey").field("key_path", key_path).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agx() -> SshHost {
        SshHost {
            id: HostId::new("agx").unwrap(),
            host: "10.10.99.100".to_string(),
            port: DEFAULT_SSH_PORT,
            username: "nvidia".to_string(),
            auth: SshAuth::Password {
                password: "hunter2".to_string(),
            },
        }
    }

    #[test]
    fn should_clear_password_when_redacted() {
        let redacted = agx().redacted();
        assert_eq!(
            redacted.auth,
            SshAuth::Password {
                password: String::new()
            }
        );
        assert_eq!(redacted.host, "10.10.99.100");
    }

    #[test]
    fn should_never_print_password_in_debug() {
        let debug = format!("{:?}", agx());
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("Password(***)"));
    }

    #[test]
    fn should_reject_empty_host() {
        let mut host = agx();
        host.host.clear();
        assert!(host.validate().is_err());
    }

    #[test]
    fn should_deserialize_key_auth_with_default_port() {
        let json = r#"{"id": "lpmu", "host": "lpmu.local", "username": "root",
                       "auth": "public_key", "key_path": "/etc/autorule/id_ed25519"}"#;
        let host: SshHost = serde_json::from_str(json).unwrap();
        assert_eq!(host.port, 22);
        assert!(matches!(host.auth, SshAuth::PublicKey { .. }));
    }
}
