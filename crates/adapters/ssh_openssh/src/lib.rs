//! # autorule-adapter-ssh-openssh
//!
//! Runs `ssh_cmd` actions through the system `ssh` binary.
//!
//! ## Responsibilities
//! - Implement the `SshClient` port from `autorule-app::ports::executors`
//! - Key authentication via `ssh -i`, password authentication via `sshpass -e`
//!   (the password travels in the `SSHPASS` environment variable, never argv)
//! - Enforce the per-command timeout, killing the child when it expires
//!
//! ## Dependency rule
//! Depends on `autorule-app` (for port traits) and `autorule-domain` (for domain types).

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use autorule_app::ports::{SshClient, SshOutput};
use autorule_domain::error::AutomationError;
use autorule_domain::ssh_host::{SshAuth, SshHost};

/// Errors raised while running the local SSH client.
#[derive(Debug, thiserror::Error)]
pub enum SshError {
    /// The client binary could not be started.
    #[error("cannot start {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl From<SshError> for AutomationError {
    fn from(err: SshError) -> Self {
        Self::Internal(Box::new(err))
    }
}

/// Where the client binaries live and how they connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSshConfig {
    pub ssh_program: PathBuf,
    pub sshpass_program: PathBuf,
    /// Passed as `-o ConnectTimeout=`.
    pub connect_timeout_secs: u32,
    /// When false, unknown host keys are accepted and not recorded.
    pub strict_host_key_checking: bool,
}

impl Default for OpenSshConfig {
    fn default() -> Self {
        Self {
            ssh_program: PathBuf::from("ssh"),
            sshpass_program: PathBuf::from("sshpass"),
            connect_timeout_secs: 10,
            strict_host_key_checking: false,
        }
    }
}

/// [`SshClient`] spawning one `ssh` process per command.
#[derive(Debug, Clone, Default)]
pub struct OpenSshClient {
    config: OpenSshConfig,
}

/// Program, arguments and environment of one invocation.
#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    env: Option<(&'static str, String)>,
}

impl OpenSshClient {
    #[must_use]
    pub fn new(config: OpenSshConfig) -> Self {
        Self { config }
    }

    fn invocation(&self, host: &SshHost, command: &str) -> Invocation {
        let mut args: Vec<OsString> = Vec::new();
        let (program, env) = match &host.auth {
            SshAuth::Password { password } => {
                args.push("-e".into());
                args.push(self.config.ssh_program.clone().into());
                (
                    self.config.sshpass_program.clone(),
                    Some(("SSHPASS", password.clone())),
                )
            }
            SshAuth::PublicKey { key_path } => {
                args.push("-i".into());
                args.push(key_path.clone().into());
                args.push("-o".into());
                args.push("BatchMode=yes".into());
                (self.config.ssh_program.clone(), None)
            }
        };

        args.push("-p".into());
        args.push(host.port.to_string().into());
        args.push("-o".into());
        args.push(format!("ConnectTimeout={}", self.config.connect_timeout_secs).into());
        if !self.config.strict_host_key_checking {
            args.push("-o".into());
            args.push("StrictHostKeyChecking=no".into());
            args.push("-o".into());
            args.push("UserKnownHostsFile=/dev/null".into());
        }
        args.push(format!("{}@{}", host.username, host.host).into());
        args.push("--".into());
        args.push(command.into());

        Invocation { program, args, env }
    }
}

impl SshClient for OpenSshClient {
    #[tracing::instrument(skip(self, host), fields(host = %host.id, addr = %host.host))]
    async fn exec(
        &self,
        host: &SshHost,
        command: &str,
        timeout: Duration,
    ) -> Result<SshOutput, AutomationError> {
        let invocation = self.invocation(host, command);
        let mut child = Command::new(&invocation.program);
        child
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some((key, value)) = &invocation.env {
            child.env(key, value);
        }

        let output = match tokio::time::timeout(timeout, child.output()).await {
            Ok(output) => output.map_err(|source| SshError::Spawn {
                program: invocation.program.display().to_string(),
                source,
            })?,
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis(), "ssh command killed");
                return Err(AutomationError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(exit_code, "ssh command finished");
        Ok(SshOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}
