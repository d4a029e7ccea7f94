//! SSH host registry. Reads hand out redacted copies only.

use autorule_domain::error::{AutomationError, NotFoundError};
use autorule_domain::id::HostId;
use autorule_domain::ssh_host::SshHost;

use super::ActionManager;

impl<V, S, L, G, P, H> ActionManager<V, S, L, G, P, H> {
    /// Insert `host`, or replace the entry with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] when the entry does not
    /// validate, or [`AutomationError::ResourceExhausted`] when a new id does
    /// not fit in the registry.
    #[tracing::instrument(skip(self, host), fields(id = %host.id))]
    pub fn register_host(&self, host: SshHost) -> Result<(), AutomationError> {
        host.validate()?;
        let mut hosts = self.lock_hosts();
        if let Some(stored) = hosts.iter_mut().find(|stored| stored.id == host.id) {
            *stored = host;
            tracing::debug!("ssh host replaced");
            return Ok(());
        }
        if hosts.len() >= self.config.max_hosts {
            return Err(AutomationError::exhausted(
                "ssh host registry",
                self.config.max_hosts,
            ));
        }
        hosts.push(host);
        tracing::info!("ssh host registered");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no host has this id.
    pub fn unregister_host(&self, id: &HostId) -> Result<(), AutomationError> {
        let mut hosts = self.lock_hosts();
        let position = hosts
            .iter()
            .position(|host| host.id == *id)
            .ok_or_else(|| NotFoundError {
                entity: "SshHost",
                id: id.to_string(),
            })?;
        hosts.swap_remove(position);
        Ok(())
    }

    /// Redacted copy of the host called `id`.
    #[must_use]
    pub fn get_host(&self, id: &HostId) -> Option<SshHost> {
        self.lock_hosts()
            .iter()
            .find(|host| host.id == *id)
            .map(SshHost::redacted)
    }

    /// Redacted copies of every host.
    #[must_use]
    pub fn list_hosts(&self) -> Vec<SshHost> {
        self.lock_hosts().iter().map(SshHost::redacted).collect()
    }

    #[must_use]
    pub fn host_count(&self) -> usize {
        self.lock_hosts().len()
    }
}
