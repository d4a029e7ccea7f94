//! Executor ports — the hardware and network effects actions drive.
//!
//! The action manager only holds the glue (resolution, expansion, result
//! mapping). Each trait here is implemented by an adapter crate.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use autorule_domain::automation::{DeviceTarget, HttpMethod, Rgb};
use autorule_domain::error::AutomationError;
use autorule_domain::ssh_host::SshHost;

/// Captured output of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs commands on remote hosts.
pub trait SshClient: Send + Sync {
    /// Run `command` on `host` and wait for it to exit.
    ///
    /// Implementations must return [`AutomationError::Timeout`] when the
    /// command outlives `timeout`.
    fn exec(
        &self,
        host: &SshHost,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<SshOutput, AutomationError>> + Send;
}

/// Drives addressable LED devices.
pub trait LedController: Send + Sync {
    /// Canonical name of the device called `name`, if it exists.
    fn resolve(&self, name: &str) -> Option<String>;

    /// Paint every pixel of `device`.
    fn fill(
        &self,
        device: &str,
        color: Rgb,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Paint a single pixel of `device`.
    fn set_pixel(
        &self,
        device: &str,
        index: u8,
        color: Rgb,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Start a named effect on the base layer of `device`.
    ///
    /// A `duration_ms` of zero runs until stopped.
    fn start_effect(
        &self,
        device: &str,
        effect: &str,
        color: Rgb,
        duration_ms: u32,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Stop whatever effect runs on `device`.
    fn stop_effect(&self, device: &str) -> impl Future<Output = Result<(), AutomationError>> + Send;
}

/// Drives GPIO pins.
pub trait GpioController: Send + Sync {
    /// Configure `pin` as a push-pull output.
    fn configure_output(&self, pin: u8)
    -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Drive `pin` high (`true`) or low.
    fn set_level(
        &self,
        pin: u8,
        level: bool,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;
}

/// Power sequencing for managed compute modules.
pub trait PowerController: Send + Sync {
    fn power_on(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;

    fn power_off(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Cut power without a graceful shutdown.
    fn force_off(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;

    fn reset(&self, device: DeviceTarget)
    -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Reboot the device into its recovery mode.
    fn enter_recovery(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;
}

/// Outbound HTTP request built by a webhook action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Performs HTTP requests.
pub trait HttpClient: Send + Sync {
    /// Send `request` and return the response status code.
    ///
    /// Implementations must return [`AutomationError::Timeout`] when the
    /// transport times out.
    fn perform(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<u16, AutomationError>> + Send;
}

impl<T: LedController> LedController for Arc<T> {
    fn resolve(&self, name: &str) -> Option<String> {
        (**self).resolve(name)
    }

    fn fill(
        &self,
        device: &str,
        color: Rgb,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).fill(device, color)
    }

    fn set_pixel(
        &self,
        device: &str,
        index: u8,
        color: Rgb,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).set_pixel(device, index, color)
    }

    fn start_effect(
        &self,
        device: &str,
        effect: &str,
        color: Rgb,
        duration_ms: u32,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).start_effect(device, effect, color, duration_ms)
    }

    fn stop_effect(&self, device: &str) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).stop_effect(device)
    }
}

impl<T: GpioController> GpioController for Arc<T> {
    fn configure_output(
        &self,
        pin: u8,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).configure_output(pin)
    }

    fn set_level(
        &self,
        pin: u8,
        level: bool,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).set_level(pin, level)
    }
}

impl<T: PowerController> PowerController for Arc<T> {
    fn power_on(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).power_on(device)
    }

    fn power_off(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).power_off(device)
    }

    fn force_off(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).force_off(device)
    }

    fn reset(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).reset(device)
    }

    fn enter_recovery(
        &self,
        device: DeviceTarget,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).enter_recovery(device)
    }
}

impl<T: SshClient> SshClient for Arc<T> {
    fn exec(
        &self,
        host: &SshHost,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<SshOutput, AutomationError>> + Send {
        (**self).exec(host, command, timeout)
    }
}

impl<T: HttpClient> HttpClient for Arc<T> {
    fn perform(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<u16, AutomationError>> + Send {
        (**self).perform(request)
    }
}
