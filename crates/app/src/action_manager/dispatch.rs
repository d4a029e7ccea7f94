//! Per-kind executor glue: resolution, `${var}` expansion and result mapping.

use std::time::Duration;

use autorule_domain::automation::{
    ALL_PIXELS, ActionKind, DeviceTarget, HttpMethod, LogLevel, PowerCommand, Rgb,
};
use autorule_domain::error::{AutomationError, NotFoundError};
use autorule_domain::id::HostId;
use autorule_domain::result::ActionResult;
use autorule_domain::text::MAX_OUTPUT_LEN;
use autorule_domain::value::Value;

use super::ActionManager;
use crate::expand::expand_variables;
use crate::ports::{
    GpioController, HttpClient, HttpRequest, LedController, PowerController, SshClient,
    VariableStore,
};

const JSON_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json");

/// Map the short LED aliases onto device names.
fn led_device_name(name: &str) -> &str {
    match name {
        "touch" => "led_touch",
        "board" => "led_board",
        "matrix" => "led_matrix",
        other => other,
    }
}

impl<V, S, L, G, P, H> ActionManager<V, S, L, G, P, H>
where
    V: VariableStore,
    S: SshClient,
    L: LedController,
    G: GpioController,
    P: PowerController,
    H: HttpClient,
{
    pub(super) async fn dispatch(&self, kind: &ActionKind) -> ActionResult {
        match kind {
            ActionKind::SshCmd {
                host_ref,
                command,
                timeout_ms,
                ..
            } => self.run_ssh(host_ref, command, *timeout_ms).await,
            ActionKind::Led {
                device,
                index,
                color,
                effect,
                duration_ms,
            } => {
                self.run_led(device, *index, *color, effect.as_deref(), *duration_ms)
                    .await
            }
            ActionKind::Gpio {
                pin,
                level,
                pulse_ms,
            } => self.run_gpio(*pin, *level, *pulse_ms).await,
            ActionKind::DeviceCtrl { device, action } => self.run_device(device, action).await,
            ActionKind::Log { level, message } => self.run_log(*level, message),
            ActionKind::SetVar { variable, value } => self.run_set_var(variable, value),
            ActionKind::Webhook {
                url,
                method,
                body_template,
            } => {
                self.run_webhook(url, *method, body_template.as_deref())
                    .await
            }
        }
    }

    async fn run_ssh(&self, host_ref: &HostId, command: &str, timeout_ms: u32) -> ActionResult {
        let host = self
            .lock_hosts()
            .iter()
            .find(|host| host.id == *host_ref)
            .cloned();
        let Some(host) = host else {
            return ActionResult::failed(format!("SSH host '{host_ref}' not found"));
        };

        let command = expand_variables(command, &self.variables, MAX_OUTPUT_LEN);
        let timeout = if timeout_ms == 0 {
            self.config.default_ssh_timeout
        } else {
            Duration::from_millis(u64::from(timeout_ms))
        };
        tracing::debug!(host = %host.id, %command, "running remote command");

        match self.executors.ssh.exec(&host, &command, timeout).await {
            Ok(output) => {
                let exit_var = format!("ssh.{host_ref}.exit_code");
                if let Err(err) = self.variables.set(&exit_var, Value::Int(output.exit_code)) {
                    tracing::warn!(variable = %exit_var, error = %err, "cannot record exit code");
                }
                let text = if output.stdout.is_empty() {
                    output.stderr
                } else {
                    output.stdout
                };
                let result = if output.exit_code == 0 {
                    ActionResult::success(text)
                } else {
                    ActionResult::failed(text)
                };
                result.with_exit_code(output.exit_code)
            }
            Err(AutomationError::Timeout { timeout_ms }) => {
                tracing::warn!(host = %host.id, timeout_ms, "remote command timed out");
                ActionResult::timeout(format!("SSH command timed out after {timeout_ms}ms"))
                    .with_exit_code(-1)
            }
            Err(err) => {
                tracing::error!(host = %host.id, error = %err, "remote command failed");
                ActionResult::failed(err.to_string()).with_exit_code(-1)
            }
        }
    }

    async fn run_led(
        &self,
        device: &str,
        index: u8,
        color: Rgb,
        effect: Option<&str>,
        duration_ms: u32,
    ) -> ActionResult {
        let Some(name) = self.executors.led.resolve(led_device_name(device)) else {
            return ActionResult::failed(format!("LED device '{device}' not found"));
        };

        let led = &self.executors.led;
        let outcome = match effect.filter(|effect| !effect.is_empty()) {
            Some(effect) => led.start_effect(&name, effect, color, duration_ms).await,
            None => match led.stop_effect(&name).await {
                Ok(()) if index == ALL_PIXELS => led.fill(&name, color).await,
                Ok(()) => led.set_pixel(&name, index, color).await,
                Err(err) => Err(err),
            },
        };

        match outcome {
            Ok(()) => ActionResult::success(format!("{name} updated")),
            Err(err) => {
                tracing::error!(device = %name, error = %err, "LED action failed");
                ActionResult::failed(err.to_string())
            }
        }
    }

    async fn run_gpio(&self, pin: u8, level: bool, pulse_ms: u32) -> ActionResult {
        let gpio = &self.executors.gpio;
        if let Err(err) = gpio.configure_output(pin).await {
            return ActionResult::failed(err.to_string());
        }
        if let Err(err) = gpio.set_level(pin, level).await {
            return ActionResult::failed(err.to_string());
        }

        if pulse_ms > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(pulse_ms))).await;
            if let Err(err) = gpio.set_level(pin, !level).await {
                tracing::warn!(pin, error = %err, "cannot restore level after pulse");
            }
        }
        ActionResult::success(format!("GPIO {pin} = {}", u8::from(level)))
    }

    async fn run_device(&self, device: &str, action: &str) -> ActionResult {
        let Some(target) = DeviceTarget::parse(device) else {
            let err = NotFoundError {
                entity: "Device",
                id: device.to_string(),
            };
            return ActionResult::failed(err.to_string());
        };
        let Some(command) = PowerCommand::parse(action) else {
            return ActionResult::failed(
                AutomationError::unsupported("device action", action).to_string(),
            );
        };

        let power = &self.executors.power;
        let outcome = match command {
            PowerCommand::PowerOn => power.power_on(target).await,
            PowerCommand::PowerOff => power.power_off(target).await,
            PowerCommand::ForceOff => power.force_off(target).await,
            PowerCommand::Reset => power.reset(target).await,
            PowerCommand::Recovery => power.enter_recovery(target).await,
        };

        match outcome {
            Ok(()) => ActionResult::success(format!("{target} {command}")),
            Err(err) => {
                tracing::error!(%target, %command, error = %err, "power action failed");
                ActionResult::failed(err.to_string())
            }
        }
    }

    fn run_log(&self, level: LogLevel, message: &str) -> ActionResult {
        let message = expand_variables(message, &self.variables, MAX_OUTPUT_LEN);
        match level {
            LogLevel::Error => tracing::error!(target: "automation", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "automation", "{message}"),
            LogLevel::Info => tracing::info!(target: "automation", "{message}"),
            LogLevel::Debug => tracing::debug!(target: "automation", "{message}"),
        }
        ActionResult::success(message)
    }

    fn run_set_var(&self, variable: &str, value: &Value) -> ActionResult {
        match self.variables.set(variable, value.clone()) {
            Ok(()) => ActionResult::success(format!("{variable} = {value}")),
            Err(err) => ActionResult::failed(err.to_string()),
        }
    }

    async fn run_webhook(
        &self,
        url: &str,
        method: HttpMethod,
        body_template: Option<&str>,
    ) -> ActionResult {
        let body = body_template
            .filter(|_| method.has_body())
            .map(|template| expand_variables(template, &self.variables, MAX_OUTPUT_LEN));
        let headers = if method.has_body() {
            vec![(JSON_CONTENT_TYPE.0.to_string(), JSON_CONTENT_TYPE.1.to_string())]
        } else {
            Vec::new()
        };
        let request = HttpRequest {
            url: url.to_string(),
            method,
            headers,
            body,
        };

        match self.executors.http.perform(request).await {
            Ok(status) if (200..300).contains(&status) => {
                ActionResult::success(format!("HTTP {status}"))
            }
            Ok(status) => {
                ActionResult::failed(format!("HTTP {status}")).with_exit_code(i32::from(status))
            }
            Err(AutomationError::Timeout { timeout_ms }) => {
                ActionResult::timeout(format!("webhook timed out after {timeout_ms}ms"))
            }
            Err(err) => {
                tracing::error!(%url, error = %err, "webhook failed");
                ActionResult::failed(err.to_string())
            }
        }
    }
}
