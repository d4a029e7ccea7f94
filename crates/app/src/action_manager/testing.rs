//! Recording fakes for the executor ports, shared by the app's unit tests.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autorule_domain::automation::{DeviceTarget, Rgb};
use autorule_domain::error::AutomationError;
use autorule_domain::id::HostId;
use autorule_domain::ssh_host::{SshAuth, SshHost};

use super::{ActionManager, ActionManagerConfig, Executors};
use crate::ports::{
    GpioController, HttpClient, HttpRequest, LedController, PowerController, SshClient, SshOutput,
};
use crate::variable_store::InMemoryVariableStore;

// ── SSH ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SshReply {
    Output(SshOutput),
    Timeout,
    Refused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCall {
    pub host: HostId,
    pub command: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct FakeSsh {
    reply: Mutex<SshReply>,
    calls: Mutex<Vec<SshCall>>,
}

impl Default for FakeSsh {
    fn default() -> Self {
        Self {
            reply: Mutex::new(SshReply::Output(SshOutput::default())),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSsh {
    pub fn reply(&self, reply: SshReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> Vec<SshCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl SshClient for FakeSsh {
    async fn exec(
        &self,
        host: &SshHost,
        command: &str,
        timeout: Duration,
    ) -> Result<SshOutput, AutomationError> {
        self.calls.lock().unwrap().push(SshCall {
            host: host.id.clone(),
            command: command.to_string(),
            timeout,
        });
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            SshReply::Output(output) => Ok(output),
            SshReply::Timeout => Err(AutomationError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            }),
            SshReply::Refused => Err(AutomationError::Internal(Box::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))),
        }
    }
}

// ── LED ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeLed {
    ops: Mutex<Vec<String>>,
}

impl FakeLed {
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }
}

impl LedController for FakeLed {
    fn resolve(&self, name: &str) -> Option<String> {
        ["led_touch", "led_board", "led_matrix"]
            .contains(&name)
            .then(|| name.to_string())
    }

    async fn fill(&self, device: &str, color: Rgb) -> Result<(), AutomationError> {
        self.record(format!("fill {device} {color}"));
        Ok(())
    }

    async fn set_pixel(&self, device: &str, index: u8, color: Rgb) -> Result<(), AutomationError> {
        self.record(format!("pixel {device}[{index}] {color}"));
        Ok(())
    }

    async fn start_effect(
        &self,
        device: &str,
        effect: &str,
        color: Rgb,
        duration_ms: u32,
    ) -> Result<(), AutomationError> {
        self.record(format!("effect {device} {effect} {color} {duration_ms}"));
        Ok(())
    }

    async fn stop_effect(&self, device: &str) -> Result<(), AutomationError> {
        self.record(format!("stop {device}"));
        Ok(())
    }
}

// ── GPIO ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeGpio {
    ops: Mutex<Vec<String>>,
}

impl FakeGpio {
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }
}

impl GpioController for FakeGpio {
    async fn configure_output(&self, pin: u8) -> Result<(), AutomationError> {
        if pin >= 64 {
            return Err(AutomationError::unsupported("GPIO pin", pin.to_string()));
        }
        self.ops.lock().unwrap().push(format!("output {pin}"));
        Ok(())
    }

    async fn set_level(&self, pin: u8, level: bool) -> Result<(), AutomationError> {
        self.ops
            .lock()
            .unwrap()
            .push(format!("{pin}={}", u8::from(level)));
        Ok(())
    }
}

// ── Power ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakePower {
    ops: Mutex<Vec<String>>,
}

impl FakePower {
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, device: DeviceTarget, op: &str) -> Result<(), AutomationError> {
        self.ops.lock().unwrap().push(format!("{device} {op}"));
        Ok(())
    }
}

impl PowerController for FakePower {
    async fn power_on(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.record(device, "on")
    }

    async fn power_off(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.record(device, "off")
    }

    async fn force_off(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.record(device, "force_off")
    }

    async fn reset(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.record(device, "reset")
    }

    async fn enter_recovery(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.record(device, "recovery")
    }
}

// ── HTTP ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum HttpReply {
    Status(u16),
    Timeout,
}

#[derive(Debug)]
pub struct FakeHttp {
    reply: Mutex<HttpReply>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Default for FakeHttp {
    fn default() -> Self {
        Self {
            reply: Mutex::new(HttpReply::Status(200)),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeHttp {
    pub fn reply(&self, reply: HttpReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for FakeHttp {
    async fn perform(&self, request: HttpRequest) -> Result<u16, AutomationError> {
        self.requests.lock().unwrap().push(request);
        let reply = *self.reply.lock().unwrap();
        match reply {
            HttpReply::Status(status) => Ok(status),
            HttpReply::Timeout => Err(AutomationError::Timeout { timeout_ms: 5000 }),
        }
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub type TestManager = ActionManager<
    Arc<InMemoryVariableStore>,
    Arc<FakeSsh>,
    Arc<FakeLed>,
    Arc<FakeGpio>,
    Arc<FakePower>,
    Arc<FakeHttp>,
>;

pub struct Harness {
    pub manager: Arc<TestManager>,
    pub variables: Arc<InMemoryVariableStore>,
    pub ssh: Arc<FakeSsh>,
    pub led: Arc<FakeLed>,
    pub gpio: Arc<FakeGpio>,
    pub power: Arc<FakePower>,
    pub http: Arc<FakeHttp>,
}

impl Harness {
    pub fn register_agx(&self) {
        self.manager.register_host(agx_host()).unwrap();
    }
}

pub fn agx_host() -> SshHost {
    SshHost {
        id: "agx".parse().unwrap(),
        host: "192.168.1.100".to_string(),
        port: 22,
        username: "nvidia".to_string(),
        auth: SshAuth::Password {
            password: "hunter2".to_string(),
        },
    }
}

pub fn harness() -> Harness {
    harness_with(ActionManagerConfig::default())
}

pub fn harness_with(config: ActionManagerConfig) -> Harness {
    let variables = Arc::new(InMemoryVariableStore::new());
    let ssh = Arc::new(FakeSsh::default());
    let led = Arc::new(FakeLed::default());
    let gpio = Arc::new(FakeGpio::default());
    let power = Arc::new(FakePower::default());
    let http = Arc::new(FakeHttp::default());

    let executors = Executors {
        ssh: Arc::clone(&ssh),
        led: Arc::clone(&led),
        gpio: Arc::clone(&gpio),
        power: Arc::clone(&power),
        http: Arc::clone(&http),
    };
    let manager = Arc::new(ActionManager::new(
        config,
        Arc::clone(&variables),
        executors,
    ));

    Harness {
        manager,
        variables,
        ssh,
        led,
        gpio,
        power,
        http,
    }
}
