//! Action — one unit of external effect.
//!
//! An [`Action`] is an optional delay plus an [`ActionKind`] payload. The
//! kind decides which executor the dispatcher routes it to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::HostId;
use crate::value::Value;

/// LED index meaning "every pixel of the device".
pub const ALL_PIXELS: u8 = 0xFF;

/// Something to do, after waiting `delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Wait before dispatching, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    /// Wrap a kind with no delay.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self { delay_ms: 0, kind }
    }

    #[must_use]
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// `SET_VAR` shorthand.
    #[must_use]
    pub fn set_var(variable: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(ActionKind::SetVar {
            variable: variable.into(),
            value: value.into(),
        })
    }

    /// `LOG` shorthand.
    #[must_use]
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::new(ActionKind::Log {
            level,
            message: message.into(),
        })
    }
}

impl From<ActionKind> for Action {
    fn from(kind: ActionKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.delay_ms > 0 {
            write!(f, "{} after {}ms", self.kind, self.delay_ms)
        } else {
            self.kind.fmt(f)
        }
    }
}

/// Kind-specific payload of an [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Drive an LED device.
    Led {
        /// Device name or alias (`touch`, `board`, `matrix`).
        device: String,
        /// Pixel index, [`ALL_PIXELS`] to fill the whole device.
        #[serde(default = "all_pixels")]
        index: u8,
        #[serde(default)]
        color: Rgb,
        /// Effect name; when set the effect is started instead of painting.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        effect: Option<String>,
        #[serde(default)]
        duration_ms: u32,
    },
    /// Run a command on a registered SSH host.
    SshCmd {
        host_ref: HostId,
        /// Command line; `${var}` tokens are expanded before sending.
        command: String,
        /// Advisory: only templates decide whether to queue.
        #[serde(default, rename = "async")]
        run_async: bool,
        /// Zero selects the dispatcher's default timeout.
        #[serde(default)]
        timeout_ms: u32,
    },
    /// Set a GPIO output, optionally pulsing it.
    Gpio {
        pin: u8,
        level: bool,
        /// When non-zero, the inverse level is restored after this delay.
        #[serde(default)]
        pulse_ms: u32,
    },
    /// Perform an HTTP request.
    Webhook {
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_template: Option<String>,
    },
    /// Emit a log line.
    Log {
        #[serde(default)]
        level: LogLevel,
        message: String,
    },
    /// Write a variable.
    SetVar { variable: String, value: Value },
    /// Power-control a managed device (`agx`, `lpmu`).
    DeviceCtrl { device: String, action: String },
}

fn all_pixels() -> u8 {
    ALL_PIXELS
}

impl ActionKind {
    /// Short human name of the kind.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Led { .. } => "LED",
            Self::SshCmd { .. } => "SSH",
            Self::Gpio { .. } => "GPIO",
            Self::Webhook { .. } => "Webhook",
            Self::Log { .. } => "Log",
            Self::SetVar { .. } => "SetVar",
            Self::DeviceCtrl { .. } => "Device",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Led {
                device,
                index,
                color,
                ..
            } => write!(f, "led({device}[{index}], {color})"),
            Self::SshCmd {
                host_ref, command, ..
            } => write!(f, "ssh({host_ref}: {command})"),
            Self::Gpio { pin, level, .. } => write!(f, "gpio({pin}={})", u8::from(*level)),
            Self::Webhook { url, method, .. } => write!(f, "webhook({method} {url})"),
            Self::Log { level, .. } => write!(f, "log({level})"),
            Self::SetVar { variable, value } => write!(f, "set_var({variable}={value})"),
            Self::DeviceCtrl { device, action } => write!(f, "device({device}, {action})"),
        }
    }
}

/// 24-bit color, written `#rrggbb`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "red" => Self::new(255, 0, 0),
            "green" => Self::new(0, 255, 0),
            "blue" => Self::new(0, 0, 255),
            "white" => Self::new(255, 255, 255),
            "black" | "off" => Self::new(0, 0, 0),
            "yellow" => Self::new(255, 255, 0),
            "cyan" => Self::new(0, 255, 255),
            "magenta" => Self::new(255, 0, 255),
            "orange" => Self::new(255, 165, 0),
            "purple" => Self::new(128, 0, 128),
            "pink" => Self::new(255, 192, 203),
            _ => return None,
        };
        Some(color)
    }
}

impl FromStr for Rgb {
    type Err = ValidationError;

    /// Accepts `#RRGGBB`, `rgb(r,g,b)` or a color name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidColor(s.to_string());
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        if let Some(hex) = lower.strip_prefix('#') {
            if hex.len() != 6 || !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let value = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
            let [_, r, g, b] = value.to_be_bytes();
            return Ok(Self::new(r, g, b));
        }

        if let Some(inner) = lower
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts = inner
                .split(',')
                .map(|part| part.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            return match parts.as_slice() {
                [r, g, b] => Ok(Self::new(*r, *g, *b)),
                _ => Err(invalid()),
            };
        }

        Self::named(&lower).ok_or_else(invalid)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// HTTP verb for [`ActionKind::Webhook`]. Unknown verbs read as `GET`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }

    /// Whether requests with this verb carry a JSON body.
    #[must_use]
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl From<&str> for HttpMethod {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("post") {
            Self::Post
        } else if value.eq_ignore_ascii_case("put") {
            Self::Put
        } else {
            Self::Get
        }
    }
}

impl From<String> for HttpMethod {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<HttpMethod> for String {
    fn from(value: HttpMethod) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an [`ActionKind::Log`] line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        })
    }
}

/// Power-managed device addressed by [`ActionKind::DeviceCtrl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTarget {
    Agx,
    Lpmu,
}

impl DeviceTarget {
    /// Case-insensitive lookup.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("agx") {
            Some(Self::Agx)
        } else if name.eq_ignore_ascii_case("lpmu") {
            Some(Self::Lpmu)
        } else {
            None
        }
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Agx => "agx",
            Self::Lpmu => "lpmu",
        })
    }
}

/// Power operation requested by [`ActionKind::DeviceCtrl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerCommand {
    PowerOn,
    PowerOff,
    ForceOff,
    Reset,
    Recovery,
}

impl PowerCommand {
    /// Case-insensitive lookup, accepting the short aliases
    /// `on`, `off` and `reboot`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "power_on" | "on" => Some(Self::PowerOn),
            "power_off" | "off" => Some(Self::PowerOff),
            "force_off" => Some(Self::ForceOff),
            "reset" | "reboot" => Some(Self::Reset),
            "recovery" => Some(Self::Recovery),
            _ => None,
        }
    }
}

impl fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PowerOn => "power_on",
            Self::PowerOff => "power_off",
            Self::ForceOff => "force_off",
            Self::Reset => "reset",
            Self::Recovery => "recovery",
        })
    }
}
