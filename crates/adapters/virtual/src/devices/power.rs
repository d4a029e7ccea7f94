//! Power rail of a managed compute module (AGX, LPMU).

use std::fmt;

use autorule_domain::automation::DeviceTarget;
use autorule_domain::error::AutomationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PowerState {
    #[default]
    Off,
    Standby,
    On,
    Booting,
    Error,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Standby => "standby",
            Self::On => "on",
            Self::Booting => "booting",
            Self::Error => "error",
        })
    }
}

/// Power state machine of one module.
#[derive(Debug, Clone)]
pub struct PowerRail {
    target: DeviceTarget,
    state: PowerState,
    /// Set while the module boots into its recovery mode.
    recovery: bool,
}

impl PowerRail {
    #[must_use]
    pub fn new(target: DeviceTarget) -> Self {
        Self {
            target,
            state: PowerState::Off,
            recovery: false,
        }
    }

    #[must_use]
    pub fn target(&self) -> DeviceTarget {
        self.target
    }

    #[must_use]
    pub fn state(&self) -> PowerState {
        self.state
    }

    #[must_use]
    pub fn in_recovery(&self) -> bool {
        self.recovery
    }

    pub fn power_on(&mut self) {
        self.state = PowerState::On;
        self.recovery = false;
    }

    /// Graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Unsupported`] while the module boots.
    pub fn power_off(&mut self) -> Result<(), AutomationError> {
        if self.state == PowerState::Booting {
            return Err(AutomationError::unsupported(
                "power_off while booting",
                self.target.to_string(),
            ));
        }
        self.state = PowerState::Off;
        self.recovery = false;
        Ok(())
    }

    pub fn force_off(&mut self) {
        self.state = PowerState::Off;
        self.recovery = false;
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::Unsupported`] when the module is off.
    pub fn reset(&mut self) -> Result<(), AutomationError> {
        if self.state == PowerState::Off {
            return Err(AutomationError::unsupported(
                "reset while off",
                self.target.to_string(),
            ));
        }
        self.state = PowerState::On;
        self.recovery = false;
        Ok(())
    }

    /// Restart into recovery mode. The module stays `Booting` until it is
    /// powered on or off again.
    pub fn enter_recovery(&mut self) {
        self.state = PowerState::Booting;
        self.recovery = true;
    }
}
