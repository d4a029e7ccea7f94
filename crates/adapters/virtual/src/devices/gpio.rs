//! Virtual GPIO bank.

use autorule_domain::error::AutomationError;

/// Number of pins the bank exposes.
pub const GPIO_PIN_COUNT: u8 = 49;

/// State of one pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinState {
    pub output: bool,
    pub level: bool,
}

#[derive(Debug, Clone)]
pub struct GpioBank {
    pins: Vec<PinState>,
}

impl Default for GpioBank {
    fn default() -> Self {
        Self {
            pins: vec![PinState::default(); usize::from(GPIO_PIN_COUNT)],
        }
    }
}

impl GpioBank {
    #[must_use]
    pub fn pin(&self, pin: u8) -> Option<PinState> {
        self.pins.get(usize::from(pin)).copied()
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::Unsupported`] for a pin outside the bank.
    pub fn configure_output(&mut self, pin: u8) -> Result<(), AutomationError> {
        self.pin_mut(pin)?.output = true;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::Unsupported`] for a pin outside the bank
    /// or one not configured as an output.
    pub fn set_level(&mut self, pin: u8, level: bool) -> Result<(), AutomationError> {
        let state = self.pin_mut(pin)?;
        if !state.output {
            return Err(AutomationError::unsupported(
                "GPIO input write",
                pin.to_string(),
            ));
        }
        state.level = level;
        Ok(())
    }

    fn pin_mut(&mut self, pin: u8) -> Result<&mut PinState, AutomationError> {
        self.pins
            .get_mut(usize::from(pin))
            .ok_or_else(|| AutomationError::unsupported("GPIO pin", pin.to_string()))
    }
}
