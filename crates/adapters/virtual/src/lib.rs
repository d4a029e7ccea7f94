//! # autorule-adapter-virtual
//!
//! Simulated board hardware for development, demos and integration tests.
//!
//! ## Provided devices
//!
//! | Port | Device | Behaviour |
//! |------|--------|-----------|
//! | `LedController` | `led_touch` (1 px), `led_board` (28 px), `led_matrix` (256 px) | Pixel buffers with one running effect each |
//! | `GpioController` | 49-pin bank | Output pins hold their level |
//! | `PowerController` | `agx`, `lpmu` | Off / On / Booting state machine |
//!
//! ## Dependency rule
//!
//! Depends on `autorule-app` (port traits) and `autorule-domain` only.

mod devices;

use std::sync::{Mutex, MutexGuard, PoisonError};

use autorule_app::ports::{GpioController, LedController, PowerController};
use autorule_domain::automation::{DeviceTarget, Rgb};
use autorule_domain::error::{AutomationError, NotFoundError};

pub use devices::{Effect, GPIO_PIN_COUNT, PinState, PowerState};
use devices::{GpioBank, LedStrip, PowerRail};

/// Every simulated device behind one handle.
pub struct VirtualHardware {
    leds: Mutex<Vec<LedStrip>>,
    gpio: Mutex<GpioBank>,
    power: Mutex<Vec<PowerRail>>,
}

impl Default for VirtualHardware {
    fn default() -> Self {
        Self {
            leds: Mutex::new(vec![
                LedStrip::new("led_touch", 1),
                LedStrip::new("led_board", 28),
                LedStrip::new("led_matrix", 256),
            ]),
            gpio: Mutex::new(GpioBank::default()),
            power: Mutex::new(vec![
                PowerRail::new(DeviceTarget::Agx),
                PowerRail::new(DeviceTarget::Lpmu),
            ]),
        }
    }
}

impl VirtualHardware {
    /// Current pixel buffer of `device`.
    #[must_use]
    pub fn pixels(&self, device: &str) -> Option<Vec<Rgb>> {
        self.lock_leds()
            .iter()
            .find(|strip| strip.name() == device)
            .map(|strip| strip.pixels().to_vec())
    }

    /// Effect running on `device`, if any.
    #[must_use]
    pub fn effect(&self, device: &str) -> Option<Effect> {
        self.lock_leds()
            .iter()
            .find(|strip| strip.name() == device)
            .and_then(|strip| strip.effect().cloned())
    }

    #[must_use]
    pub fn pin(&self, pin: u8) -> Option<PinState> {
        self.lock_gpio().pin(pin)
    }

    #[must_use]
    pub fn power_state(&self, target: DeviceTarget) -> PowerState {
        self.lock_power()
            .iter()
            .find(|rail| rail.target() == target)
            .map_or(PowerState::Error, PowerRail::state)
    }

    /// Whether `target` was last restarted into its recovery mode.
    #[must_use]
    pub fn in_recovery(&self, target: DeviceTarget) -> bool {
        self.lock_power()
            .iter()
            .any(|rail| rail.target() == target && rail.in_recovery())
    }

    fn with_strip<T>(
        &self,
        device: &str,
        f: impl FnOnce(&mut LedStrip) -> Result<T, AutomationError>,
    ) -> Result<T, AutomationError> {
        let mut leds = self.lock_leds();
        let strip = leds
            .iter_mut()
            .find(|strip| strip.name() == device)
            .ok_or_else(|| NotFoundError {
                entity: "LedDevice",
                id: device.to_string(),
            })?;
        f(strip)
    }

    fn with_rail(
        &self,
        target: DeviceTarget,
        f: impl FnOnce(&mut PowerRail) -> Result<(), AutomationError>,
    ) -> Result<(), AutomationError> {
        let mut power = self.lock_power();
        let rail = power
            .iter_mut()
            .find(|rail| rail.target() == target)
            .ok_or_else(|| NotFoundError {
                entity: "Device",
                id: target.to_string(),
            })?;
        f(&mut *rail)?;
        tracing::info!(%target, state = %rail.state(), "power state changed");
        Ok(())
    }

    fn lock_leds(&self) -> MutexGuard<'_, Vec<LedStrip>> {
        self.leds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_gpio(&self) -> MutexGuard<'_, GpioBank> {
        self.gpio.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_power(&self) -> MutexGuard<'_, Vec<PowerRail>> {
        self.power.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LedController for VirtualHardware {
    fn resolve(&self, name: &str) -> Option<String> {
        self.lock_leds()
            .iter()
            .find(|strip| strip.name() == name)
            .map(|strip| strip.name().to_string())
    }

    async fn fill(&self, device: &str, color: Rgb) -> Result<(), AutomationError> {
        self.with_strip(device, |strip| {
            strip.fill(color);
            Ok(())
        })
    }

    async fn set_pixel(&self, device: &str, index: u8, color: Rgb) -> Result<(), AutomationError> {
        self.with_strip(device, |strip| strip.set_pixel(index, color))
    }

    async fn start_effect(
        &self,
        device: &str,
        effect: &str,
        color: Rgb,
        duration_ms: u32,
    ) -> Result<(), AutomationError> {
        self.with_strip(device, |strip| {
            strip.start_effect(Effect {
                name: effect.to_string(),
                color,
                duration_ms,
            });
            Ok(())
        })?;
        tracing::debug!(device, effect, "effect started");
        Ok(())
    }

    async fn stop_effect(&self, device: &str) -> Result<(), AutomationError> {
        let stopped = self.with_strip(device, |strip| Ok(strip.stop_effect()))?;
        if let Some(effect) = stopped {
            tracing::debug!(device, effect = %effect.name, "effect stopped");
        }
        Ok(())
    }
}

impl GpioController for VirtualHardware {
    async fn configure_output(&self, pin: u8) -> Result<(), AutomationError> {
        self.lock_gpio().configure_output(pin)
    }

    async fn set_level(&self, pin: u8, level: bool) -> Result<(), AutomationError> {
        self.lock_gpio().set_level(pin, level)?;
        tracing::debug!(pin, level, "gpio level set");
        Ok(())
    }
}

impl PowerController for VirtualHardware {
    async fn power_on(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.with_rail(device, |rail| {
            rail.power_on();
            Ok(())
        })
    }

    async fn power_off(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.with_rail(device, PowerRail::power_off)
    }

    async fn force_off(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.with_rail(device, |rail| {
            rail.force_off();
            Ok(())
        })
    }

    async fn reset(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.with_rail(device, PowerRail::reset)
    }

    async fn enter_recovery(&self, device: DeviceTarget) -> Result<(), AutomationError> {
        self.with_rail(device, |rail| {
            rail.enter_recovery();
            Ok(())
        })
    }
}
