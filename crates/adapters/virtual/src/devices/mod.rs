//! Simulated hardware blocks — LED strips, GPIO bank, power-managed modules.
//!
//! Each block is plain state with synchronous operations; the port
//! implementations in the crate root wrap them in mutexes.

mod gpio;
mod led;
mod power;

pub use gpio::{GPIO_PIN_COUNT, GpioBank, PinState};
pub use led::{Effect, LedStrip};
pub use power::{PowerRail, PowerState};
