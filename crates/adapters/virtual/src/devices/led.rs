//! Virtual LED strip — a pixel buffer plus an optional running effect.

use autorule_domain::automation::Rgb;
use autorule_domain::error::AutomationError;

/// Effect currently driving a strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub name: String,
    pub color: Rgb,
    /// Zero means "until stopped".
    pub duration_ms: u32,
}

/// A named strip of addressable pixels.
#[derive(Debug, Clone)]
pub struct LedStrip {
    name: &'static str,
    pixels: Vec<Rgb>,
    effect: Option<Effect>,
}

impl LedStrip {
    #[must_use]
    pub fn new(name: &'static str, len: usize) -> Self {
        Self {
            name,
            pixels: vec![Rgb::default(); len],
            effect: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    #[must_use]
    pub fn effect(&self) -> Option<&Effect> {
        self.effect.as_ref()
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::Unsupported`] when `index` is past the
    /// end of the strip.
    pub fn set_pixel(&mut self, index: u8, color: Rgb) -> Result<(), AutomationError> {
        let pixel = self
            .pixels
            .get_mut(usize::from(index))
            .ok_or_else(|| AutomationError::unsupported("pixel index", index.to_string()))?;
        *pixel = color;
        Ok(())
    }

    pub fn start_effect(&mut self, effect: Effect) {
        self.effect = Some(effect);
    }

    /// Returns the effect that was running, if any.
    pub fn stop_effect(&mut self) -> Option<Effect> {
        self.effect.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);

    #[test]
    fn should_start_dark() {
        let strip = LedStrip::new("led_board", 4);
        assert!(strip.pixels().iter().all(|pixel| *pixel == Rgb::default()));
        assert!(strip.effect().is_none());
    }

    #[test]
    fn should_paint_one_pixel() {
        let mut strip = LedStrip::new("led_board", 4);
        strip.set_pixel(2, RED).unwrap();
        assert_eq!(strip.pixels()[2], RED);
        assert_eq!(strip.pixels()[1], Rgb::default());
    }

    #[test]
    fn should_reject_pixel_past_end() {
        let mut strip = LedStrip::new("led_touch", 1);
        assert!(matches!(
            strip.set_pixel(1, RED),
            Err(AutomationError::Unsupported { .. })
        ));
    }

    #[test]
    fn should_replace_running_effect() {
        let mut strip = LedStrip::new("led_matrix", 8);
        strip.start_effect(Effect {
            name: "rainbow".to_string(),
            color: RED,
            duration_ms: 0,
        });
        strip.start_effect(Effect {
            name: "breathing".to_string(),
            color: RED,
            duration_ms: 500,
        });
        assert_eq!(strip.stop_effect().unwrap().name, "breathing");
        assert!(strip.stop_effect().is_none());
    }
}
