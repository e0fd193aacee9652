//! Button press classification.
//!
//! Each physical button gets one [`ButtonClassifier`] fed with a
//! de-glitched level sample every control tick. Edges are detected
//! against the classifier's own previously sampled level, never
//! against raw input, so a glitch between ticks cannot fabricate a
//! press. The sampling layer owns electrical debouncing.

/// Classification of a completed press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    /// Released before the long-press threshold.
    Short,
    /// Held at or beyond the long-press threshold.
    Long,
}

/// Per-button edge detector and hold timer.
///
/// The emitted classification is valid for exactly the tick on which
/// the release edge was sampled; the next call to [`Self::update`]
/// clears it. Delivery is therefore at-most-once per release.
#[derive(Debug, Clone)]
pub struct ButtonClassifier {
    long_press_ms: u64,
    was_pressed: bool,
    press_started_at: u64,
    released_at: u64,
    classification: Option<PressKind>,
}

impl ButtonClassifier {
    pub fn new(long_press_ms: u64) -> Self {
        Self {
            long_press_ms,
            was_pressed: false,
            press_started_at: 0,
            released_at: 0,
            classification: None,
        }
    }

    /// Feed this tick's sampled level. Returns the classification
    /// produced by a release edge on this tick, if any.
    pub fn update(&mut self, pressed: bool, now_millis: u64) -> Option<PressKind> {
        self.classification = None;

        if pressed && !self.was_pressed {
            self.press_started_at = now_millis;
        } else if !pressed && self.was_pressed {
            self.released_at = now_millis;
            let elapsed = now_millis.saturating_sub(self.press_started_at);
            self.classification = Some(if elapsed < self.long_press_ms {
                PressKind::Short
            } else {
                PressKind::Long
            });
        }

        self.was_pressed = pressed;
        self.classification
    }

    /// Classification from the most recent tick, `None` unless that
    /// tick sampled a release edge.
    pub fn classification(&self) -> Option<PressKind> {
        self.classification
    }

    /// Whether the button was down at the most recent sample.
    pub fn is_pressed(&self) -> bool {
        self.was_pressed
    }

    /// Timestamp of the most recent release edge.
    pub fn released_at(&self) -> u64 {
        self.released_at
    }
}
