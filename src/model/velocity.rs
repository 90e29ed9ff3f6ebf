pub const MIDI_VELOCITY_MIN: i64 = 1;
pub const MIDI_VELOCITY_MAX: i64 = 127;

pub const DEFAULT_MIN_VELOCITY: i64 = 40;
pub const DEFAULT_MAX_VELOCITY: i64 = 100;

/// Caller-supplied velocity bounds.
///
/// The bounds are taken as given: nothing checks that they lie in `1..=127` or that
/// `min <= max`. [`VelocityRange::apply`] always lands inside the absolute MIDI range
/// anyway, so out-of-range bounds only ever saturate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityRange {
    pub min: i64,
    pub max: i64,
}

impl Default for VelocityRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_VELOCITY,
            max: DEFAULT_MAX_VELOCITY,
        }
    }
}

impl VelocityRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Clamp a single note-on velocity.
    ///
    /// A velocity of 0 is a note-off in disguise and is returned untouched.
    pub fn apply(&self, velocity: u8) -> u8 {
        if velocity == 0 {
            return 0;
        }

        let mut limited = velocity as i64;
        if limited < self.min {
            limited = self.min;
        } else if limited > self.max {
            limited = self.max;
        }

        limited.clamp(MIDI_VELOCITY_MIN, MIDI_VELOCITY_MAX) as u8
    }

    /// Whether `min` and `max` are both valid note-on velocities and correctly ordered.
    pub fn is_well_formed(&self) -> bool {
        (MIDI_VELOCITY_MIN..=MIDI_VELOCITY_MAX).contains(&self.min)
            && (MIDI_VELOCITY_MIN..=MIDI_VELOCITY_MAX).contains(&self.max)
            && self.min <= self.max
    }
}
