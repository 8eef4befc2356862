//! Global musical parameters: key, scale mode, and the epoch context
//! the ritual mutates.

use serde::{Deserialize, Serialize};

use crate::Millis;

/// BPM bounds for nominations and random epochs.
pub const BPM_MIN: u16 = 60;
pub const BPM_MAX: u16 = 200;

/// Musical key (pitch class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    C,
    #[serde(rename = "C#")]
    Cs,
    D,
    #[serde(rename = "D#")]
    Ds,
    E,
    F,
    #[serde(rename = "F#")]
    Fs,
    G,
    #[serde(rename = "G#")]
    Gs,
    A,
    #[serde(rename = "A#")]
    As,
    B,
}

impl Key {
    pub const ALL: [Key; 12] = [
        Key::C,
        Key::Cs,
        Key::D,
        Key::Ds,
        Key::E,
        Key::F,
        Key::Fs,
        Key::G,
        Key::Gs,
        Key::A,
        Key::As,
        Key::B,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Key::C => "C",
            Key::Cs => "C#",
            Key::D => "D",
            Key::Ds => "D#",
            Key::E => "E",
            Key::F => "F",
            Key::Fs => "F#",
            Key::G => "G",
            Key::Gs => "G#",
            Key::A => "A",
            Key::As => "A#",
            Key::B => "B",
        }
    }

    /// Pitch class as semitones above C.
    pub fn semitone(&self) -> i32 {
        match self {
            Key::C => 0,
            Key::Cs => 1,
            Key::D => 2,
            Key::Ds => 3,
            Key::E => 4,
            Key::F => 5,
            Key::Fs => 6,
            Key::G => 7,
            Key::Gs => 8,
            Key::A => 9,
            Key::As => 10,
            Key::B => 11,
        }
    }

    /// Parse a chromatic name like `"F#"`.
    pub fn parse(s: &str) -> Option<Key> {
        Key::ALL.iter().copied().find(|k| k.name() == s)
    }
}

/// Scale definition as intervals from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    Major,
    Minor,
    Dorian,
    Mixolydian,
    Pentatonic,
    Blues,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 6] = [
        ScaleMode::Major,
        ScaleMode::Minor,
        ScaleMode::Dorian,
        ScaleMode::Mixolydian,
        ScaleMode::Pentatonic,
        ScaleMode::Blues,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScaleMode::Major => "major",
            ScaleMode::Minor => "minor",
            ScaleMode::Dorian => "dorian",
            ScaleMode::Mixolydian => "mixolydian",
            ScaleMode::Pentatonic => "pentatonic",
            ScaleMode::Blues => "blues",
        }
    }

    pub fn parse(s: &str) -> Option<ScaleMode> {
        ScaleMode::ALL.iter().copied().find(|m| m.name() == s)
    }

    /// Semitone intervals from root for this mode.
    pub fn intervals(&self) -> &'static [i32] {
        match self {
            ScaleMode::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleMode::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleMode::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleMode::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleMode::Pentatonic => &[0, 2, 4, 7, 9],
            ScaleMode::Blues => &[0, 3, 5, 6, 7, 10],
        }
    }
}

/// Note names of a scale rooted at `key`.
pub fn scale_notes(key: Key, mode: ScaleMode) -> Vec<String> {
    mode.intervals()
        .iter()
        .map(|interval| {
            let pc = (key.semitone() + interval).rem_euclid(12) as usize;
            Key::ALL[pc].name().to_string()
        })
        .collect()
}

/// The current global musical parameters. Mutated only by the ritual
/// (or a reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochContext {
    pub epoch: u64,
    pub bpm: u16,
    pub key: Key,
    pub scale: ScaleMode,
    pub scale_notes: Vec<String>,
    pub started_at: Millis,
}

impl EpochContext {
    /// The boot/reset epoch: 120 BPM, C pentatonic.
    pub fn initial(now: Millis) -> Self {
        Self {
            epoch: 1,
            bpm: 120,
            key: Key::C,
            scale: ScaleMode::Pentatonic,
            scale_notes: scale_notes(Key::C, ScaleMode::Pentatonic),
            started_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_notes_wrap_the_octave() {
        assert_eq!(scale_notes(Key::C, ScaleMode::Pentatonic), ["C", "D", "E", "G", "A"]);
        assert_eq!(
            scale_notes(Key::A, ScaleMode::Minor),
            ["A", "B", "C", "D", "E", "F", "G"]
        );
    }

    #[test]
    fn key_parse_roundtrip() {
        for k in Key::ALL {
            assert_eq!(Key::parse(k.name()), Some(k));
        }
        assert_eq!(Key::parse("H"), None);
    }

    #[test]
    fn key_serializes_as_chromatic_name() {
        assert_eq!(serde_json::to_string(&Key::Fs).unwrap(), "\"F#\"");
    }
}
