//! Host audio service: "play sound by identifier at position".
//!
//! Opaque runtime collaborator. Played sounds are recorded as [`SoundEvent`]s so
//! tests can assert on what the patched code actually triggered.

use crate::host::Position;

/// One sound playback request issued to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEvent {
    /// Resource identifier of the sound.
    pub path: String,
    /// Where the sound was played.
    pub position: Position,
}

/// The host's audio subsystem.
#[derive(Default)]
pub struct Audio {
    events: Vec<SoundEvent>,
}

impl Audio {
    /// Plays the sound identified by `path` at `position`.
    pub fn play(&mut self, path: &str, position: Position) {
        log::trace!("Audio::Play {path}");
        self.events.push(SoundEvent {
            path: path.to_string(),
            position,
        });
    }

    /// Sounds played so far, in order.
    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    /// Drains the recorded sounds.
    pub fn take_events(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.events)
    }
}
