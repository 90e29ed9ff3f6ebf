/// Layout of the tracks inside a file, carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    SingleTrack,
    Parallel,
    Sequential,
}

/// SMPTE frame rates a Standard MIDI File can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fps {
    Fps24,
    Fps25,
    /// 29.97, drop-frame.
    Fps29,
    Fps30,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// Ticks per quarter note.
    Metrical(u16),
    Timecode { fps: Fps, subframe: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    pub timing: Timing,
}

/// The only event the limiter looks at is a note-on. Everything else is kept
/// in whatever form the codec decoded it to and written back verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind<O> {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    Other(O),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event<O> {
    /// Ticks since the previous event in the same track.
    pub delta: u32,
    pub kind: EventKind<O>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track<O> {
    pub events: Vec<Event<O>>,
}

impl<O> Default for Track<O> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidiFile<O> {
    pub header: Header,
    pub tracks: Vec<Track<O>>,
}

impl<O> Event<O> {
    pub fn note_on(delta: u32, channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            delta,
            kind: EventKind::NoteOn {
                channel,
                key,
                velocity,
            },
        }
    }

    pub fn other(delta: u32, other: O) -> Self {
        Self {
            delta,
            kind: EventKind::Other(other),
        }
    }
}

impl<O> MidiFile<O> {
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|track| track.events.len()).sum()
    }

    /// Velocities of every note-on, in track then event order.
    pub fn note_on_velocities(&self) -> Vec<u8> {
        self.tracks
            .iter()
            .flat_map(|track| track.events.iter())
            .filter_map(|event| match event.kind {
                EventKind::NoteOn { velocity, .. } => Some(velocity),
                EventKind::Other(_) => None,
            })
            .collect()
    }
}
