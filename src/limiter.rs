use crate::codec::MidiCodec;
use crate::error::Result;
use crate::model::midi::{EventKind, MidiFile};
use crate::model::velocity::VelocityRange;
use log::debug;
use std::cmp::Ordering;

/// What a limiting pass did to the note-ons it visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitReport {
    pub raised: usize,
    pub lowered: usize,
    pub unchanged: usize,
    /// Velocity-0 note-ons, which are left alone.
    pub note_offs: usize,
}

impl LimitReport {
    pub fn changed(&self) -> usize {
        self.raised + self.lowered
    }

    pub fn note_ons(&self) -> usize {
        self.raised + self.lowered + self.unchanged
    }
}

/// Clamp the velocity of every sounding note-on in `midi` into `range`, in place.
///
/// Only velocities change: event order, deltas, keys, channels and every non note-on
/// event are left exactly as decoded.
pub fn limit_velocities<O>(midi: &mut MidiFile<O>, range: VelocityRange) -> LimitReport {
    let mut report = LimitReport::default();

    for track in midi.tracks.iter_mut() {
        for event in track.events.iter_mut() {
            let EventKind::NoteOn { velocity, .. } = &mut event.kind else {
                continue;
            };

            if *velocity == 0 {
                report.note_offs += 1;
                continue;
            }

            let limited = range.apply(*velocity);
            match limited.cmp(velocity) {
                Ordering::Greater => report.raised += 1,
                Ordering::Less => report.lowered += 1,
                Ordering::Equal => report.unchanged += 1,
            }
            *velocity = limited;
        }
    }

    report
}

/// Decode `bytes`, limit every note-on velocity, and encode the result.
pub fn limit_midi_bytes<C: MidiCodec>(
    codec: &C,
    bytes: &[u8],
    range: VelocityRange,
) -> Result<(Vec<u8>, LimitReport)> {
    let mut midi = codec.decode(bytes)?;
    let report = limit_velocities(&mut midi, range);

    debug!(
        "Limited {} of {} note-on(s) into [{}..={}] across {} track(s) (raised: {}, lowered: {}, note-offs skipped: {})..!",
        report.changed(),
        report.note_ons(),
        range.min,
        range.max,
        midi.tracks.len(),
        report.raised,
        report.lowered,
        report.note_offs
    );

    let out = codec.encode(&midi)?;
    Ok((out, report))
}
