use crate::codec::MidiCodec;
use crate::error::{LimiterError, Result};
use crate::model::midi::*;
use log::debug;
use midly::num::{u4, u7, u15, u28};
use midly::{MidiMessage, Smf, TrackEvent, TrackEventKind};

/// Standard MIDI File codec backed by `midly`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmfCodec;

impl MidiCodec for SmfCodec {
    type Other<'a> = TrackEventKind<'a>;

    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<MidiFile<TrackEventKind<'a>>> {
        let smf = Smf::parse(bytes)?;

        if smf.header.format == midly::Format::SingleTrack && smf.tracks.len() != 1 {
            return Err(LimiterError::Decode(format!(
                "single-track file holds {} tracks",
                smf.tracks.len()
            )));
        }

        debug!(
            "MIDI format: {:?}, timing: {:?}, tracks: {}",
            smf.header.format,
            smf.header.timing,
            smf.tracks.len()
        );

        let header = Header {
            format: format_from_smf(smf.header.format),
            timing: timing_from_smf(smf.header.timing),
        };

        let tracks = smf
            .tracks
            .into_iter()
            .map(|track| Track {
                events: track.into_iter().map(event_from_smf).collect(),
            })
            .collect();

        Ok(MidiFile { header, tracks })
    }

    fn encode(&self, midi: &MidiFile<TrackEventKind<'_>>) -> Result<Vec<u8>> {
        let header = midly::Header::new(
            format_to_smf(midi.header.format),
            timing_to_smf(midi.header.timing),
        );

        let mut smf = Smf::new(header);
        smf.tracks = midi
            .tracks
            .iter()
            .map(|track| track.events.iter().map(event_to_smf).collect())
            .collect();

        let mut out = Vec::new();
        smf.write_std(&mut out)?;
        Ok(out)
    }
}

fn event_from_smf(event: TrackEvent<'_>) -> Event<TrackEventKind<'_>> {
    let delta = event.delta.as_int();
    match event.kind {
        TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        } => Event::note_on(delta, channel.as_int(), key.as_int(), vel.as_int()),
        other => Event::other(delta, other),
    }
}

fn event_to_smf<'a>(event: &Event<TrackEventKind<'a>>) -> TrackEvent<'a> {
    let kind = match &event.kind {
        EventKind::NoteOn {
            channel,
            key,
            velocity,
        } => TrackEventKind::Midi {
            channel: u4::new((*channel).min(15)),
            message: MidiMessage::NoteOn {
                key: u7::new((*key).min(127)),
                vel: u7::new((*velocity).min(127)),
            },
        },
        EventKind::Other(kind) => kind.clone(),
    };

    TrackEvent {
        delta: u28::new(event.delta.min(0x0FFF_FFFF)),
        kind,
    }
}

fn format_from_smf(format: midly::Format) -> Format {
    match format {
        midly::Format::SingleTrack => Format::SingleTrack,
        midly::Format::Parallel => Format::Parallel,
        midly::Format::Sequential => Format::Sequential,
    }
}

fn format_to_smf(format: Format) -> midly::Format {
    match format {
        Format::SingleTrack => midly::Format::SingleTrack,
        Format::Parallel => midly::Format::Parallel,
        Format::Sequential => midly::Format::Sequential,
    }
}

fn timing_from_smf(timing: midly::Timing) -> Timing {
    match timing {
        midly::Timing::Metrical(ticks) => Timing::Metrical(ticks.as_int()),
        midly::Timing::Timecode(fps, subframe) => Timing::Timecode {
            fps: match fps {
                midly::Fps::Fps24 => Fps::Fps24,
                midly::Fps::Fps25 => Fps::Fps25,
                midly::Fps::Fps29 => Fps::Fps29,
                midly::Fps::Fps30 => Fps::Fps30,
            },
            subframe,
        },
    }
}

fn timing_to_smf(timing: Timing) -> midly::Timing {
    match timing {
        Timing::Metrical(ticks) => midly::Timing::Metrical(u15::new(ticks.min(0x7FFF))),
        Timing::Timecode { fps, subframe } => {
            let fps = match fps {
                Fps::Fps24 => midly::Fps::Fps24,
                Fps::Fps25 => midly::Fps::Fps25,
                Fps::Fps29 => midly::Fps::Fps29,
                Fps::Fps30 => midly::Fps::Fps30,
            };
            midly::Timing::Timecode(fps, subframe)
        }
    }
}
