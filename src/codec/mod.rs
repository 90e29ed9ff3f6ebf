use crate::error::Result;
use crate::model::midi::MidiFile;

pub mod smf;

pub use smf::SmfCodec;

pub type DefaultCodec = SmfCodec;

/// Turns raw file bytes into a [`MidiFile`] and back.
///
/// `Other` is the codec's own representation of every event that isn't a note-on.
/// It may borrow from the decoded bytes.
pub trait MidiCodec: Send + Sync {
    type Other<'a>;

    /// Decoding failures are reported as [`crate::LimiterError::Decode`].
    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<MidiFile<Self::Other<'a>>>;

    fn encode(&self, midi: &MidiFile<Self::Other<'_>>) -> Result<Vec<u8>>;
}
