//! MPEG layer III (`.mp3`) reader

use super::{ContainerFamily, GainKeyNames, TagReader, TechnicalProps};
use lofty::file::FileType;

/// ID3 TXXX descriptions as written by common taggers
static GAIN_NAMES: GainKeyNames = GainKeyNames {
    track_gain: &["REPLAYGAIN_TRACK_GAIN", "replaygain_track_gain", "TXXX:REPLAYGAIN_TRACK_GAIN"],
    track_peak: &["REPLAYGAIN_TRACK_PEAK", "replaygain_track_peak", "TXXX:REPLAYGAIN_TRACK_PEAK"],
    album_gain: &["REPLAYGAIN_ALBUM_GAIN", "replaygain_album_gain", "TXXX:REPLAYGAIN_ALBUM_GAIN"],
    album_peak: &["REPLAYGAIN_ALBUM_PEAK", "replaygain_album_peak", "TXXX:REPLAYGAIN_ALBUM_PEAK"],
};

pub struct MpegReader;

impl TagReader for MpegReader {
    fn family(&self) -> ContainerFamily {
        ContainerFamily::Mpeg
    }

    fn file_type(&self) -> FileType {
        FileType::Mpeg
    }

    fn album_artist_names(&self) -> &'static [&'static str] {
        &["ALBUM ARTIST", "ALBUMARTIST", "TXXX:ALBUM ARTIST", "TXXX:ALBUMARTIST"]
    }

    fn gain_names(&self) -> &'static GainKeyNames {
        &GAIN_NAMES
    }

    /// Decoder-reported bitrate (lossy stream)
    fn bitrate_kbps(&self, props: &TechnicalProps) -> u32 {
        props.audio_bitrate_kbps.unwrap_or(0)
    }
}
