//! MPEG-4 audio (`.m4a`) reader

use super::{ContainerFamily, GainKeyNames, TagReader, TechnicalProps};
use lofty::file::FileType;

/// iTunes freeform atoms
static GAIN_NAMES: GainKeyNames = GainKeyNames {
    track_gain: &[
        "----:com.apple.iTunes:replaygain_track_gain",
        "----:com.apple.iTunes:REPLAYGAIN_TRACK_GAIN",
    ],
    track_peak: &[
        "----:com.apple.iTunes:replaygain_track_peak",
        "----:com.apple.iTunes:REPLAYGAIN_TRACK_PEAK",
    ],
    album_gain: &[
        "----:com.apple.iTunes:replaygain_album_gain",
        "----:com.apple.iTunes:REPLAYGAIN_ALBUM_GAIN",
    ],
    album_peak: &[
        "----:com.apple.iTunes:replaygain_album_peak",
        "----:com.apple.iTunes:REPLAYGAIN_ALBUM_PEAK",
    ],
};

pub struct Mp4Reader;

impl TagReader for Mp4Reader {
    fn family(&self) -> ContainerFamily {
        ContainerFamily::Mp4
    }

    fn file_type(&self) -> FileType {
        FileType::Mp4
    }

    fn album_artist_names(&self) -> &'static [&'static str] {
        &["----:com.apple.iTunes:ALBUM ARTIST", "----:com.apple.iTunes:ALBUMARTIST"]
    }

    fn gain_names(&self) -> &'static GainKeyNames {
        &GAIN_NAMES
    }

    /// Decoder-reported bitrate (AAC/ALAC stream)
    fn bitrate_kbps(&self, props: &TechnicalProps) -> u32 {
        props.audio_bitrate_kbps.unwrap_or(0)
    }
}
