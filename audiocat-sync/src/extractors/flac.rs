//! FLAC reader

use super::{ContainerFamily, GainKeyNames, TagReader, TechnicalProps};
use lofty::file::FileType;

/// Vorbis comment field names; lookups are exact, so both cases are listed
static GAIN_NAMES: GainKeyNames = GainKeyNames {
    track_gain: &["REPLAYGAIN_TRACK_GAIN", "replaygain_track_gain", "RG_TRACK_GAIN"],
    track_peak: &["REPLAYGAIN_TRACK_PEAK", "replaygain_track_peak", "RG_TRACK_PEAK"],
    album_gain: &["REPLAYGAIN_ALBUM_GAIN", "replaygain_album_gain", "RG_ALBUM_GAIN"],
    album_peak: &["REPLAYGAIN_ALBUM_PEAK", "replaygain_album_peak", "RG_ALBUM_PEAK"],
};

pub struct FlacReader;

impl TagReader for FlacReader {
    fn family(&self) -> ContainerFamily {
        ContainerFamily::Flac
    }

    fn file_type(&self) -> FileType {
        FileType::Flac
    }

    fn album_artist_names(&self) -> &'static [&'static str] {
        &["ALBUM ARTIST", "ALBUMARTIST", "album artist", "albumartist", "ENSEMBLE"]
    }

    fn gain_names(&self) -> &'static GainKeyNames {
        &GAIN_NAMES
    }

    /// File size in bits over duration; STREAMINFO bitrates are unreliable
    fn bitrate_kbps(&self, props: &TechnicalProps) -> u32 {
        match props.duration {
            Some(duration) if duration.as_secs_f64() > 0.0 => {
                let bits = props.file_size as f64 * 8.0;
                (bits / duration.as_secs_f64() / 1000.0).round() as u32
            }
            _ => 0,
        }
    }
}
