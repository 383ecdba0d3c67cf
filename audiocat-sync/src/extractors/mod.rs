//! Tag extraction
//!
//! One [`TagReader`] per supported container family, selected once from the
//! file extension. Readers turn a file into a normalized [`TrackTags`] record
//! or a typed [`ExtractError`]; nothing past this boundary ever sees a lofty
//! error.

pub mod flac;
pub mod mp4;
pub mod mpeg;
pub mod tag_fields;

use lofty::file::{FileType, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use tag_fields::{
    first_text, first_text_of, first_unknown, normalize_artist, or_sentinel, parse_gain,
    parse_track_number, parse_year, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_GENRE, UNKNOWN_TITLE,
};

/// Tag extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Extension is not one of the supported containers

    /// Container could not be parsed
    #[error("Unreadable {family} file {path}: {reason}")]
    Unreadable {
        path: PathBuf,
        family: ContainerFamily,
        reason: String,
    },

    /// I/O error (stat or open)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported container families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFamily {
    /// `.mp3`
    Mpeg,
    /// `.flac`
    Flac,
    /// `.m4a`
    Mp4,
}

impl ContainerFamily {
    /// Family for a path, by case-insensitive extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Mpeg),
            "flac" => Some(Self::Flac),
            "m4a" => Some(Self::Mp4),
            _ => None,
        }
    }

    /// Lossless containers derive bitrate from file size
    pub fn is_lossless(self) -> bool {
        matches!(self, Self::Flac)
    }

    /// Short format label stored on track rows
    pub fn label(self) -> &'static str {
        match self {
            Self::Mpeg => "MP3",
            Self::Flac => "FLAC",
            Self::Mp4 => "M4A",
        }
    }
}

impl fmt::Display for ContainerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Replay-gain values; absent and zero are distinct
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplayGain {
    pub track_gain: Option<f64>,
    pub track_peak: Option<f64>,
    pub album_gain: Option<f64>,
    pub album_peak: Option<f64>,
}

/// Free-form tag names tried after the generic key, per replay-gain field
#[derive(Debug)]
pub struct GainKeyNames {
    pub track_gain: &'static [&'static str],
    pub track_peak: &'static [&'static str],
    pub album_gain: &'static [&'static str],
    pub album_peak: &'static [&'static str],
}

/// Normalized per-file metadata
///
/// Text fields that identify a track are never empty: missing values carry
/// the `Unknown ...` sentinels.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTags {
    pub family: ContainerFamily,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Album-artist as tagged (explicit or alternate spelling), if any
    pub album_artist_tag: Option<String>,
    pub track_number: u32,
    pub year: Option<i32>,
    pub label: Option<String>,
    /// Seconds; `None` when the decoder reports no duration
    pub duration_secs: Option<f64>,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub bit_depth: u32,
    pub replay_gain: ReplayGain,
    pub has_lyrics: bool,
}

impl TrackTags {
    /// Album-artist with fallback to the track artist
    pub fn album_artist(&self) -> &str {
        self.album_artist_tag.as_deref().unwrap_or(&self.artist)
    }

    /// Album-artist tag if present, else the artist credit without
    /// featuring/collaboration suffixes
    pub fn primary_artist(&self) -> String {
        match &self.album_artist_tag {
            Some(album_artist) => album_artist.clone(),
            None => normalize_artist(&self.artist),
        }
    }
}

/// Technical block from the decoder, decoupled from lofty's property type
#[derive(Debug, Clone, Copy, Default)]
pub struct TechnicalProps {
    pub duration: Option<Duration>,
    pub audio_bitrate_kbps: Option<u32>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u8>,
    pub file_size: u64,
}

/// Per-container tag reading strategy
pub trait TagReader: Send + Sync {
    /// Container family handled by this reader
    fn family(&self) -> ContainerFamily;

    /// lofty parser to force, regardless of content sniffing
    fn file_type(&self) -> FileType;

    /// Free-form names for album-artist when the generic key is absent
    fn album_artist_names(&self) -> &'static [&'static str];

    /// Free-form replay-gain names for this family
    fn gain_names(&self) -> &'static GainKeyNames;

    /// Bitrate in kbps from the technical block
    fn bitrate_kbps(&self, props: &TechnicalProps) -> u32;

    /// Read and normalize one file
    fn read(&self, path: &Path) -> Result<TrackTags, ExtractError> {
        let file_size = std::fs::metadata(path)?.len();

        let unreadable = |e: lofty::error::LoftyError| ExtractError::Unreadable {
            path: path.to_path_buf(),
            family: self.family(),
            reason: e.to_string(),
        };

        let tagged_file = Probe::open(path)
            .map_err(unreadable)?
            .set_file_type(self.file_type())
            .read()
            .map_err(unreadable)?;

        let properties = tagged_file.properties();
        let duration = properties.duration();
        let props = TechnicalProps {
            duration: (!duration.is_zero()).then_some(duration),
            // lofty already reports kbps
            audio_bitrate_kbps: properties.audio_bitrate(),
            sample_rate: properties.sample_rate(),
            bit_depth: properties.bit_depth(),
            file_size,
        };

        // Primary tag first, then any others the file carries
        let mut tags: Vec<&Tag> = Vec::new();
        if let Some(primary) = tagged_file.primary_tag() {
            tags.push(primary);
        }
        for tag in tagged_file.tags() {
            if !tags.iter().any(|t| std::ptr::eq(*t, tag)) {
                tags.push(tag);
            }
        }

        let record = normalize(self, &tags, &props);

        tracing::debug!(
            file = %path.display(),
            artist = %record.artist,
            title = %record.title,
            bitrate_kbps = record.bitrate_kbps,
            "Extracted tags"
        );

        Ok(record)
    }
}

/// Build the normalized record from already-parsed tags
pub fn normalize<R: TagReader + ?Sized>(
    reader: &R,
    tags: &[&Tag],
    props: &TechnicalProps,
) -> TrackTags {
    let album_artist_tag = first_text(tags, &ItemKey::AlbumArtist)
        .or_else(|| first_unknown(tags, reader.album_artist_names()));

    let gain_names = reader.gain_names();
    let gain = |key: ItemKey, names: &[&str]| {
        let raw = first_text(tags, &key).or_else(|| first_unknown(tags, names));
        parse_gain(raw.as_deref())
    };

    let replay_gain = ReplayGain {
        track_gain: gain(ItemKey::ReplayGainTrackGain, gain_names.track_gain),
        track_peak: gain(ItemKey::ReplayGainTrackPeak, gain_names.track_peak),
        album_gain: gain(ItemKey::ReplayGainAlbumGain, gain_names.album_gain),
        album_peak: gain(ItemKey::ReplayGainAlbumPeak, gain_names.album_peak),
    };

    TrackTags {
        family: reader.family(),
        title: or_sentinel(first_text(tags, &ItemKey::TrackTitle), UNKNOWN_TITLE),
        artist: or_sentinel(first_text(tags, &ItemKey::TrackArtist), UNKNOWN_ARTIST),
        album: or_sentinel(first_text(tags, &ItemKey::AlbumTitle), UNKNOWN_ALBUM),
        genre: or_sentinel(first_text(tags, &ItemKey::Genre), UNKNOWN_GENRE),
        album_artist_tag,
        track_number: parse_track_number(first_text(tags, &ItemKey::TrackNumber).as_deref()),
        year: parse_year(
            first_text_of(tags, &[ItemKey::Year, ItemKey::RecordingDate]).as_deref(),
        ),
        label: first_text(tags, &ItemKey::Label),
        duration_secs: props.duration.map(|d| d.as_secs_f64()),
        bitrate_kbps: reader.bitrate_kbps(props),
        sample_rate: props.sample_rate.unwrap_or(0),
        bit_depth: props.bit_depth.map(u32::from).unwrap_or(0),
        replay_gain,
        has_lyrics: first_text(tags, &ItemKey::Lyrics).is_some(),
    }
}

/// Reader for a container family
pub fn reader_for(family: ContainerFamily) -> &'static dyn TagReader {
    match family {
        ContainerFamily::Mpeg => &mpeg::MpegReader,
        ContainerFamily::Flac => &flac::FlacReader,
        ContainerFamily::Mp4 => &mp4::Mp4Reader,
    }
}

/// Source of normalized tags for a path
///
/// The catalog pipeline only talks to this trait, so it can be driven by
/// something other than real audio files.
pub trait TagSource: Send + Sync {
    fn read_tags(&self, path: &Path, family: ContainerFamily) -> Result<TrackTags, ExtractError>;
}

/// Tag source backed by lofty
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagSource;

impl TagSource for LoftyTagSource {
    fn read_tags(&self, path: &Path, family: ContainerFamily) -> Result<TrackTags, ExtractError> {
        reader_for(family).read(path)
    }
}
