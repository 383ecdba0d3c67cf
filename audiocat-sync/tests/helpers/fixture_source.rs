//! Tag source for fixture files
//!
//! Fixture "audio" files hold their tags as JSON. Anything that does not
//! parse is reported as unreadable, like a corrupt container would be.

use audiocat_sync::extractors::{ContainerFamily, ExtractError, ReplayGain, TagSource, TrackTags};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub album_artist: Option<String>,
    pub track_number: u32,
    pub year: Option<i32>,
    pub bitrate: u32,
    pub has_lyrics: bool,
}

impl FixtureTags {
    pub fn new(title: &str, artist: &str, album: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            genre: "Rock".to_string(),
            album_artist: None,
            track_number: 0,
            year: Some(1999),
            bitrate: 256,
            has_lyrics: false,
        }
    }

    pub fn genre(mut self, genre: &str) -> Self {
        self.genre = genre.to_string();
        self
    }

    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn album_artist(mut self, album_artist: &str) -> Self {
        self.album_artist = Some(album_artist.to_string());
        self
    }
}

pub struct FixtureTagSource;

impl TagSource for FixtureTagSource {
    fn read_tags(&self, path: &Path, family: ContainerFamily) -> Result<TrackTags, ExtractError> {
        let unreadable = |reason: String| ExtractError::Unreadable {
            path: path.to_path_buf(),
            family,
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let tags: FixtureTags = serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;

        Ok(TrackTags {
            family,
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            genre: tags.genre,
            album_artist_tag: tags.album_artist,
            track_number: tags.track_number,
            year: tags.year,
            label: None,
            duration_secs: Some(180.0),
            bitrate_kbps: tags.bitrate,
            sample_rate: 44100,
            bit_depth: if family.is_lossless() { 16 } else { 0 },
            replay_gain: ReplayGain::default(),
            has_lyrics: tags.has_lyrics,
        })
    }
}
