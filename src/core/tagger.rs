use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::TaggerOptions;
use crate::core::cover::Cover;
use crate::core::flac::FlacTagger;
use crate::core::mp3::Mp3Tagger;
use crate::error::{Error, Result};
use crate::models::TrackInfo;

/// Tag writer shared by every supported container.
///
/// Text setters only fill fields that are missing from the loaded tag;
/// existing values are never replaced. Cover setters always add a new
/// front-cover picture. Nothing reaches the file until [`Tagger::finalize`].
pub trait Tagger {
    /// Adds a front-cover picture.
    fn add_cover(&mut self, cover: Cover) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
    fn set_album(&mut self, album: &str) -> Result<()>;
    /// Stores one artist entry per element, in order.
    fn set_artist(&mut self, artists: &[String]) -> Result<()>;
    /// Containers without a comment field accept and discard the value.
    fn set_comment(&mut self, comment: &str) -> Result<()>;
    /// Writes the accumulated tag back to the file and ends the session.
    fn finalize(self: Box<Self>) -> Result<()>;

    /// Embeds raw image bytes as the front cover.
    fn set_cover(&mut self, data: Vec<u8>, mime_type: &str) -> Result<()> {
        self.add_cover(Cover::embedded(data, mime_type))
    }

    /// Stores `url` as the front cover, flagged with the URL marker MIME type.
    fn set_cover_url(&mut self, url: &str) -> Result<()> {
        self.add_cover(Cover::url(url))
    }
}

/// Supported audio containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Mp3,
    Flac,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Mp3 => "mp3",
            Format::Flac => "flac",
        }
    }

    /// Infers the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(Format::Mp3),
            "flac" => Ok(Format::Flac),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens a tagging session for `path` using default options.
pub fn open_tagger(path: impl AsRef<Path>, format: &str) -> Result<Box<dyn Tagger>> {
    open_tagger_with(path, format, &TaggerOptions::default())
}

/// Opens a tagging session for `path`. The format name is resolved before
/// the file is touched.
pub fn open_tagger_with(
    path: impl AsRef<Path>,
    format: &str,
    options: &TaggerOptions,
) -> Result<Box<dyn Tagger>> {
    let format: Format = format.parse()?;
    Ok(match format {
        Format::Mp3 => Box::new(Mp3Tagger::open(path, options)?),
        Format::Flac => Box::new(FlacTagger::open(path, options)?),
    })
}

/// Applies every populated field of `info` to the session. Does not finalize.
pub fn fill(tagger: &mut dyn Tagger, info: TrackInfo) -> Result<()> {
    if let Some(ref title) = info.title {
        tagger.set_title(title)?;
    }
    if let Some(ref album) = info.album {
        tagger.set_album(album)?;
    }
    if !info.artists.is_empty() {
        tagger.set_artist(&info.artists)?;
    }
    if let Some(ref comment) = info.comment {
        tagger.set_comment(comment)?;
    }
    for cover in info.covers {
        tagger.add_cover(cover)?;
    }
    Ok(())
}
