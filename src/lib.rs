//! Fill missing title, album, artist, comment and cover art in MP3 (ID3v2)
//! and FLAC (Vorbis comment) files without touching existing metadata.

pub mod config;
pub mod core;
pub mod error;
pub mod models;

pub use crate::core::cover::{Cover, COVER_URL_MIME};
pub use crate::core::reader::read_tags;
pub use crate::core::tagger::{fill, open_tagger, open_tagger_with, Format, Tagger};
pub use crate::error::{Error, Result};
pub use crate::models::TrackInfo;
