use thiserror::Error;

use crate::core::tagger::Format;

/// Errors produced while loading, filling or writing a tag.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The existing tag data could not be decoded.
    #[error("malformed {format} tag data: {reason}")]
    TagParse { format: Format, reason: String },
    /// The format name does not map to a supported container.
    #[error("format: {0} is not supported")]
    UnsupportedFormat(String),
    /// Reading or writing the file failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Cover bytes do not match the declared MIME type.
    #[error("cannot encode {mime_type} cover: {reason}")]
    PictureEncode { mime_type: String, reason: String },
    /// The codec refused to serialize the tag.
    #[error("cannot write {format} tag: {reason}")]
    TagWrite { format: Format, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps an I/O failure hit while decoding tag data. A short read means
    /// the tag claims more bytes than the file holds.
    pub(crate) fn from_tag_io(format: Format, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::TagParse {
                format,
                reason: format!("truncated tag data: {}", err),
            }
        } else {
            Self::Io(err)
        }
    }

    /// Maps an `id3` read failure. `NoTag` is handled by the caller.
    pub(crate) fn from_id3_read(err: id3::Error) -> Self {
        match err.kind {
            id3::ErrorKind::Io(io) => Self::from_tag_io(Format::Mp3, io),
            _ => Self::TagParse {
                format: Format::Mp3,
                reason: err.description.to_string(),
            },
        }
    }

    pub(crate) fn from_id3_write(err: id3::Error) -> Self {
        match err.kind {
            id3::ErrorKind::Io(io) => Self::Io(io),
            _ => Self::TagWrite {
                format: Format::Mp3,
                reason: err.description.to_string(),
            },
        }
    }

    pub(crate) fn from_flac_read(err: metaflac::Error) -> Self {
        match err.kind {
            metaflac::ErrorKind::Io(io) => Self::from_tag_io(Format::Flac, io),
            _ => Self::TagParse {
                format: Format::Flac,
                reason: err.description.to_string(),
            },
        }
    }

    pub(crate) fn from_flac_write(err: metaflac::Error) -> Self {
        match err.kind {
            metaflac::ErrorKind::Io(io) => Self::Io(io),
            _ => Self::TagWrite {
                format: Format::Flac,
                reason: err.description.to_string(),
            },
        }
    }
}
