use std::path::Path;

use id3::{Tag, TagLike};
use metaflac::block::{Block, BlockType};

use crate::core::cover::Cover;
use crate::core::flac::{check_block_chain, vorbis_values};
use crate::core::tagger::Format;
use crate::error::{Error, Result};
use crate::models::TrackInfo;

/// Reads the fields this crate manages from `path`.
///
/// MP3 files without a tag give an empty `TrackInfo`. For FLAC files the
/// last Vorbis comment block is used, since each finalize appends one.
pub fn read_tags(path: impl AsRef<Path>, format: Format) -> Result<TrackInfo> {
    match format {
        Format::Mp3 => read_mp3(path.as_ref()),
        Format::Flac => read_flac(path.as_ref()),
    }
}

fn read_mp3(path: &Path) -> Result<TrackInfo> {
    let tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => return Ok(TrackInfo::default()),
        Err(e) => return Err(Error::from_id3_read(e)),
    };

    let info = TrackInfo {
        title: tag.title().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
        artists: tag
            .artists()
            .map(|a| a.into_iter().map(str::to_string).collect())
            .unwrap_or_default(),
        comment: tag.comments().next().map(|c| c.text.clone()),
        covers: tag
            .pictures()
            .map(|pic| Cover::from_stored(&pic.mime_type, &pic.data))
            .collect(),
    };
    Ok(info)
}

fn read_flac(path: &Path) -> Result<TrackInfo> {
    check_block_chain(path)?;
    let tag = metaflac::Tag::read_from_path(path).map_err(Error::from_flac_read)?;

    let comments = tag
        .get_blocks(BlockType::VorbisComment)
        .filter_map(|block| match block {
            Block::VorbisComment(c) => Some(c),
            _ => None,
        })
        .last();
    let first = |key: &str| {
        comments
            .and_then(|c| vorbis_values(c, key))
            .and_then(|values| values.first().cloned())
    };

    Ok(TrackInfo {
        title: first("TITLE"),
        album: first("ALBUM"),
        artists: comments
            .and_then(|c| vorbis_values(c, "ARTIST"))
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        comment: None,
        covers: tag
            .pictures()
            .map(|pic| Cover::from_stored(&pic.mime_type, &pic.data))
            .collect(),
    })
}
