use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use log::{debug, warn};
use metaflac::block::{Block, BlockType, VorbisComment};

use crate::config::TaggerOptions;
use crate::core::cover::Cover;
use crate::core::tagger::{Format, Tagger};
use crate::error::{Error, Result};

const FIELD_TITLE: &str = "TITLE";
const FIELD_ALBUM: &str = "ALBUM";
const FIELD_ARTIST: &str = "ARTIST";

const FLAC_MARKER: &[u8; 4] = b"fLaC";
const BLOCK_VORBIS_COMMENT: u8 = 4;

fn malformed(reason: String) -> Error {
    Error::TagParse {
        format: Format::Flac,
        reason,
    }
}

/// Walks the metadata block headers and checks the length fields of every
/// Vorbis comment block, so a corrupt chain is rejected before the codec
/// indexes into it. Files without the `fLaC` marker are left to the codec.
pub(crate) fn check_block_chain(path: &Path) -> Result<()> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let short = |e| Error::from_tag_io(Format::Flac, e);

    let mut marker = [0; 4];
    reader.read_exact(&mut marker).map_err(short)?;
    if &marker != FLAC_MARKER {
        return Ok(());
    }

    let mut pos = 4u64;
    loop {
        let byte = reader.read_u8().map_err(short)?;
        let last = (byte & 0x80) != 0;
        let ty = byte & 0x7F;
        let size = reader.read_u24::<BigEndian>().map_err(short)?;
        pos += 4;

        if pos + u64::from(size) > file_len {
            return Err(malformed(format!(
                "block type {} at offset {} claims {} bytes, file has {}",
                ty,
                pos - 4,
                size,
                file_len - pos
            )));
        }

        if ty == BLOCK_VORBIS_COMMENT {
            let mut content = vec![0; size as usize];
            reader.read_exact(&mut content).map_err(short)?;
            check_vorbis_comment(&content)?;
        } else {
            reader.seek_relative(i64::from(size))?;
        }
        pos += u64::from(size);

        if last {
            return Ok(());
        }
    }
}

fn check_vorbis_comment(mut content: &[u8]) -> Result<()> {
    let short = |_| malformed("Vorbis comment block is truncated".to_string());

    let vendor_len = content.read_u32::<LittleEndian>().map_err(short)? as usize;
    if vendor_len > content.len() {
        return Err(malformed(format!(
            "vendor string of {} bytes runs past the comment block",
            vendor_len
        )));
    }
    content = &content[vendor_len..];

    let count = content.read_u32::<LittleEndian>().map_err(short)?;
    for i in 0..count {
        let len = content.read_u32::<LittleEndian>().map_err(short)? as usize;
        if len > content.len() {
            return Err(malformed(format!(
                "comment #{} of {} bytes runs past the comment block",
                i, len
            )));
        }
        content = &content[len..];
    }
    Ok(())
}

/// Values stored under `key`, matched case-insensitively.
pub(crate) fn vorbis_values<'a>(comments: &'a VorbisComment, key: &str) -> Option<&'a [String]> {
    comments
        .comments
        .iter()
        .find(|(k, values)| k.eq_ignore_ascii_case(key) && !values.is_empty())
        .map(|(_, values)| values.as_slice())
}

/// FLAC session holding the parsed metadata block chain of one file.
///
/// Text fields go into a working copy of the first Vorbis comment block,
/// which is appended to the chain on finalize. Pictures are appended as soon
/// as they are set.
pub struct FlacTagger {
    path: PathBuf,
    tag: metaflac::Tag,
    comments: VorbisComment,
    had_comment_block: bool,
    cover_description: String,
}

impl FlacTagger {
    pub fn open(path: impl AsRef<Path>, options: &TaggerOptions) -> Result<Self> {
        let path = path.as_ref();
        check_block_chain(path)?;
        let tag = metaflac::Tag::read_from_path(path).map_err(Error::from_flac_read)?;

        let existing = tag
            .get_blocks(BlockType::VorbisComment)
            .find_map(|block| match block {
                Block::VorbisComment(comments) => Some(comments.clone()),
                _ => None,
            });
        let had_comment_block = existing.is_some();
        debug!(
            "{}: loaded FLAC metadata, comment block {}",
            path.display(),
            if had_comment_block { "found" } else { "absent" }
        );

        Ok(Self {
            path: path.to_path_buf(),
            tag,
            comments: existing.unwrap_or_else(VorbisComment::new),
            had_comment_block,
            cover_description: options.cover_description.clone(),
        })
    }

    fn fill_field<'a>(&mut self, key: &str, values: impl IntoIterator<Item = &'a str>) {
        if vorbis_values(&self.comments, key).is_some() {
            debug!("{} already set, keeping it", key);
            return;
        }
        let values: Vec<String> = values.into_iter().map(str::to_string).collect();
        if !values.is_empty() {
            self.comments
                .comments
                .entry(key.to_string())
                .or_default()
                .extend(values);
        }
    }
}

impl Tagger for FlacTagger {
    fn add_cover(&mut self, cover: Cover) -> Result<()> {
        let picture = cover.into_flac_picture(&self.cover_description)?;
        self.tag.push_block(Block::Picture(picture));
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.fill_field(FIELD_TITLE, [title]);
        Ok(())
    }

    fn set_album(&mut self, album: &str) -> Result<()> {
        self.fill_field(FIELD_ALBUM, [album]);
        Ok(())
    }

    fn set_artist(&mut self, artists: &[String]) -> Result<()> {
        self.fill_field(FIELD_ARTIST, artists.iter().map(String::as_str));
        Ok(())
    }

    /// Comments are not tracked for FLAC; the value is dropped.
    fn set_comment(&mut self, _comment: &str) -> Result<()> {
        Ok(())
    }

    /// Appends the comment block and rewrites the whole file.
    ///
    /// The block loaded at open time is left in the chain, so a file that
    /// already had comments ends up with two comment blocks.
    fn finalize(self: Box<Self>) -> Result<()> {
        let FlacTagger {
            path,
            mut tag,
            comments,
            had_comment_block,
            ..
        } = *self;

        if had_comment_block {
            warn!(
                "{}: appending a second Vorbis comment block after the existing one",
                path.display()
            );
        }
        tag.push_block(Block::VorbisComment(comments));
        tag.write_to_path(&path).map_err(Error::from_flac_write)?;
        debug!("{}: rewrote FLAC metadata", path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::cover::tests::png_bytes;
    use crate::core::tagger::open_tagger;
    use metaflac::block::PictureType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) const FRAMES: [u8; 8] = [0xFF, 0xF8, 0x69, 0x08, 0x00, 0x00, 0x00, 0x00];

    /// STREAMINFO block for 44100 Hz, 2 channels, 16 bits, 0 samples.
    fn streaminfo(last: bool) -> Vec<u8> {
        let mut block = vec![if last { 0x80 } else { 0x00 }, 0x00, 0x00, 0x22];
        block.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
        block.extend_from_slice(&[0x00; 6]);
        let packed: u64 = (44_100u64 << 44) | (1 << 41) | (15 << 36);
        block.extend_from_slice(&packed.to_be_bytes());
        block.extend_from_slice(&[0x00; 16]);
        block
    }

    fn write_fixture(blocks: &[&[u8]]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"fLaC").unwrap();
        for block in blocks {
            file.write_all(block).unwrap();
        }
        for _ in 0..32 {
            file.write_all(&FRAMES).unwrap();
        }
        file.flush().unwrap();
        file
    }

    /// `fLaC` marker, a single STREAMINFO block and some frame bytes.
    pub(crate) fn flac_fixture() -> NamedTempFile {
        write_fixture(&[streaminfo(true).as_slice()])
    }

    fn commented_fixture(key: &str, values: Vec<&str>) -> NamedTempFile {
        let file = flac_fixture();
        let mut tag = metaflac::Tag::read_from_path(file.path()).unwrap();
        tag.set_vorbis(key, values);
        tag.write_to_path(file.path()).unwrap();
        file
    }

    fn open(file: &NamedTempFile) -> Box<dyn Tagger> {
        Box::new(FlacTagger::open(file.path(), &TaggerOptions::default()).unwrap())
    }

    fn reread(file: &NamedTempFile) -> metaflac::Tag {
        metaflac::Tag::read_from_path(file.path()).unwrap()
    }

    fn last_comments(tag: &metaflac::Tag) -> VorbisComment {
        tag.get_blocks(BlockType::VorbisComment)
            .filter_map(|block| match block {
                Block::VorbisComment(c) => Some(c.clone()),
                _ => None,
            })
            .last()
            .unwrap()
    }

    #[test]
    fn test_first_title_wins() {
        let file = flac_fixture();
        let mut tagger = open(&file);
        tagger.set_title("x").unwrap();
        tagger.set_title("x").unwrap();
        tagger.set_title("y").unwrap();
        tagger.finalize().unwrap();

        let comments = last_comments(&reread(&file));
        assert_eq!(vorbis_values(&comments, "TITLE"), Some(&["x".to_string()][..]));
    }

    #[test]
    fn test_existing_title_is_kept() {
        let file = commented_fixture("TITLE", vec!["Original"]);
        let mut tagger = open(&file);
        tagger.set_title("New").unwrap();
        tagger.set_album("Album").unwrap();
        tagger.finalize().unwrap();

        let comments = last_comments(&reread(&file));
        assert_eq!(vorbis_values(&comments, "TITLE"), Some(&["Original".to_string()][..]));
        assert_eq!(vorbis_values(&comments, "ALBUM"), Some(&["Album".to_string()][..]));
    }

    #[test]
    fn test_key_lookup_ignores_case() {
        let file = commented_fixture("album", vec!["Lower"]);
        let mut tagger = open(&file);
        tagger.set_album("Upper").unwrap();
        tagger.finalize().unwrap();

        let comments = last_comments(&reread(&file));
        assert_eq!(vorbis_values(&comments, "ALBUM"), Some(&["Lower".to_string()][..]));
    }

    #[test]
    fn test_artists_keep_order() {
        let file = flac_fixture();
        let mut tagger = open(&file);
        let artists = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        tagger.set_artist(&artists).unwrap();
        tagger.finalize().unwrap();

        let comments = last_comments(&reread(&file));
        assert_eq!(vorbis_values(&comments, "ARTIST"), Some(&artists[..]));
    }

    #[test]
    fn test_comment_is_ignored() {
        let file = flac_fixture();
        let mut tagger = open(&file);
        tagger.set_comment("hello").unwrap();
        tagger.finalize().unwrap();

        let comments = last_comments(&reread(&file));
        assert!(comments.comments.is_empty());
        assert!(vorbis_values(&comments, "COMMENT").is_none());
    }

    #[test]
    fn test_cover_url_round_trip() {
        let file = flac_fixture();
        let mut tagger = open(&file);
        tagger.set_cover_url("https://x/y.jpg").unwrap();
        tagger.finalize().unwrap();

        let tag = reread(&file);
        let pictures: Vec<_> = tag.pictures().collect();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].picture_type, PictureType::CoverFront);
        assert_eq!(pictures[0].mime_type, "-->");
        assert_eq!(String::from_utf8(pictures[0].data.clone()).unwrap(), "https://x/y.jpg");
    }

    #[test]
    fn test_two_covers_both_persist() {
        let file = flac_fixture();
        let mut tagger = open(&file);
        tagger.set_cover(png_bytes(1, 1), "image/png").unwrap();
        tagger.set_cover(png_bytes(4, 3), "image/png").unwrap();
        tagger.finalize().unwrap();

        let tag = reread(&file);
        let sizes: Vec<_> = tag.pictures().map(|p| (p.width, p.height)).collect();
        assert_eq!(sizes, vec![(1, 1), (4, 3)]);
    }

    #[test]
    fn test_bad_cover_keeps_session_usable() {
        let file = flac_fixture();
        let mut tagger = open(&file);
        let err = tagger.set_cover(vec![0, 1, 2], "image/jpeg").unwrap_err();
        assert!(matches!(err, Error::PictureEncode { .. }));
        tagger.set_cover(png_bytes(2, 2), "image/png").unwrap();
        tagger.set_title("still works").unwrap();
        tagger.finalize().unwrap();

        let tag = reread(&file);
        assert_eq!(tag.pictures().count(), 1);
    }

    #[test_log::test]
    fn test_existing_comment_block_is_duplicated() {
        let file = commented_fixture("TITLE", vec!["Original"]);
        let tagger = open(&file);
        tagger.finalize().unwrap();

        let tag = reread(&file);
        assert_eq!(tag.get_blocks(BlockType::VorbisComment).count(), 2);
    }

    #[test]
    fn test_frames_are_preserved() {
        let file = flac_fixture();
        let mut tagger = open(&file);
        tagger.set_title("x").unwrap();
        tagger.finalize().unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        assert!(bytes.starts_with(b"fLaC"));
        assert!(bytes.ends_with(&FRAMES));
    }

    #[test]
    fn test_dispatch_flac_ignores_case() {
        let file = flac_fixture();
        let mut tagger = open_tagger(file.path(), "FLAC").unwrap();
        tagger.set_title("x").unwrap();
        tagger.finalize().unwrap();

        let comments = last_comments(&reread(&file));
        assert!(vorbis_values(&comments, "TITLE").is_some());
    }

    #[test]
    fn test_not_flac_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"RIFF0000WAVEfmt ").unwrap();
        file.flush().unwrap();

        let result = FlacTagger::open(file.path(), &TaggerOptions::default());
        assert!(matches!(result, Err(Error::TagParse { .. })));
    }

    #[test]
    fn test_comment_block_with_overlong_vendor_is_parse_error() {
        // Vorbis comment block of 8 bytes whose vendor length says 256.
        let mut comment = vec![0x80 | BLOCK_VORBIS_COMMENT, 0x00, 0x00, 0x08];
        comment.extend_from_slice(&256u32.to_le_bytes());
        comment.extend_from_slice(&0u32.to_le_bytes());
        let file = write_fixture(&[streaminfo(false).as_slice(), comment.as_slice()]);

        let result = FlacTagger::open(file.path(), &TaggerOptions::default());
        assert!(matches!(result, Err(Error::TagParse { .. })));
    }

    #[test]
    fn test_comment_entry_past_block_end_is_parse_error() {
        let mut comment = vec![0x80 | BLOCK_VORBIS_COMMENT, 0x00, 0x00, 0x0C];
        comment.extend_from_slice(&0u32.to_le_bytes());
        comment.extend_from_slice(&1u32.to_le_bytes());
        comment.extend_from_slice(&64u32.to_le_bytes());
        let file = write_fixture(&[streaminfo(false).as_slice(), comment.as_slice()]);

        let result = FlacTagger::open(file.path(), &TaggerOptions::default());
        assert!(matches!(result, Err(Error::TagParse { .. })));
    }

    #[test]
    fn test_block_longer_than_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"fLaC").unwrap();
        file.write_all(&streaminfo(false)).unwrap();
        // padding block claiming 0x400 bytes with 16 left in the file
        file.write_all(&[0x81, 0x00, 0x04, 0x00]).unwrap();
        file.write_all(&[0x00; 16]).unwrap();
        file.flush().unwrap();

        let result = FlacTagger::open(file.path(), &TaggerOptions::default());
        assert!(matches!(result, Err(Error::TagParse { .. })));
    }

    #[test]
    fn test_truncated_header_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"fLaC").unwrap();
        file.write_all(&[0x00, 0x00]).unwrap();
        file.flush().unwrap();

        let result = FlacTagger::open(file.path(), &TaggerOptions::default());
        assert!(matches!(result, Err(Error::TagParse { .. })));
    }

    #[test]
    fn test_valid_chain_passes_check() {
        let file = commented_fixture("TITLE", vec!["Original"]);
        check_block_chain(file.path()).unwrap();
    }
}
