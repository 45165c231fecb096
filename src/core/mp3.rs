use std::fs::File;
use std::io::Seek;
use std::path::Path;

use id3::frame::Comment;
use id3::{Encoding, Frame, Tag, TagLike, Version};
use log::debug;

use crate::config::TaggerOptions;
use crate::core::cover::Cover;
use crate::core::tagger::Tagger;
use crate::error::{Error, Result};

const COMMENT_LANG: &str = "XXX";

/// ID3v2 session bound to one MP3 file.
///
/// The file stays open from [`Mp3Tagger::open`] until the session is
/// finalized or dropped.
pub struct Mp3Tagger {
    file: File,
    tag: Tag,
    version: Version,
    cover_description: String,
}

impl Mp3Tagger {
    /// Opens `path` and loads its ID3v2 tag, starting from an empty tag when
    /// the file has none.
    pub fn open(path: impl AsRef<Path>, options: &TaggerOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::options().read(true).write(true).open(path)?;

        let tag = match Tag::read_from2(&mut file) {
            Ok(tag) => tag,
            Err(id3::Error {
                kind: id3::ErrorKind::NoTag,
                ..
            }) => {
                debug!("{}: no ID3 tag, starting empty", path.display());
                Tag::new()
            }
            Err(e) => return Err(Error::from_id3_read(e)),
        };
        debug!("{}: loaded {} ID3 frames", path.display(), tag.frames().count());

        Ok(Self {
            file,
            tag,
            version: options.id3_version.into(),
            cover_description: options.cover_description.clone(),
        })
    }
}

impl Tagger for Mp3Tagger {
    fn add_cover(&mut self, cover: Cover) -> Result<()> {
        // add_frame would replace an APIC frame with the same picture type.
        let frame = cover.into_id3_frame(&self.cover_description);
        self.tag.frames_vec_mut().push(frame);
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        if self.tag.title().map_or(true, str::is_empty) {
            self.tag.set_title(title);
        } else {
            debug!("title already set, keeping it");
        }
        Ok(())
    }

    fn set_album(&mut self, album: &str) -> Result<()> {
        if self.tag.album().map_or(true, str::is_empty) {
            self.tag.set_album(album);
        } else {
            debug!("album already set, keeping it");
        }
        Ok(())
    }

    fn set_artist(&mut self, artists: &[String]) -> Result<()> {
        if self.tag.get("TPE1").is_some() {
            debug!("artist frame present, keeping it");
        } else if !artists.is_empty() {
            self.tag.set_text_values("TPE1", artists);
        }
        Ok(())
    }

    fn set_comment(&mut self, comment: &str) -> Result<()> {
        if self.tag.comments().next().is_some() {
            debug!("comment frame present, keeping it");
            return Ok(());
        }
        let mut frame = Frame::from(Comment {
            lang: COMMENT_LANG.to_string(),
            description: String::new(),
            text: comment.to_string(),
        });
        frame = frame.set_encoding(Some(Encoding::Latin1));
        self.tag.add_frame(frame);
        Ok(())
    }

    /// Writes the tag through the open handle, then syncs and closes it.
    /// The handle is released on every path; the first failure wins.
    fn finalize(self: Box<Self>) -> Result<()> {
        let Mp3Tagger {
            mut file,
            tag,
            version,
            ..
        } = *self;

        let written = file
            .rewind()
            .map_err(Error::from)
            .and_then(|()| {
                tag.write_to_file(&mut file, version)
                    .map_err(Error::from_id3_write)
            });
        let released = file.sync_all().map_err(Error::from);
        drop(file);

        if written.is_ok() {
            debug!("wrote ID3 {:?} tag with {} frames", version, tag.frames().count());
        }
        written.and(released)
    }
}
