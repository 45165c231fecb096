use id3::frame::{Picture as Id3Picture, PictureType as Id3PictureType};
use id3::{Encoding, Frame};
use image::{GenericImageView, ImageFormat};
use metaflac::block::{Picture as FlacPicture, PictureType as FlacPictureType};

use crate::error::{Error, Result};

/// MIME type that marks a picture payload as a URL rather than image bytes.
pub const COVER_URL_MIME: &str = "-->";

/// Cover artwork, either inline image data or a reference to an external image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cover {
    Embedded { data: Vec<u8>, mime_type: String },
    Url(String),
}

impl Cover {
    pub fn embedded(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Cover::Embedded {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Cover::Url(url.into())
    }

    /// MIME type as stored in the picture entry.
    pub fn mime_type(&self) -> &str {
        match self {
            Cover::Embedded { mime_type, .. } => mime_type,
            Cover::Url(_) => COVER_URL_MIME,
        }
    }

    /// Rebuilds a cover from a stored picture entry, honouring the URL marker.
    pub fn from_stored(mime_type: &str, data: &[u8]) -> Self {
        if mime_type == COVER_URL_MIME {
            Cover::Url(String::from_utf8_lossy(data).into_owned())
        } else {
            Cover::embedded(data.to_vec(), mime_type)
        }
    }

    /// Short human readable form, e.g. `image/png (1234 바이트)`.
    pub fn describe(&self) -> String {
        match self {
            Cover::Embedded { data, mime_type } => format!("{} ({} 바이트)", mime_type, data.len()),
            Cover::Url(url) => format!("URL: {}", url),
        }
    }

    /// Builds a front-cover APIC frame with Latin-1 description text.
    pub fn into_id3_frame(self, description: &str) -> Frame {
        let mime_type = self.mime_type().to_string();
        let data = match self {
            Cover::Embedded { data, .. } => data,
            Cover::Url(url) => url.into_bytes(),
        };
        let mut frame = Frame::from(Id3Picture {
            mime_type,
            picture_type: Id3PictureType::CoverFront,
            description: description.to_string(),
            data,
        });
        frame = frame.set_encoding(Some(Encoding::Latin1));
        frame
    }

    /// Builds a front-cover FLAC picture block.
    ///
    /// Embedded images must be JPEG or PNG and must decode, since the block
    /// carries the image dimensions and colour depth. URL covers carry zeroes.
    pub fn into_flac_picture(self, description: &str) -> Result<FlacPicture> {
        let mut picture = FlacPicture::new();
        picture.picture_type = FlacPictureType::CoverFront;
        picture.description = description.to_string();

        match self {
            Cover::Embedded { data, mime_type } => {
                let format = match mime_type.as_str() {
                    "image/jpeg" => ImageFormat::Jpeg,
                    "image/png" => ImageFormat::Png,
                    _ => {
                        return Err(Error::PictureEncode {
                            mime_type,
                            reason: "unsupported MIME type".to_string(),
                        })
                    }
                };
                let img = match image::load_from_memory_with_format(&data, format) {
                    Ok(img) => img,
                    Err(e) => {
                        return Err(Error::PictureEncode {
                            mime_type,
                            reason: e.to_string(),
                        })
                    }
                };
                let (width, height) = img.dimensions();
                picture.width = width;
                picture.height = height;
                picture.depth = u32::from(img.color().bits_per_pixel());
                picture.mime_type = mime_type;
                picture.data = data;
            }
            Cover::Url(url) => {
                picture.mime_type = COVER_URL_MIME.to_string();
                picture.data = url.into_bytes();
            }
        }

        Ok(picture)
    }
}

/// Guesses the MIME type of image bytes from their magic number.
pub fn detect_mime_type(data: &[u8]) -> String {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png".to_string()
    } else {
        "image/jpeg".to_string()
    }
}
