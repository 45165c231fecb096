use crate::core::cover::Cover;

/// The fields a tagging session fills.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artists: Vec<String>,
    /// Only stored in MP3 files.
    pub comment: Option<String>,
    pub covers: Vec<Cover>,
}

impl TrackInfo {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("알 수 없음")
    }

    pub fn display_album(&self) -> &str {
        self.album.as_deref().unwrap_or("알 수 없음")
    }

    pub fn display_artist(&self) -> String {
        if self.artists.is_empty() {
            "알 수 없음".to_string()
        } else {
            self.artists.join(", ")
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.album.is_none()
            && self.artists.is_empty()
            && self.comment.is_none()
            && self.covers.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} - {} [{}]",
            self.display_artist(),
            self.display_title(),
            self.display_album()
        )
    }
}
