pub mod cover;
pub mod flac;
pub mod mp3;
pub mod reader;
pub mod tagger;
