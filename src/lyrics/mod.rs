// lyrics/mod.rs - transcript types, parsing, providers and the local cache
pub mod database;
pub mod parse;
pub mod providers;
pub mod types;

pub use parse::parse_transcript;
pub use types::{LyricLine, LyricsError, Transcript};
