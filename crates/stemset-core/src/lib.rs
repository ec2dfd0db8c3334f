//! Stemset Core - synchronized multi-stem audio playback and mixing

pub mod audio;
pub mod engine;
pub mod export;
pub mod loader;
pub mod player;
pub mod stretch;
pub mod track;
pub mod types;

pub use player::{PlayerError, PlayerResult, StemPlayer};
pub use track::{StemMap, Track};
pub use types::*;
