pub mod transcript;

pub use transcript::{TranscriptError, TranscriptStore};
