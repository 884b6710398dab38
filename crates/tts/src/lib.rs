pub mod providers;

pub use providers::sarvam::SarvamTts;

pub const DEFAULT_TTS_URL: &str = "https://api.sarvam.ai/text-to-speech";
