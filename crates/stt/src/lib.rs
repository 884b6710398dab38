pub mod providers;

pub use providers::sarvam::SarvamStt;

pub const DEFAULT_STT_URL: &str = "https://api.sarvam.ai/speech-to-text";
