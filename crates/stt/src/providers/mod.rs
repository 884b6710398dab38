pub mod sarvam;
