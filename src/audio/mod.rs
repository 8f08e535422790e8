pub mod clock;
pub mod decode;
pub mod spectrum;
