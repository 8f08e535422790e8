pub mod canvas;
pub mod palette;
pub mod pulse;
pub mod text;
