//! Color types shared by frames and scenes.

mod color;

pub use color::Color;
