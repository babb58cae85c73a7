//! Command-line entry points.

pub mod decode;
pub mod encode;
pub mod render;
pub mod schema;
