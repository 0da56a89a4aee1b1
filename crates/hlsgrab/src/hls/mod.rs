pub mod playlist;
mod resolver;

pub use playlist::Variant;
pub use resolver::*;
