pub mod logger;
pub mod types;

pub use logger::*;
pub use types::*;
