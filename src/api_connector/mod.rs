pub mod operations;
pub mod router;
pub mod types;

pub use operations::*;
pub use router::*;
pub use types::*;
