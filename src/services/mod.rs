pub mod messaging;
pub mod storage;
pub mod types;

pub use messaging::*;
pub use storage::*;
pub use types::*;
