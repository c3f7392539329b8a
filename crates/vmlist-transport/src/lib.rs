pub mod contract;
pub mod scripted;
pub mod types;

pub use contract::*;
pub use scripted::*;
pub use types::*;
