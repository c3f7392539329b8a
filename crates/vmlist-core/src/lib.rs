pub mod commands;
pub mod eligibility;
pub mod identity;
pub mod ids;
pub mod model;
pub mod outcomes;
pub mod snapshot;
pub mod title;

pub use commands::*;
pub use eligibility::*;
pub use identity::*;
pub use ids::*;
pub use model::*;
pub use outcomes::*;
pub use snapshot::*;
pub use title::*;
