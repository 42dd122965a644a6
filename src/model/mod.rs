pub mod acting_identity;
pub mod common;
pub mod manager;
pub mod page;
pub mod tracker;

pub use acting_identity::*;
pub use common::*;
pub use manager::*;
pub use page::*;
pub use tracker::*;
