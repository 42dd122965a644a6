pub mod auth_extractor;
pub mod events;
pub mod handlers;
pub mod routes;

pub use auth_extractor::*;
pub use events::*;
pub use handlers::*;
pub use routes::*;
