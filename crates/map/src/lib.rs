pub mod engine;
pub mod projection;
pub mod store;

pub use engine::*;
pub use projection::*;
pub use store::*;
