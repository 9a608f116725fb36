pub mod cache;
pub mod fetch;
pub mod manager;
pub mod store;
pub mod tile;

pub use cache::*;
pub use fetch::*;
pub use manager::*;
pub use store::*;
pub use tile::*;
