pub mod animation;
pub mod cluster;
pub mod interaction;
pub mod pin;
pub mod spatial;
pub mod viewport;

pub use animation::*;
pub use cluster::*;
pub use interaction::*;
pub use pin::*;
pub use viewport::*;
