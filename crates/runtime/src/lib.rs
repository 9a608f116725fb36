pub mod frame;
pub mod latch;

pub use frame::*;
pub use latch::*;
