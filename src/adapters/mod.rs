//! Port implementations.

pub mod live;
pub mod mock;
