//! Method and content negotiation dispatch

pub mod media;
pub mod table;

pub use media::{MediaRange, Quality};
pub use table::{MethodTable, MethodTableBuilder};
