//! Buffer construction
//!
//! The [`Builder`] writes back to front so every offset is known
//! before it is stored: payload objects first (strings, vectors,
//! child tables), then the table bodies referencing them, then the
//! root offset last, at the lowest address. Structs are assembled
//! front to back with [`StructWriter`] and dropped into table bodies
//! as inline blocks.

mod builder;
mod errors;
mod structs;

pub use builder::{
    Builder, RequiredField, Scalar, UnionEntry, WipString, WipTable, WipVector,
};
pub use errors::{EncodeError, EncodeResult};
pub use structs::StructWriter;
