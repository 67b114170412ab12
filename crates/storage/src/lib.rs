//! Storage layer for vectormap
//!
//! This crate defines the map the vector store persists into:
//! - `KvMap`: the named, partitioned key-value map contract
//! - `PartitionedMap`: in-process implementation, one `RwLock<BTreeMap>` per partition
//! - `Session`: registry handing out maps by name
//!
//! Values are opaque bytes; encoding is the caller's concern.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod map;
pub mod partitioned;
pub mod session;

pub use error::{MapError, MapResult};
pub use map::KvMap;
pub use partitioned::{PartitionedMap, DEFAULT_PARTITION_COUNT};
pub use session::Session;
