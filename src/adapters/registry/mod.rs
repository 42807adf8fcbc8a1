//! Static tool index - in-process implementation of the tool catalog.

mod static_index;

pub use static_index::StaticToolIndex;
