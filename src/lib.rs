pub mod codec;
pub mod datetime;
pub mod decimal;
pub mod error;
pub mod reader;
pub mod schema;
pub mod writer;

pub use crate::codec::compression::{Compression, decompress_block_into};
pub use crate::decimal::{Decimal128, Decimal256, FixedDecimal};
pub use crate::error::{Error, Result};
pub use crate::reader::BlockReader;
pub use crate::schema::ColumnType;
pub use crate::writer::{BlockWriter, WriteWorkspace};

#[cfg(test)]
mod tests;
