//! Emberwire Client - Streaming Query Access
//!
//! This crate is the user-facing half of the Emberwire stack: it issues
//! queries over HTTP and decodes the framed, compressed, strongly-typed
//! result stream into [`Row`]s of [`emberwire_core::Value`]s.
//!
//! ## Pipeline
//!
//! ```text
//! Client::query → HTTP response body (chunks)
//!               → FrameDecoder    (verify checksum, decompress)
//!               → RowStreamDecoder (header, then typed rows)
//!               → ResultCursor::next_row
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use emberwire_client::Client;
//!
//! let client = Client::builder()
//!     .endpoint("https://api.example.com/query")
//!     .database("analytics")
//!     .build()?;
//!
//! let mut cursor = client.query("SELECT id, score FROM events").await?;
//! for column in cursor.columns() {
//!     println!("{}: {}", column.name, column.declared);
//! }
//! while let Some(row) = cursor.next_row().await? {
//!     let id = row.get_by_name("id").and_then(|v| v.as_i64());
//!     println!("{:?} -> {:?}", id, row.values());
//! }
//! ```

pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
pub mod rowset;
pub mod source;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use cursor::ResultCursor;
pub use error::{ClientError, Result};
pub use rowset::{ColumnDescriptor, Row, RowStreamDecoder};
pub use source::{ChunkSource, MemoryChunkSource};
