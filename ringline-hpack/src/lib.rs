//! Sans-IO reference-set header compression.
//!
//! This crate implements the draft HPACK variant in which each side keeps a
//! *reference set* of header table entries that are emitted implicitly at
//! the end of every block. A block only carries the differences from the
//! previous one: entries toggled on or off, new literals, table size
//! updates and reference-set resets. Strings use the canonical HTTP/2
//! Huffman code.
//!
//! Both halves are pure state machines. The caller frames the bytes and
//! keeps one [`Compressor`] and one [`Decompressor`] per connection.
//!
//! # Architecture
//!
//! ```text
//!   RequestHead + raw headers          header block bytes
//!        |                                   |
//!   +----v--------+                    +-----v--------+
//!   | Compressor  |  ---- block ---->  | Decompressor |
//!   +----+--------+                    +-----+--------+
//!        |                                   |
//!   CompressionState                   CompressionState
//!   (table + reference sets)           (table + reference sets)
//!                                            |
//!                                     "name: value\r\n" text
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ringline_hpack::{Compressor, Decompressor, RequestHead, Settings};
//!
//! let mut compressor = Compressor::new(&Settings::default());
//! let mut decompressor = Decompressor::new(&Settings::default());
//!
//! let head = RequestHead::new(b"GET", b"/", b"example.com", b"https");
//! let mut block = Vec::new();
//! compressor.encode_header_block(&head, b"Accept: */*\r\n", &mut block);
//!
//! let text = decompressor.decode_header_block(&block)?;
//! assert_eq!(&text[..], b"accept: */*\r\n");
//! assert_eq!(decompressor.pseudo_headers().path(), Some(&b"/"[..]));
//! ```

pub mod compressor;
mod cursor;
pub mod decompressor;
pub mod error;
pub mod head;
mod huffman;
mod index_set;
mod integer;
pub mod settings;
mod state;
pub mod table;

pub use compressor::{Compressor, IndexPolicy};
pub use decompressor::{Decompressor, PseudoHeaders};
pub use error::HpackError;
pub use head::{RequestHead, RequestTarget};
pub use settings::Settings;
pub use table::{EntryRef, HeaderField, HeaderTable, Lookup};
