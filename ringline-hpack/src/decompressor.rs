//! Header block decoder.
//!
//! Produces HTTP/1-style header text (`name: value\r\n` lines) from a block,
//! with a synthesized status line when the block carries `:status`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::cursor::Cursor;
use crate::error::HpackError;
use crate::head::is_disallowed_inbound;
use crate::huffman;
use crate::integer::decode_integer;
use crate::settings::Settings;
use crate::state::CompressionState;
use crate::table::{HeaderField, HeaderTable};

/// Pseudo-header values seen in the last decoded block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PseudoHeaders {
    status: Option<Vec<u8>>,
    method: Option<Vec<u8>>,
    path: Option<Vec<u8>>,
    authority: Option<Vec<u8>>,
    scheme: Option<Vec<u8>>,
}

impl PseudoHeaders {
    pub fn status(&self) -> Option<&[u8]> {
        self.status.as_deref()
    }

    pub fn method(&self) -> Option<&[u8]> {
        self.method.as_deref()
    }

    pub fn path(&self) -> Option<&[u8]> {
        self.path.as_deref()
    }

    pub fn authority(&self) -> Option<&[u8]> {
        self.authority.as_deref()
    }

    pub fn scheme(&self) -> Option<&[u8]> {
        self.scheme.as_deref()
    }

    /// Later values replace earlier ones. Unknown names are ignored.
    fn record(&mut self, name: &[u8], value: Vec<u8>) {
        let slot = match name {
            b":status" => &mut self.status,
            b":method" => &mut self.method,
            b":path" => &mut self.path,
            b":authority" => &mut self.authority,
            b":scheme" => &mut self.scheme,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Decoder half of a connection's header compression context.
#[derive(Debug)]
pub struct Decompressor {
    state: CompressionState,
    /// Largest size update the peer may send.
    max_buffer_limit: usize,
    output: BytesMut,
    pseudo: PseudoHeaders,
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Decompressor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            state: CompressionState::new(settings.initial_table_size()),
            max_buffer_limit: settings.max_header_table_size,
            output: BytesMut::new(),
            pseudo: PseudoHeaders::default(),
        }
    }

    /// Decode one complete header block.
    ///
    /// On error the decoder's table no longer matches the peer's and the
    /// connection must be closed.
    pub fn decode_header_block(&mut self, block: &[u8]) -> Result<Bytes, HpackError> {
        self.decode_block(block).inspect_err(|error| {
            tracing::warn!(%error, len = block.len(), "header block decoding failed");
        })
    }

    /// Pseudo-headers from the last decoded block.
    pub fn pseudo_headers(&self) -> &PseudoHeaders {
        &self.pseudo
    }

    /// Change the ceiling for size updates, e.g. after advertising a new
    /// SETTINGS_HEADER_TABLE_SIZE.
    pub fn set_max_header_table_size(&mut self, limit: usize) {
        self.max_buffer_limit = limit;
    }

    pub fn max_buffer_size(&self) -> usize {
        self.state.max_buffer()
    }

    pub fn table(&self) -> &HeaderTable {
        &self.state.table
    }

    fn decode_block(&mut self, block: &[u8]) -> Result<Bytes, HpackError> {
        self.output.clear();
        self.pseudo = PseudoHeaders::default();
        self.state.alternate.clear();

        let mut cursor = Cursor::new(block);
        while let Some(first) = cursor.peek() {
            tracing::trace!(offset = cursor.position(), first, "decompressor opcode");
            if first & 0x80 != 0 {
                self.do_indexed(&mut cursor)?;
            } else if first & 0x40 != 0 {
                self.do_literal_with_incremental(&mut cursor)?;
            } else if first & 0x20 != 0 {
                self.do_context_update(&mut cursor)?;
            } else {
                self.do_literal_without_indexing(&mut cursor)?;
            }
        }

        // Referenced entries that were not toggled this block are emitted
        // implicitly.
        let carried: Vec<usize> = self
            .state
            .reference
            .iter()
            .filter(|&index| !self.state.alternate.contains(index))
            .collect();
        for index in carried {
            tracing::trace!(index, "decompressor emitting carried-over reference");
            let field = self.state.table.get(index)?.to_field();
            self.output_header(&field.name, &field.value)?;
        }
        self.state.alternate.clear();
        self.state.dump("decompressor");

        let body = self.output.split();
        let mut out = match &self.pseudo.status {
            Some(status) => {
                let mut out = BytesMut::with_capacity(body.len() + status.len() + 11);
                out.put_slice(b"HTTP/2.0 ");
                out.put_slice(status);
                out.put_slice(b"\r\n");
                out
            }
            None => BytesMut::with_capacity(body.len()),
        };
        out.put_slice(&body);
        Ok(out.freeze())
    }

    fn do_indexed(&mut self, cursor: &mut Cursor<'_>) -> Result<(), HpackError> {
        let wire = decode_integer(cursor, 7)?;
        let Some(index) = wire.checked_sub(1) else {
            return Err(HpackError::IllegalIndex(0));
        };
        if index >= self.state.table.len() {
            return Err(HpackError::IllegalIndex(wire));
        }

        if self.state.reference.remove(index) {
            tracing::trace!(index, "decompressor toggling off");
            self.state.alternate.remove(index);
            return Ok(());
        }

        let field = self.state.table.get(index)?.to_field();
        tracing::trace!(
            index,
            name = %String::from_utf8_lossy(&field.name),
            "decompressor toggling on"
        );
        self.output_header(&field.name, &field.value)?;

        let mut index = index;
        if index >= self.state.table.variable_len() {
            let room = field.size();
            if room > self.state.max_buffer() {
                self.state.clear_table();
                return Ok(());
            }
            self.state.make_room(room);
            self.state.add(field);
            index = 0;
        }
        self.state.reference.insert(index);
        self.state.alternate.insert(index);
        Ok(())
    }

    fn do_literal_with_incremental(&mut self, cursor: &mut Cursor<'_>) -> Result<(), HpackError> {
        let field = self.decode_literal(cursor, 6)?;
        tracing::trace!(
            name = %String::from_utf8_lossy(&field.name),
            "decompressor literal with incremental indexing"
        );
        self.output_header(&field.name, &field.value)?;

        let room = field.size();
        if room > self.state.max_buffer() {
            self.state.clear_table();
            return Ok(());
        }
        self.state.make_room(room);
        self.state.add(field);
        self.state.reference.insert(0);
        self.state.alternate.insert(0);
        Ok(())
    }

    /// `0000xxxx` and `0001xxxx` differ only in what intermediaries may do.
    fn do_literal_without_indexing(&mut self, cursor: &mut Cursor<'_>) -> Result<(), HpackError> {
        let field = self.decode_literal(cursor, 4)?;
        tracing::trace!(
            name = %String::from_utf8_lossy(&field.name),
            "decompressor literal without indexing"
        );
        self.output_header(&field.name, &field.value)
    }

    fn do_context_update(&mut self, cursor: &mut Cursor<'_>) -> Result<(), HpackError> {
        let first = cursor.peek().ok_or(HpackError::TruncatedInput)?;
        if first & 0x10 != 0 {
            cursor.next_byte()?;
            tracing::trace!("decompressor clearing reference set");
            self.state.reference.clear();
            self.state.alternate.clear();
            return Ok(());
        }

        let size = decode_integer(cursor, 4)?;
        if size > self.max_buffer_limit {
            return Err(HpackError::TableSizeExceeded {
                requested: size,
                limit: self.max_buffer_limit,
            });
        }
        self.state.set_max_buffer(size);
        Ok(())
    }

    fn decode_literal(
        &self,
        cursor: &mut Cursor<'_>,
        prefix_bits: u8,
    ) -> Result<HeaderField, HpackError> {
        let name_index = decode_integer(cursor, prefix_bits)?;
        let name = match name_index.checked_sub(1) {
            Some(index) => self.state.table.get(index)?.name.to_vec(),
            None => decode_string(cursor)?,
        };
        let value = decode_string(cursor)?;
        Ok(HeaderField { name, value })
    }

    /// Apply the inbound filtering rules and append to the output.
    fn output_header(&mut self, name: &[u8], value: &[u8]) -> Result<(), HpackError> {
        if name.iter().any(u8::is_ascii_uppercase) || is_disallowed_inbound(name) {
            return Err(HpackError::disallowed(name));
        }

        let value: Vec<u8> = value
            .iter()
            .map(|&b| if b == b'\r' || b == b'\n' { b' ' } else { b })
            .collect();

        if name.starts_with(b":") {
            self.pseudo.record(name, value);
            return Ok(());
        }

        if name == b"set-cookie" {
            for segment in value.split(|&b| b == 0) {
                self.write_line(name, &[segment]);
            }
        } else {
            let segments: Vec<&[u8]> = value.split(|&b| b == 0).collect();
            self.write_line(name, &segments);
        }
        Ok(())
    }

    /// `name: seg1, seg2\r\n`
    fn write_line(&mut self, name: &[u8], segments: &[&[u8]]) {
        self.output.put_slice(name);
        self.output.put_slice(b": ");
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                self.output.put_slice(b", ");
            }
            self.output.put_slice(segment);
        }
        self.output.put_slice(b"\r\n");
    }
}

fn decode_string(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, HpackError> {
    let huffman = cursor.peek().ok_or(HpackError::TruncatedInput)? & 0x80 != 0;
    let len = decode_integer(cursor, 7)?;
    let raw = cursor.take(len)?;
    if huffman {
        huffman::decode(raw)
    } else {
        Ok(raw.to_vec())
    }
}
