//! Header block encoder.
//!
//! Each block is expressed as changes against the reference set left by the
//! previous block: pairs that are already referenced cost nothing, new
//! references are toggled on, and references that are no longer wanted are
//! toggled off at the end of the block.

use std::ops::Range;

use bytes::BufMut;

use crate::head::{self, RequestHead};
use crate::huffman;
use crate::integer::encode_integer;
use crate::settings::Settings;
use crate::state::CompressionState;
use crate::table::{HeaderField, HeaderTable};

/// Caller preference for adding a pair to the header table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPolicy {
    /// Add to the table when the size heuristic allows.
    Incremental,
    /// Send as a literal without touching the table.
    NoLocalIndex,
    /// Send as a literal that no intermediary may index either.
    NeverIndex,
}

/// Tables below this size never receive literals.
const MIN_INDEXING_BUFFER: usize = 128;

#[derive(Debug, Clone, Copy)]
enum Literal {
    /// `01xxxxxx`: added to the table and the reference set.
    Indexed,
    /// `0000xxxx`: not added to the table.
    Plain,
    /// `0001xxxx`: not added anywhere downstream either.
    NeverIndexed,
}

impl Literal {
    fn pattern(self) -> (u8, u8) {
        match self {
            Literal::Indexed => (0x40, 6),
            Literal::Plain => (0x00, 4),
            Literal::NeverIndexed => (0x10, 4),
        }
    }
}

/// Encoder half of a connection's header compression context.
#[derive(Debug)]
pub struct Compressor {
    state: CompressionState,
    /// Largest size the peer allows us to use.
    max_buffer_limit: usize,
    /// Size to announce at the start of the next block.
    max_buffer_setting: usize,
    size_change_waiting: bool,
    lowest_size_waiting: usize,
    clear_reference_set_pending: bool,
    parsed_content_length: Option<u64>,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Compressor {
    pub fn new(settings: &Settings) -> Self {
        let initial = settings.initial_table_size();
        Self {
            state: CompressionState::new(initial),
            max_buffer_limit: settings.max_header_table_size,
            max_buffer_setting: initial,
            size_change_waiting: false,
            lowest_size_waiting: initial,
            clear_reference_set_pending: false,
            parsed_content_length: None,
        }
    }

    /// Encode a request: pseudo-headers from `head`, then the CRLF-joined
    /// `raw_headers` blob.
    pub fn encode_header_block<B: BufMut>(
        &mut self,
        head: &RequestHead<'_>,
        raw_headers: &[u8],
        dst: &mut B,
    ) {
        let parsed = head::tokenize(raw_headers);
        self.parsed_content_length = parsed.content_length;

        let pseudo = head.fields();
        let fields = pseudo
            .iter()
            .map(|field| (field, IndexPolicy::Incremental))
            .chain(borrowed(&parsed.fields));
        self.encode_block(fields, dst);
    }

    /// Encode a response: `:status`, then the CRLF-joined `raw_headers`.
    pub fn encode_response_head<B: BufMut>(
        &mut self,
        status: &[u8],
        raw_headers: &[u8],
        dst: &mut B,
    ) {
        let parsed = head::tokenize(raw_headers);
        self.parsed_content_length = parsed.content_length;

        let status = HeaderField::new(b":status", status);
        let fields =
            std::iter::once((&status, IndexPolicy::Incremental)).chain(borrowed(&parsed.fields));
        self.encode_block(fields, dst);
    }

    /// Encode already-structured pairs as one block, in order. Names are
    /// lower-cased and connection-specific names are dropped, as for blobs.
    pub fn encode_fields<B: BufMut>(&mut self, fields: &[(HeaderField, IndexPolicy)], dst: &mut B) {
        self.parsed_content_length = None;
        let normalized: Vec<_> = fields
            .iter()
            .filter_map(|(field, policy)| Some((head::normalize(field)?, *policy)))
            .collect();
        let fields = normalized.iter().map(|(field, policy)| (&**field, *policy));
        self.encode_block(fields, dst);
    }

    /// Change the table size. Takes effect with the next block, which
    /// announces the lowest size requested since the previous block before
    /// the final one.
    ///
    /// # Panics
    ///
    /// If `size` exceeds the limit the peer allows.
    pub fn set_max_buffer_size(&mut self, size: usize) {
        assert!(
            size <= self.max_buffer_limit,
            "header table size {size} exceeds peer limit {}",
            self.max_buffer_limit
        );
        if self.size_change_waiting {
            self.lowest_size_waiting = self.lowest_size_waiting.min(size);
        } else {
            self.lowest_size_waiting = size;
            self.size_change_waiting = true;
        }
        self.max_buffer_setting = size;
    }

    /// Update the limit the peer allows, shrinking the table if needed.
    pub fn set_max_header_table_size(&mut self, limit: usize) {
        self.max_buffer_limit = limit;
        if self.max_buffer_setting > limit {
            self.set_max_buffer_size(limit);
        }
    }

    /// Drop the whole reference set at the start of the next block.
    pub fn clear_reference_set(&mut self) {
        self.clear_reference_set_pending = true;
    }

    /// `content-length` from the last tokenized blob.
    pub fn parsed_content_length(&self) -> Option<u64> {
        self.parsed_content_length
    }

    /// Table size currently in effect on the wire.
    pub fn max_buffer_size(&self) -> usize {
        self.state.max_buffer()
    }

    pub fn table(&self) -> &HeaderTable {
        &self.state.table
    }

    fn encode_block<'f, B: BufMut>(
        &mut self,
        fields: impl Iterator<Item = (&'f HeaderField, IndexPolicy)>,
        dst: &mut B,
    ) {
        self.begin_block(dst);
        for (field, policy) in fields {
            self.process_header(field, policy, dst);
        }
        self.finish_block(dst);
    }

    fn begin_block<B: BufMut>(&mut self, dst: &mut B) {
        self.state.alternate.clear();
        self.state.implied.clear();

        if self.size_change_waiting {
            if self.lowest_size_waiting < self.max_buffer_setting {
                self.encode_size_update(self.lowest_size_waiting, dst);
            }
            self.encode_size_update(self.max_buffer_setting, dst);
            self.size_change_waiting = false;
        }

        if self.clear_reference_set_pending {
            tracing::trace!("compressor clearing reference set");
            dst.put_u8(0x30);
            self.state.reference.clear();
            self.clear_reference_set_pending = false;
        }
    }

    fn encode_size_update<B: BufMut>(&mut self, size: usize, dst: &mut B) {
        encode_integer(dst, size, 4, 0x20);
        self.state.set_max_buffer(size);
    }

    fn process_header<B: BufMut>(&mut self, field: &HeaderField, policy: IndexPolicy, dst: &mut B) {
        let lookup = self.state.table.find(&field.name, &field.value);
        let name_index = lookup.name.map_or(0, |index| index + 1);

        let index = match (lookup.exact, policy) {
            (Some(index), IndexPolicy::Incremental) => index,
            _ => {
                self.process_literal(field, policy, name_index, dst);
                return;
            }
        };

        if self.state.alternate.contains(index) {
            // Repeated within this block. Toggling twice is the only way to
            // output an entry that is already referenced.
            if self.state.implied.remove(index) {
                emit_index(index, dst);
                emit_index(index, dst);
            }
            tracing::trace!(index, "compressor duplicate, toggling off and on");
            emit_index(index, dst);
            emit_index(index, dst);
            return;
        }

        if self.state.reference.contains(index) {
            tracing::trace!(index, "compressor entry continues implicitly");
            self.state.alternate.insert(index);
            self.state.implied.insert(index);
            return;
        }

        if index < self.state.table.variable_len() {
            tracing::trace!(index, "compressor toggling on");
            emit_index(index, dst);
            self.state.alternate.insert(index);
            return;
        }

        // Static entry: the decoder copies it into the dynamic table.
        let size = field.size();
        self.preserve_implied(self.state.eviction_range(size), dst);
        tracing::trace!(index, "compressor toggling on static entry");
        emit_index(index, dst);
        if size > self.state.max_buffer() {
            self.state.clear_table();
            return;
        }
        self.state.make_room(size);
        self.state.add(field.clone());
        self.state.alternate.insert(0);
    }

    fn process_literal<B: BufMut>(
        &mut self,
        field: &HeaderField,
        policy: IndexPolicy,
        name_index: usize,
        dst: &mut B,
    ) {
        let size = field.size();
        let max_buffer = self.state.max_buffer();

        let indexable = size <= max_buffer / 2 && max_buffer >= MIN_INDEXING_BUFFER;
        let kind = match policy {
            IndexPolicy::NeverIndex => Literal::NeverIndexed,
            IndexPolicy::Incremental if indexable => Literal::Indexed,
            IndexPolicy::Incremental | IndexPolicy::NoLocalIndex => Literal::Plain,
        };
        tracing::trace!(
            name = %String::from_utf8_lossy(&field.name),
            name_index,
            ?kind,
            "compressor literal"
        );

        if let Literal::Indexed = kind {
            // Implied references about to be evicted must reach the decoder
            // before the literal that evicts them.
            self.preserve_implied(self.state.eviction_range(size), dst);
            emit_literal(kind, field, name_index, dst);
            self.state.make_room(size);
            self.state.add(field.clone());
            self.state.alternate.insert(0);
        } else {
            emit_literal(kind, field, name_index, dst);
        }
    }

    /// Turn implied references in `victims` into explicit output, since the
    /// decoder drops referenced entries silently when it evicts them.
    fn preserve_implied<B: BufMut>(&mut self, victims: Range<usize>, dst: &mut B) {
        for index in victims {
            if self.state.implied.remove(index) {
                tracing::trace!(index, "compressor flushing implied entry before eviction");
                emit_index(index, dst);
                emit_index(index, dst);
            }
        }
    }

    fn finish_block<B: BufMut>(&mut self, dst: &mut B) {
        let state = &mut self.state;
        for index in state.reference.iter() {
            if !state.alternate.contains(index) {
                tracing::trace!(index, "compressor toggling off stale reference");
                emit_index(index, dst);
            }
        }
        state.reference.take_from(&mut state.alternate);
        state.implied.clear();
        state.dump("compressor");
    }
}

fn borrowed(
    fields: &[(HeaderField, IndexPolicy)],
) -> impl Iterator<Item = (&HeaderField, IndexPolicy)> {
    fields.iter().map(|(field, policy)| (field, *policy))
}

/// Indexed representation: toggles `index` in the decoder's reference set.
fn emit_index<B: BufMut>(index: usize, dst: &mut B) {
    encode_integer(dst, index + 1, 7, 0x80);
}

fn emit_literal<B: BufMut>(kind: Literal, field: &HeaderField, name_index: usize, dst: &mut B) {
    let (pattern, prefix_bits) = kind.pattern();
    encode_integer(dst, name_index, prefix_bits, pattern);
    if name_index == 0 {
        emit_huffman_string(&field.name, dst);
    }
    emit_huffman_string(&field.value, dst);
}

fn emit_huffman_string<B: BufMut>(data: &[u8], dst: &mut B) {
    encode_integer(dst, huffman::encoded_len(data), 7, 0x80);
    huffman::encode(data, dst);
}
