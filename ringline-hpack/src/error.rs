/// Errors produced while decoding a header block.
///
/// Table and reference-set updates are applied token by token and are not
/// rolled back, so after any of these the decoder no longer mirrors the
/// peer's encoder. The connection must be torn down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    /// Ran out of bytes mid-integer, mid-literal or mid-instruction.
    #[error("header block truncated")]
    TruncatedInput,

    /// A prefixed integer does not fit in 32 bits.
    #[error("integer overflow")]
    IntegerOverflow,

    /// Wire index 0, or an index past the end of the header table.
    #[error("illegal header table index {0}")]
    IllegalIndex(usize),

    /// Huffman data chains past the input, decodes EOS, or is badly padded.
    #[error("illegal huffman code")]
    IllegalHuffmanCode,

    /// Connection-specific or upper-case header name.
    #[error("disallowed header name: {0}")]
    DisallowedHeaderName(String),

    /// Size update larger than the size we advertised to the peer.
    #[error("table size update {requested} exceeds limit {limit}")]
    TableSizeExceeded { requested: usize, limit: usize },
}

impl HpackError {
    /// Every decoding error desynchronizes the shared table state.
    #[inline]
    pub fn is_connection_fatal(&self) -> bool {
        true
    }

    pub(crate) fn disallowed(name: &[u8]) -> Self {
        Self::DisallowedHeaderName(String::from_utf8_lossy(name).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            HpackError::IllegalIndex(70).to_string(),
            "illegal header table index 70"
        );
        assert_eq!(
            HpackError::disallowed(b"Connection").to_string(),
            "disallowed header name: Connection"
        );
        let err = HpackError::TableSizeExceeded {
            requested: 8192,
            limit: 4096,
        };
        let text = err.to_string();
        assert_eq!(text, "table size update 8192 exceeds limit 4096");
    }

    #[test]
    fn all_errors_are_fatal() {
        assert!(HpackError::TruncatedInput.is_connection_fatal());
        assert!(HpackError::IllegalHuffmanCode.is_connection_fatal());
    }
}
