//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Once;

use ringline_hpack::{Compressor, Decompressor, HeaderField, IndexPolicy};
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output to the test harness. Honors `RUST_LOG`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

pub fn incremental(pairs: &[(&str, &str)]) -> Vec<(HeaderField, IndexPolicy)> {
    pairs
        .iter()
        .map(|(name, value)| {
            let field = HeaderField::new(name.as_bytes(), value.as_bytes());
            (field, IndexPolicy::Incremental)
        })
        .collect()
}

/// Decoded text split into sorted lines.
pub fn sorted_lines(text: &[u8]) -> Vec<String> {
    let text = std::str::from_utf8(text).expect("decoded text is utf-8");
    let mut lines: Vec<String> = text.split_terminator("\r\n").map(str::to_owned).collect();
    lines.sort();
    lines
}

/// What the decoder should print for `fields`, sorted.
pub fn expected_lines(fields: &[(HeaderField, IndexPolicy)]) -> Vec<String> {
    let mut lines: Vec<String> = fields
        .iter()
        .map(|(field, _)| {
            format!(
                "{}: {}",
                String::from_utf8_lossy(&field.name),
                String::from_utf8_lossy(&field.value)
            )
        })
        .collect();
    lines.sort();
    lines
}

/// Both sides hold the same dynamic entries under the same budget.
pub fn assert_tables_match(compressor: &Compressor, decompressor: &Decompressor) {
    let ours: Vec<HeaderField> = compressor.table().iter().map(|e| e.to_field()).collect();
    let theirs: Vec<HeaderField> = decompressor.table().iter().map(|e| e.to_field()).collect();
    assert_eq!(ours, theirs);
    assert_eq!(
        compressor.table().byte_count(),
        decompressor.table().byte_count()
    );
    assert_eq!(compressor.max_buffer_size(), decompressor.max_buffer_size());
}

/// Encode `fields` as one block, decode it, and check the output.
pub fn round_trip(
    compressor: &mut Compressor,
    decompressor: &mut Decompressor,
    fields: &[(HeaderField, IndexPolicy)],
) -> Vec<u8> {
    let mut block = Vec::new();
    compressor.encode_fields(fields, &mut block);
    let text = decompressor.decode_header_block(&block).expect("block decodes");
    let expected = expected_lines(fields);
    assert_eq!(sorted_lines(&text), expected, "block {block:02x?}");
    assert_tables_match(compressor, decompressor);
    block
}
