use crate::error::HpackError;

/// Read position over one header block.
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub(crate) fn next_byte(&mut self) -> Result<u8, HpackError> {
        let byte = self.peek().ok_or(HpackError::TruncatedInput)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Take the next `len` bytes.
    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], HpackError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(HpackError::TruncatedInput)?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}
