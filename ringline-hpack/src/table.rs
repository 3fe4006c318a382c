//! Header table: the dynamic region (newest first) followed by the static
//! table.
//!
//! Table index 0 is the most recently inserted dynamic entry. Indices
//! `variable_len()..len()` address the static table. On the wire indices are
//! 1-based, so wire index `i` is table index `i - 1`.

use std::collections::VecDeque;

use crate::error::HpackError;

/// Per-entry overhead added to `name.len() + value.len()`.
pub const ENTRY_OVERHEAD: usize = 32;

/// A single header name-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Cost of this pair against the table budget.
    pub fn size(&self) -> usize {
        entry_size(&self.name, &self.value)
    }

    pub fn entry(&self) -> EntryRef<'_> {
        EntryRef {
            name: &self.name,
            value: &self.value,
        }
    }
}

/// Borrowed view of a table entry, dynamic or static.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef<'a> {
    pub name: &'a [u8],
    pub value: &'a [u8],
}

impl EntryRef<'_> {
    pub fn size(&self) -> usize {
        entry_size(self.name, self.value)
    }

    pub fn to_field(self) -> HeaderField {
        HeaderField::new(self.name, self.value)
    }
}

pub(crate) fn entry_size(name: &[u8], value: &[u8]) -> usize {
    name.len() + value.len() + ENTRY_OVERHEAD
}

/// Static table entries, in table order.
pub const STATIC_TABLE: &[(&[u8], &[u8])] = &[
    (b":authority", b""),
    (b":method", b"GET"),
    (b":method", b"POST"),
    (b":path", b"/"),
    (b":path", b"/index.html"),
    (b":scheme", b"http"),
    (b":scheme", b"https"),
    (b":status", b"200"),
    (b":status", b"204"),
    (b":status", b"206"),
    (b":status", b"304"),
    (b":status", b"400"),
    (b":status", b"404"),
    (b":status", b"500"),
    (b"accept-charset", b""),
    (b"accept-encoding", b"gzip, deflate"),
    (b"accept-language", b""),
    (b"accept-ranges", b""),
    (b"accept", b""),
    (b"access-control-allow-origin", b""),
    (b"age", b""),
    (b"allow", b""),
    (b"authorization", b""),
    (b"cache-control", b""),
    (b"content-disposition", b""),
    (b"content-encoding", b""),
    (b"content-language", b""),
    (b"content-length", b""),
    (b"content-location", b""),
    (b"content-range", b""),
    (b"content-type", b""),
    (b"cookie", b""),
    (b"date", b""),
    (b"etag", b""),
    (b"expect", b""),
    (b"expires", b""),
    (b"from", b""),
    (b"host", b""),
    (b"if-match", b""),
    (b"if-modified-since", b""),
    (b"if-none-match", b""),
    (b"if-range", b""),
    (b"if-unmodified-since", b""),
    (b"last-modified", b""),
    (b"link", b""),
    (b"location", b""),
    (b"max-forwards", b""),
    (b"proxy-authenticate", b""),
    (b"proxy-authorization", b""),
    (b"range", b""),
    (b"referer", b""),
    (b"refresh", b""),
    (b"retry-after", b""),
    (b"server", b""),
    (b"set-cookie", b""),
    (b"strict-transport-security", b""),
    (b"transfer-encoding", b""),
    (b"user-agent", b""),
    (b"vary", b""),
    (b"via", b""),
    (b"www-authenticate", b""),
];

/// Result of scanning the table for a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lookup {
    /// First entry whose name matches.
    pub name: Option<usize>,
    /// First entry whose name and value both match.
    pub exact: Option<usize>,
}

/// Dynamic entries plus a view over the static table.
#[derive(Debug, Default)]
pub struct HeaderTable {
    dynamic: VecDeque<HeaderField>,
    byte_count: usize,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dynamic plus static entries.
    pub fn len(&self) -> usize {
        self.dynamic.len() + STATIC_TABLE.len()
    }

    /// The table always holds the static entries.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Dynamic entries only.
    pub fn variable_len(&self) -> usize {
        self.dynamic.len()
    }

    /// Summed cost of the dynamic entries.
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    pub fn get(&self, index: usize) -> Result<EntryRef<'_>, HpackError> {
        if let Some(field) = self.dynamic.get(index) {
            return Ok(field.entry());
        }
        STATIC_TABLE
            .get(index - self.dynamic.len())
            .map(|&(name, value)| EntryRef { name, value })
            .ok_or(HpackError::IllegalIndex(index + 1))
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = EntryRef<'_>> {
        self.dynamic.iter().map(HeaderField::entry).chain(
            STATIC_TABLE
                .iter()
                .map(|&(name, value)| EntryRef { name, value }),
        )
    }

    /// Linear scan, dynamic entries first.
    pub fn find(&self, name: &[u8], value: &[u8]) -> Lookup {
        let mut lookup = Lookup::default();
        for (index, entry) in self.iter().enumerate() {
            if entry.name != name {
                continue;
            }
            lookup.name.get_or_insert(index);
            if entry.value == value {
                lookup.exact = Some(index);
                break;
            }
        }
        lookup
    }

    /// Insert at index 0. Every previously valid index moves up by one.
    pub(crate) fn push_front(&mut self, field: HeaderField) {
        self.byte_count += field.size();
        self.dynamic.push_front(field);
    }

    /// Evict the oldest dynamic entry (index `variable_len() - 1`).
    pub(crate) fn pop_oldest(&mut self) -> Option<HeaderField> {
        let evicted = self.dynamic.pop_back()?;
        self.byte_count -= evicted.size();
        Some(evicted)
    }

    pub(crate) fn clear(&mut self) {
        self.dynamic.clear();
        self.byte_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_table_size() {
        assert_eq!(STATIC_TABLE.len(), 61);
        assert_eq!(HeaderTable::new().len(), 61);
    }

    #[test]
    fn static_lookup_follows_dynamic_region() {
        let mut table = HeaderTable::new();
        assert_eq!(table.get(1).unwrap().value, b"GET");

        table.push_front(HeaderField::new(b"x-a", b"1"));
        assert_eq!(table.get(0).unwrap().name, b"x-a");
        assert_eq!(table.get(2).unwrap().value, b"GET");
        assert_eq!(table.get(61).unwrap().name, b"www-authenticate");
        assert_eq!(table.get(62), Err(HpackError::IllegalIndex(63)));
    }

    #[test]
    fn newest_entry_is_index_zero() {
        let mut table = HeaderTable::new();
        table.push_front(HeaderField::new(b"x-a", b"1"));
        table.push_front(HeaderField::new(b"x-b", b"2"));
        assert_eq!(table.get(0).unwrap().name, b"x-b");
        assert_eq!(table.get(1).unwrap().name, b"x-a");

        let evicted = table.pop_oldest().unwrap();
        assert_eq!(evicted.name, b"x-a");
        assert_eq!(table.variable_len(), 1);
    }

    #[test]
    fn byte_count_tracks_entries() {
        let mut table = HeaderTable::new();
        table.push_front(HeaderField::new(b"content-type", b"application/json"));
        assert_eq!(table.byte_count(), 60);
        table.push_front(HeaderField::new(b"x", b""));
        assert_eq!(table.byte_count(), 93);
        table.pop_oldest();
        assert_eq!(table.byte_count(), 33);
        table.clear();
        assert_eq!(table.byte_count(), 0);
        assert_eq!(table.variable_len(), 0);
    }

    #[test]
    fn find_prefers_dynamic_and_first_name() {
        let mut table = HeaderTable::new();
        let lookup = table.find(b":method", b"PUT");
        assert_eq!((lookup.name, lookup.exact), (Some(1), None));

        let lookup = table.find(b":method", b"POST");
        assert_eq!((lookup.name, lookup.exact), (Some(1), Some(2)));

        table.push_front(HeaderField::new(b":method", b"POST"));
        let lookup = table.find(b":method", b"POST");
        assert_eq!((lookup.name, lookup.exact), (Some(0), Some(0)));

        assert_eq!(table.find(b"x-custom", b"v"), Lookup::default());
    }
}
