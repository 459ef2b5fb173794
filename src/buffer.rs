//! Immutable byte windows with cached views.
//!
//! Every node reached by the search owns exactly one [`ByteBuffer`].  The
//! backing store is shared, so `slice()` is a pointer adjustment rather than
//! a copy, and the two expensive views (the UTF-8 decode and the 64-bit
//! identity hash) are computed at most once per buffer.

use std::cell::OnceCell;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Bytes hashed per end of a large buffer.  Identity hashing is
/// length-bounded: the full content only contributes when the buffer is
/// smaller than two windows.
const HASH_WINDOW: usize = 4096;

/// An immutable view over a sequence of bytes.
///
/// Length and content never change after construction.  Cached views are
/// interior state only; two buffers with equal bytes are interchangeable.
#[derive(Clone)]
pub struct ByteBuffer {
    data:  Arc<[u8]>,
    start: usize,
    end:   usize,
    utf8:  OnceCell<Option<String>>,
    hash:  OnceCell<u64>,
}

impl ByteBuffer {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let data: Arc<[u8]> = bytes.into();
        let end = data.len();
        Self { data, start: 0, end, utf8: OnceCell::new(), hash: OnceCell::new() }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    /// A sub-window sharing the backing store.  Out-of-range bounds are
    /// clamped to the buffer length.
    pub fn slice(&self, range: Range<usize>) -> ByteBuffer {
        let len   = self.len();
        let lo    = range.start.min(len);
        let hi    = range.end.min(len).max(lo);
        ByteBuffer {
            data:  Arc::clone(&self.data),
            start: self.start + lo,
            end:   self.start + hi,
            utf8:  OnceCell::new(),
            hash:  OnceCell::new(),
        }
    }

    /// The buffer decoded as UTF-8, or `None` when the bytes are not valid
    /// UTF-8.  The decode runs once; repeat calls return the cached result.
    pub fn try_as_utf8(&self) -> Option<&str> {
        self.utf8
            .get_or_init(|| String::from_utf8(self.as_bytes().to_vec()).ok())
            .as_deref()
    }

    /// Length-bounded 64-bit identity hash.
    ///
    /// BLAKE3 over the length plus a leading and trailing [`HASH_WINDOW`],
    /// truncated to the first eight digest bytes.  Buffers under two windows
    /// hash their full content.
    pub fn hash64(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let bytes = self.as_bytes();
            let mut hasher = blake3::Hasher::new();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            if bytes.len() <= 2 * HASH_WINDOW {
                hasher.update(bytes);
            } else {
                hasher.update(&bytes[..HASH_WINDOW]);
                hasher.update(&bytes[bytes.len() - HASH_WINDOW..]);
            }
            let digest = hasher.finalize();
            let mut word = [0u8; 8];
            word.copy_from_slice(&digest.as_bytes()[..8]);
            u64::from_le_bytes(word)
        })
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(v: Vec<u8>) -> Self {
        ByteBuffer::new(v)
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(b: &[u8]) -> Self {
        ByteBuffer::new(b.to_vec())
    }
}

impl From<&str> for ByteBuffer {
    fn from(s: &str) -> Self {
        ByteBuffer::new(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = &self.as_bytes()[..self.len().min(16)];
        write!(f, "ByteBuffer({} B, {}{})",
            self.len(),
            hex::encode(head),
            if self.len() > 16 { "…" } else { "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_is_a_view() {
        let buf = ByteBuffer::from("hello world");
        let tail = buf.slice(6..11);
        assert_eq!(tail.as_bytes(), b"world");
        assert_eq!(tail.try_as_utf8(), Some("world"));
    }

    #[test]
    fn slice_clamps_out_of_range() {
        let buf = ByteBuffer::from("abc");
        assert_eq!(buf.slice(1..99).as_bytes(), b"bc");
        assert_eq!(buf.slice(7..9).len(), 0);
    }

    #[test]
    fn utf8_cache_rejects_invalid() {
        let buf = ByteBuffer::new(vec![0xFF, 0xFE, 0x41]);
        assert_eq!(buf.try_as_utf8(), None);
        assert_eq!(buf.try_as_utf8(), None); // cached path
    }

    #[test]
    fn hash_is_content_stable() {
        let a = ByteBuffer::from("payload");
        let b = ByteBuffer::from("payload");
        assert_eq!(a.hash64(), b.hash64());
        assert_ne!(a.hash64(), ByteBuffer::from("payloae").hash64());
    }

    #[test]
    fn hash_distinguishes_lengths() {
        // Large buffers hash only their ends; length must still separate
        // an all-zero buffer from a longer all-zero buffer.
        let a = ByteBuffer::new(vec![0u8; 20_000]);
        let b = ByteBuffer::new(vec![0u8; 30_000]);
        assert_ne!(a.hash64(), b.hash64());
    }

    #[test]
    fn empty_buffer() {
        let buf = ByteBuffer::new(Vec::new());
        assert!(buf.is_empty());
        assert_eq!(buf.try_as_utf8(), Some(""));
    }
}
