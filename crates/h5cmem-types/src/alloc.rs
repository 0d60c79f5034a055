//! Out-of-band heap blocks referenced by `{len, ptr}` pairs and string
//! pointers inside encoded buffers.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every block; enough for any native scalar.
const BLOCK_ALIGN: usize = 16;

/// A zero-initialised heap allocation with a stable address.
///
/// The address is written into buffers handed to the native library, so the
/// block must stay alive until that call returns. Dropping the block frees it.
pub struct RawBlock {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

impl RawBlock {
    /// Allocates `len` zeroed bytes. Returns `None` if the allocator fails.
    pub fn zeroed(len: usize) -> Option<Self> {
        let layout = Layout::from_size_align(len.max(1), BLOCK_ALIGN).ok()?;
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw)?;
        Some(Self { ptr, len, layout })
    }

    /// Allocates a block holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut block = Self::zeroed(bytes.len())?;
        block.as_mut_slice().copy_from_slice(bytes);
        Some(block)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address written into encoded buffers.
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialised bytes for the life of self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with exactly this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for RawBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBlock")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("len", &self.len)
            .finish()
    }
}

// SAFETY: RawBlock uniquely owns its allocation.
unsafe impl Send for RawBlock {}
unsafe impl Sync for RawBlock {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_and_aligned() {
        let block = RawBlock::zeroed(33).unwrap();
        assert_eq!(block.len(), 33);
        assert!(block.as_slice().iter().all(|&b| b == 0));
        assert_eq!(block.addr() % BLOCK_ALIGN, 0);
    }

    #[test]
    fn empty_block_has_address() {
        let block = RawBlock::zeroed(0).unwrap();
        assert!(block.is_empty());
        assert_ne!(block.addr(), 0);
        assert!(block.as_slice().is_empty());
    }

    #[test]
    fn from_bytes_copies() {
        let block = RawBlock::from_bytes(b"abc\0").unwrap();
        assert_eq!(block.as_slice(), b"abc\0");
    }
}
