//! Destination buffers for native reads.

use std::ffi::c_void;

use hdf5_metno_sys::h5d::H5Dvlen_reclaim;
use hdf5_metno_sys::h5p::H5P_DEFAULT;

use super::{simple_space, sync, Hid, TempId};

/// Memory the library fills on a read, in the layout of `mem_type`.
///
/// Variable-length sequences and strings in the buffer point at storage the
/// library allocated; it is handed back through `H5Dvlen_reclaim` when the
/// buffer is dropped.
#[derive(Debug)]
pub(crate) struct ReadBuffer {
    bytes: Vec<u8>,
    mem_type: TempId,
    count: usize,
    reclaim: bool,
}

impl ReadBuffer {
    /// Zeroed room for `count` elements of `size` bytes each. Takes ownership
    /// of `mem_type`.
    pub fn zeroed(mem_type: TempId, count: usize, size: usize, has_pointers: bool) -> Self {
        Self {
            bytes: vec![0; count * size],
            mem_type,
            count,
            reclaim: has_pointers,
        }
    }

    pub fn mem_type(&self) -> Hid {
        self.mem_type.id()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.bytes.as_mut_ptr().cast()
    }
}

impl Drop for ReadBuffer {
    #[allow(deprecated)]
    fn drop(&mut self) {
        if !self.reclaim || self.count == 0 {
            return;
        }
        let space = match simple_space(self.count) {
            Ok(space) => space,
            Err(e) => {
                tracing::warn!(error = %e, "leaking variable-length read storage");
                return;
            }
        };
        let mem_type = self.mem_type.id();
        let buf = self.as_mut_ptr();
        // SAFETY: `buf` holds `count` elements of `mem_type` written by the
        // library, and `space` describes exactly those elements.
        let status = sync(|| unsafe { H5Dvlen_reclaim(mem_type, space.id(), H5P_DEFAULT, buf) });
        if status < 0 {
            tracing::warn!(status, "failed to reclaim variable-length read storage");
        }
    }
}
