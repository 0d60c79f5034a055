//! Native byte-order detection and byte-order aware scalar access.

use std::sync::OnceLock;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order used to lay out scalars in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

static NATIVE: OnceLock<Endianness> = OnceLock::new();

impl Endianness {
    /// Machine byte order, detected once from a known 16-bit pattern.
    pub fn native() -> Endianness {
        *NATIVE.get_or_init(|| {
            let pattern = 0x0102u16.to_ne_bytes();
            if pattern[0] == 0x02 {
                Endianness::Little
            } else {
                Endianness::Big
            }
        })
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Endianness::native()
    }
}

macro_rules! order_dispatch {
    ($order:expr, $method:ident ( $($arg:expr),* )) => {
        match $order {
            Endianness::Little => LittleEndian::$method($($arg),*),
            Endianness::Big => BigEndian::$method($($arg),*),
        }
    };
}

impl Endianness {
    pub fn write_u16(self, buf: &mut [u8], v: u16) {
        order_dispatch!(self, write_u16(buf, v))
    }

    pub fn write_u32(self, buf: &mut [u8], v: u32) {
        order_dispatch!(self, write_u32(buf, v))
    }

    pub fn write_u64(self, buf: &mut [u8], v: u64) {
        order_dispatch!(self, write_u64(buf, v))
    }

    pub fn read_u16(self, buf: &[u8]) -> u16 {
        order_dispatch!(self, read_u16(buf))
    }

    pub fn read_u32(self, buf: &[u8]) -> u32 {
        order_dispatch!(self, read_u32(buf))
    }

    pub fn read_u64(self, buf: &[u8]) -> u64 {
        order_dispatch!(self, read_u64(buf))
    }

    /// Writes a pointer-width unsigned value.
    pub fn write_usize(self, buf: &mut [u8], v: usize) {
        #[cfg(target_pointer_width = "64")]
        self.write_u64(buf, v as u64);
        #[cfg(target_pointer_width = "32")]
        self.write_u32(buf, v as u32);
    }

    pub fn read_usize(self, buf: &[u8]) -> usize {
        #[cfg(target_pointer_width = "64")]
        return self.read_u64(buf) as usize;
        #[cfg(target_pointer_width = "32")]
        return self.read_u32(buf) as usize;
    }
}
