//! Boundary to the native HDF5 library.
//!
//! Every call into the library goes through [`h5call`], which serialises
//! access, checks the returned status and turns a failure into a
//! [`NativeError`] carrying the most specific message on the library's error
//! stack. The library's own printing of error stacks is switched off; use
//! [`set_error_printing`] to log failures through `tracing` instead.

mod buffer;
mod plist;
mod space;
pub(crate) mod types;

use std::cell::Cell;
use std::ffi::{c_char, c_uint, c_void, CStr, CString};
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use parking_lot::ReentrantMutex;
use thiserror::Error;

use hdf5_metno_sys::h5::{herr_t, H5open};
use hdf5_metno_sys::h5e::{
    H5E_direction_t, H5E_error2_t, H5Eclear2, H5Eset_auto2, H5Ewalk2, H5E_DEFAULT,
};
use hdf5_metno_sys::h5f::H5Fget_name;
use hdf5_metno_sys::h5i::{
    hid_t, H5I_type_t, H5Idec_ref, H5Iget_name, H5Iget_type, H5Iis_valid, H5I_INVALID_HID,
};

pub(crate) use buffer::ReadBuffer;
pub use plist::PropListClass;
pub(crate) use space::{selected_indices, simple_space};
pub use space::{SpaceClass, UNLIMITED};

/// Native object identifier (`hid_t`).
pub type Hid = hid_t;

/// Identifier of a released or never-opened object.
pub const INVALID_HID: Hid = H5I_INVALID_HID;

const FAIL: i32 = -1;

static PRINT_ERRORS: AtomicBool = AtomicBool::new(false);

pub(crate) fn set_error_printing(on: bool) {
    PRINT_ERRORS.store(on, Ordering::Relaxed);
}

/// Major error classes, by the family of the failing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Args,
    Resource,
    Id,
    File,
    Symbol,
    Dataset,
    Datatype,
    Dataspace,
    Attribute,
    PropList,
    Heap,
    Table,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Args => "invalid arguments",
            ErrorClass::Resource => "resource unavailable",
            ErrorClass::Id => "object atom",
            ErrorClass::File => "file accessibility",
            ErrorClass::Symbol => "symbol table",
            ErrorClass::Dataset => "dataset",
            ErrorClass::Datatype => "datatype",
            ErrorClass::Dataspace => "dataspace",
            ErrorClass::Attribute => "attribute",
            ErrorClass::PropList => "property list",
            ErrorClass::Heap => "heap",
            ErrorClass::Table => "packet table",
        };
        f.write_str(name)
    }
}

/// A failed native call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("native error {status} ({class}): {detail}")]
pub struct NativeError {
    /// Negative status returned by the call.
    pub status: i32,
    pub class: ErrorClass,
    pub detail: String,
}

pub(crate) type NResult<T> = Result<T, NativeError>;

fn raise(status: i32, class: ErrorClass, detail: String) -> NativeError {
    let err = NativeError {
        status,
        class,
        detail,
    };
    if PRINT_ERRORS.load(Ordering::Relaxed) {
        tracing::error!(status = err.status, class = %err.class, "{}", err.detail);
    }
    err
}

/// A failure detected before reaching the library.
pub(crate) fn fail(class: ErrorClass, detail: impl Into<String>) -> NativeError {
    raise(FAIL, class, detail.into())
}

/// File access flags (`H5F_ACC_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFlags {
    /// Create, replacing any existing file.
    Truncate,
    /// Create, failing if the file exists.
    Exclusive,
    ReadOnly,
    ReadWrite,
}

/// Kind of object an identifier refers to (`H5I_type_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IType {
    BadId,
    File,
    Group,
    Datatype,
    Dataspace,
    Dataset,
    Attribute,
    PropList,
}

// ---- Library access ----

fn library() -> &'static ReentrantMutex<()> {
    static LIBRARY: OnceLock<ReentrantMutex<()>> = OnceLock::new();
    LIBRARY.get_or_init(|| {
        // SAFETY: H5open only initialises library globals and may be repeated.
        let status = unsafe { H5open() };
        tracing::debug!(status, "initialised native library");
        ReentrantMutex::new(())
    })
}

thread_local! {
    static SILENCED: Cell<bool> = const { Cell::new(false) };
}

/// Runs `f` while holding the library lock. Nested calls on the same
/// thread do not block.
pub(crate) fn sync<T>(f: impl FnOnce() -> T) -> T {
    let _guard = library().lock();
    SILENCED.with(|silenced| {
        if !silenced.get() {
            // SAFETY: disables the automatic stderr report for this thread.
            unsafe { H5Eset_auto2(H5E_DEFAULT, None, ptr::null_mut()) };
            silenced.set(true);
        }
    });
    f()
}

/// Return values whose negative range signals failure.
pub(crate) trait Status: Copy {
    fn failed(self) -> bool;
    fn code(self) -> i32;
}

macro_rules! impl_status {
    ($($ty:ty),*) => {
        $(impl Status for $ty {
            fn failed(self) -> bool {
                self < 0
            }

            fn code(self) -> i32 {
                i32::try_from(self).unwrap_or(FAIL)
            }
        })*
    };
}

impl_status!(i32, i64, isize);

/// Calls into the library under the lock and checks the result.
pub(crate) fn h5call<T: Status>(
    class: ErrorClass,
    call: &'static str,
    f: impl FnOnce() -> T,
) -> NResult<T> {
    sync(|| {
        let ret = f();
        if ret.failed() {
            let detail = match innermost_error() {
                Some(message) => format!("{call}: {message}"),
                None => format!("{call} failed"),
            };
            return Err(raise(ret.code(), class, detail));
        }
        Ok(ret)
    })
}

extern "C" fn first_message(n: c_uint, err: *const H5E_error2_t, data: *mut c_void) -> herr_t {
    if n != 0 || err.is_null() {
        return 0;
    }
    // SAFETY: the library hands a valid record; `data` is the `Option<String>`
    // passed to H5Ewalk2 below.
    unsafe {
        let out = &mut *data.cast::<Option<String>>();
        let desc = (*err).desc;
        if !desc.is_null() {
            *out = Some(CStr::from_ptr(desc).to_string_lossy().into_owned());
        }
    }
    0
}

/// The most specific message on the current error stack, which is then
/// cleared.
fn innermost_error() -> Option<String> {
    let mut message: Option<String> = None;
    // SAFETY: the callback only writes through the pointer to `message`.
    unsafe {
        H5Ewalk2(
            H5E_DEFAULT,
            H5E_direction_t::H5E_WALK_UPWARD,
            Some(first_message),
            (&mut message as *mut Option<String>).cast(),
        );
        H5Eclear2(H5E_DEFAULT);
    }
    message.filter(|m| !m.is_empty())
}

pub(crate) fn to_cstring(class: ErrorClass, s: &str) -> NResult<CString> {
    CString::new(s).map_err(|e| {
        fail(
            class,
            format!("name {s:?} has a NUL byte at {}", e.nul_position()),
        )
    })
}

/// Reads a string through the usual two-call protocol: query the length,
/// then fill a buffer one byte longer.
pub(crate) fn get_string(
    class: ErrorClass,
    call: &'static str,
    f: impl Fn(*mut c_char, usize) -> isize,
) -> NResult<String> {
    sync(|| {
        let len = h5call(class, call, || f(ptr::null_mut(), 0))? as usize;
        let mut buf = vec![0u8; len + 1];
        h5call(class, call, || f(buf.as_mut_ptr().cast(), buf.len()))?;
        buf.truncate(len);
        String::from_utf8(buf).map_err(|_| fail(class, format!("{call} returned a non-UTF-8 name")))
    })
}

/// A temporary identifier released when dropped.
#[derive(Debug)]
pub(crate) struct TempId(Hid);

impl TempId {
    pub fn new(id: Hid) -> Self {
        Self(id)
    }

    pub fn id(&self) -> Hid {
        self.0
    }

    /// Hands ownership to the caller.
    pub fn into_id(self) -> Hid {
        let id = self.0;
        std::mem::forget(self);
        id
    }
}

impl Drop for TempId {
    fn drop(&mut self) {
        if self.0 != INVALID_HID {
            let id = self.0;
            // SAFETY: the identifier is owned by this guard.
            sync(|| unsafe { H5Idec_ref(id) });
        }
    }
}

// ---- Identifiers ----

pub(crate) fn close(id: Hid) -> NResult<()> {
    // SAFETY: plain identifier call.
    h5call(ErrorClass::Id, "H5Idec_ref", || unsafe { H5Idec_ref(id) })?;
    Ok(())
}

pub(crate) fn is_valid(id: Hid) -> bool {
    // SAFETY: plain identifier call.
    sync(|| unsafe { H5Iis_valid(id) }) > 0
}

pub(crate) fn id_type(id: Hid) -> IType {
    // SAFETY: plain identifier call.
    match sync(|| unsafe { H5Iget_type(id) }) {
        H5I_type_t::H5I_FILE => IType::File,
        H5I_type_t::H5I_GROUP => IType::Group,
        H5I_type_t::H5I_DATATYPE => IType::Datatype,
        H5I_type_t::H5I_DATASPACE => IType::Dataspace,
        H5I_type_t::H5I_DATASET => IType::Dataset,
        H5I_type_t::H5I_ATTR => IType::Attribute,
        H5I_type_t::H5I_GENPROP_LST => IType::PropList,
        _ => IType::BadId,
    }
}

pub(crate) fn object_name(id: Hid) -> NResult<String> {
    // SAFETY: the buffer pointer and size come from `get_string`.
    get_string(ErrorClass::Id, "H5Iget_name", |buf, size| unsafe {
        H5Iget_name(id, buf, size)
    })
}

pub(crate) fn file_name(id: Hid) -> NResult<String> {
    // SAFETY: the buffer pointer and size come from `get_string`.
    get_string(ErrorClass::File, "H5Fget_name", |buf, size| unsafe {
        H5Fget_name(id, buf, size)
    })
}
