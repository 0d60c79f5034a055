//! Packet tables: append-only sequences of fixed-size records.
//!
//! A table is a one-dimensional chunked dataset with an unlimited maximum
//! extent. Appends grow the extent and write into the new tail; the read
//! cursor lives in the handle, so two handles on one table walk it
//! independently.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use h5cmem_types::{EncodingError, H5Decode, H5Type};

use crate::dataset::Dataset;
use crate::datatype::Datatype;
use crate::dataspace::Dataspace;
use crate::error::Result;
use crate::group;
use crate::identifier::Identifier;
use crate::native::{fail, ErrorClass, Hid, PropListClass, UNLIMITED};
use crate::proplist::PropList;

const CLASS: ErrorClass = ErrorClass::Table;

/// An open packet table with a read cursor.
#[derive(Debug)]
pub struct Table {
    dataset: Dataset,
    cursor: AtomicU64,
}

impl Deref for Table {
    type Target = Identifier;

    fn deref(&self) -> &Identifier {
        &self.dataset
    }
}

pub(crate) fn create(
    loc: Hid,
    name: &str,
    dtype: &Datatype,
    chunk_size: u64,
    compression: Option<u32>,
) -> Result<Table> {
    if chunk_size == 0 {
        return Err(fail(CLASS, "chunk size must be positive").into());
    }
    let dcpl = PropList::new(PropListClass::DatasetCreate)?;
    dcpl.set_chunk(&[chunk_size])?;
    if let Some(level) = compression {
        dcpl.set_deflate(level)?;
    }
    let space = Dataspace::create_simple(&[0], Some(&[UNLIMITED]))?;
    let dataset = group::create_dataset(loc, name, dtype, &space, Some(&dcpl))?;
    tracing::debug!(name, chunk_size, ?compression, "created packet table");
    Ok(Table::from_dataset(dataset))
}

pub(crate) fn open(loc: Hid, name: &str) -> Result<Table> {
    let dataset = group::open_dataset(loc, name)?;
    let (_, maxdims) = dataset.space()?.simple_extent_dims()?;
    if maxdims != [UNLIMITED] {
        return Err(fail(CLASS, format!("{name} is not a growable one-dimensional dataset")).into());
    }
    Ok(Table::from_dataset(dataset))
}

impl Table {
    fn from_dataset(dataset: Dataset) -> Self {
        Self {
            dataset,
            cursor: AtomicU64::new(0),
        }
    }

    /// Releases the handle. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        self.dataset.close()
    }

    /// Appends `records` in order. Appending nothing is an error.
    pub fn append<T: H5Type + 'static>(&self, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Err(EncodingError::EmptySequence("packet table append").into());
        }
        let old = self.num_packets()?;
        let n = records.len() as u64;
        self.dataset.set_extent(&[old + n])?;
        let tail = self.dataset.space()?;
        tail.select_hyperslab(&[old], None, &[n], None)?;
        if let Err(e) = self.dataset.write_subset(records, None, Some(&tail)) {
            // Leave no unwritten records behind.
            if let Err(undo) = self.dataset.set_extent(&[old]) {
                tracing::warn!(error = %undo, "failed to shrink packet table after a failed append");
            }
            return Err(e);
        }
        tracing::trace!(id = self.id(), records = records.len(), "appended packets");
        Ok(())
    }

    pub fn append_one<T: H5Type + 'static>(&self, record: &T) -> Result<()> {
        self.append(std::slice::from_ref(record))
    }

    /// Reads `count` records starting at `start` into the front of `buf`.
    pub fn read_packets<T: H5Decode + 'static>(
        &self,
        start: u64,
        count: usize,
        buf: &mut [T],
    ) -> Result<()> {
        crate::transfer::check_capacity(count, buf.len())?;
        let total = self.num_packets()?;
        let end = start.saturating_add(count as u64);
        if end > total {
            return Err(fail(
                CLASS,
                format!("records {start}..{end} lie beyond the {total} in the table"),
            )
            .into());
        }
        if count == 0 {
            return Ok(());
        }
        let range = self.dataset.space()?;
        range.select_hyperslab(&[start], None, &[count as u64], None)?;
        self.dataset.read_subset(&mut buf[..count], None, Some(&range))
    }

    /// Reads the next `buf.len()` records at the cursor and advances it.
    pub fn next<T: H5Decode + 'static>(&self, buf: &mut [T]) -> Result<()> {
        let start = self.cursor.load(Ordering::Acquire);
        self.read_packets(start, buf.len(), buf)?;
        self.cursor.store(start + buf.len() as u64, Ordering::Release);
        Ok(())
    }

    pub fn num_packets(&self) -> Result<u64> {
        let (dims, _) = self.dataset.space()?.simple_extent_dims()?;
        Ok(dims.first().copied().unwrap_or(0))
    }

    /// Resets the cursor to the first record.
    pub fn create_index(&self) -> Result<()> {
        self.cursor.store(0, Ordering::Release);
        Ok(())
    }

    /// Moves the cursor to an existing record.
    pub fn set_index(&self, index: u64) -> Result<()> {
        let total = self.num_packets()?;
        if index >= total {
            return Err(fail(CLASS, format!("index {index} is past the {total} records")).into());
        }
        self.cursor.store(index, Ordering::Release);
        Ok(())
    }

    pub fn datatype(&self) -> Result<Datatype> {
        self.dataset.datatype()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{File, FileFlags};
    use crate::group::Location;

    #[test]
    fn plain_dataset_is_not_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("t.h5"), FileFlags::Truncate).unwrap();
        let dt = Datatype::of::<u8>().unwrap();
        let sp = Dataspace::create_simple(&[3], None).unwrap();
        file.create_dataset("fixed", &dt, &sp).unwrap();
        assert!(file.open_table("fixed").is_err());
        assert!(file.open_table("missing").is_err());
    }

    #[test]
    fn handles_keep_their_own_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("c.h5"), FileFlags::Truncate).unwrap();
        let a = file.create_table_for::<i16>("t", 2, None).unwrap();
        a.append(&[1i16, 2, 3]).unwrap();
        let b = file.open_table("t").unwrap();
        let mut one = [0i16; 1];
        a.next(&mut one).unwrap();
        a.next(&mut one).unwrap();
        assert_eq!(one, [2]);
        b.next(&mut one).unwrap();
        assert_eq!(one, [1]);
        assert!(a.set_index(3).is_err());
    }
}
