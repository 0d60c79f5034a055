//! Property-list classes.

use hdf5_metno_sys::h5p::{
    H5P_ATTRIBUTE_CREATE, H5P_DATASET_ACCESS, H5P_DATASET_CREATE, H5P_DATASET_XFER,
    H5P_FILE_ACCESS, H5P_FILE_CREATE, H5P_GROUP_CREATE,
};

use super::Hid;

/// Property-list classes (`H5P_*` class identifiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropListClass {
    FileCreate,
    FileAccess,
    DatasetCreate,
    DatasetAccess,
    DatasetXfer,
    AttributeCreate,
    GroupCreate,
}

impl PropListClass {
    pub(crate) const ALL: [PropListClass; 7] = [
        PropListClass::FileCreate,
        PropListClass::FileAccess,
        PropListClass::DatasetCreate,
        PropListClass::DatasetAccess,
        PropListClass::DatasetXfer,
        PropListClass::AttributeCreate,
        PropListClass::GroupCreate,
    ];

    /// The library's class identifier. Only valid once the library is open,
    /// so call it under [`sync`](super::sync).
    pub(crate) fn class_id(self) -> Hid {
        match self {
            PropListClass::FileCreate => *H5P_FILE_CREATE,
            PropListClass::FileAccess => *H5P_FILE_ACCESS,
            PropListClass::DatasetCreate => *H5P_DATASET_CREATE,
            PropListClass::DatasetAccess => *H5P_DATASET_ACCESS,
            PropListClass::DatasetXfer => *H5P_DATASET_XFER,
            PropListClass::AttributeCreate => *H5P_ATTRIBUTE_CREATE,
            PropListClass::GroupCreate => *H5P_GROUP_CREATE,
        }
    }
}
