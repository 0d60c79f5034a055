//! Per-type memoisation of built descriptors.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::datatype::TypeDescriptor;
use crate::error::Result;
use crate::h5type::H5Type;

type DescriptorMap = HashMap<TypeId, Arc<TypeDescriptor>>;

static CACHE: OnceLock<RwLock<DescriptorMap>> = OnceLock::new();

fn cache() -> &'static RwLock<DescriptorMap> {
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the descriptor for `T`, building it on first request.
/// Failed builds are not cached.
pub fn descriptor_of<T: H5Type + ?Sized + 'static>() -> Result<Arc<TypeDescriptor>> {
    let key = TypeId::of::<T>();
    if let Some(dt) = cache().read().get(&key) {
        return Ok(Arc::clone(dt));
    }
    let built = Arc::new(T::type_descriptor()?);
    let mut map = cache().write();
    let dt = map.entry(key).or_insert(built);
    Ok(Arc::clone(dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn returns_same_instance() {
        let a = descriptor_of::<[u32; 4]>().unwrap();
        let b = descriptor_of::<[u32; 4]>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a, <[u32; 4]>::type_descriptor().unwrap());
    }

    #[test]
    fn errors_are_not_cached() {
        assert_eq!(
            descriptor_of::<char>().unwrap_err(),
            Error::UnsupportedKind("char")
        );
        assert!(descriptor_of::<char>().is_err());
    }
}
