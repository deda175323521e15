//! Multi-source object search logic.
//!
//! Search order: loose -> packs (newest first) -> alternates.
//! This matches C git behavior where loose objects are preferred because
//! they may be newer (e.g., during a repack operation).

use git_hash::ObjectId;
use git_object::ObjectRead;
use git_pack::PackError;
use tracing::trace;

use crate::{ObjectDatabase, OdbError};

/// Find an object by OID, searching all backends in order.
pub(crate) fn find_object(
    odb: &ObjectDatabase,
    oid: &ObjectId,
) -> Result<Option<Box<dyn ObjectRead>>, OdbError> {
    if let Some(stream) = odb.loose.stream(oid)? {
        return Ok(Some(Box::new(stream)));
    }

    // REF_DELTA bases may live anywhere in this database.
    let resolver = |base: &ObjectId| -> Result<Option<Box<dyn ObjectRead>>, PackError> {
        find_object(odb, base).map_err(|e| PackError::BaseLookup {
            oid: *base,
            source: Box::new(e),
        })
    };
    for pack in odb.packs()? {
        if let Some(obj) = pack.find_object(oid, &resolver)? {
            trace!(%oid, pack = pack.name(), "found packed object");
            return Ok(Some(obj));
        }
    }

    for alt in &odb.alternates {
        if let Some(obj) = alt.find_object(oid)? {
            return Ok(Some(obj));
        }
    }

    Ok(None)
}

pub(crate) fn contains(odb: &ObjectDatabase, oid: &ObjectId) -> Result<bool, OdbError> {
    if odb.loose.contains(oid) {
        return Ok(true);
    }
    for pack in odb.packs()? {
        if pack.contains(oid)? {
            return Ok(true);
        }
    }
    for alt in &odb.alternates {
        if alt.contains(oid)? {
            return Ok(true);
        }
    }
    Ok(false)
}
