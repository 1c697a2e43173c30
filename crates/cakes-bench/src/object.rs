//! Identities of the data and query objects the evaluation core reasons about.

/// The stable identifier of an object, unique within a single data set.
pub type ObjectId = u64;

/// A borrowed, identified payload.
///
/// The evaluation core never looks past `object_id`; the rest of an object's shape (vector,
/// string, graph, whatever a concrete distance space indexes) is opaque to this crate.
pub trait Identified {
    /// Returns this object's stable identifier.
    fn object_id(&self) -> ObjectId;
}
