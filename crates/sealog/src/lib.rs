//! sealog is a server-side object class for an epoch-sealed, append-only
//! log partition: the storage-node half of a shared-log design in which an
//! external sequencer assigns positions and epochs, and each storage object
//! validates them under strict ordering guarantees.
//!
//! The class exposes seven methods over one object's keyed state: seal,
//! write, fill, read, max_position, get_projection, and set_projection.
//! Every invocation decodes a typed payload, optionally passes the epoch
//! guard, reads or mutates map entries, and reports a stable status code.
//! The host runtime (see the objclass crate) owns atomicity: a method's
//! reads and writes commit as one transaction, or not at all.

pub mod client;
pub mod codec;
pub mod entry;
pub mod keys;
pub mod ops;

mod epoch;
mod methods;

/// Class name under which the methods are registered.
pub const CLASS: &str = "sealog";

/// Protocol outcomes of the class. These are expected, non-fatal statuses:
/// they report the state of the log truthfully so the client or sequencer
/// can advance its projection, pick a different tail, or retry with a
/// correct epoch. Input and substrate failures surface as the negative
/// codes of [`objclass::MethodError`] instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    /// Request epoch is below the stored epoch.
    StaleEpoch = 1,
    /// Seal refused: epochs move strictly forward.
    InvalidEpoch = 2,
    /// Target position is already terminal.
    ReadOnly = 3,
    /// Read target is unset.
    NotWritten = 4,
    /// Read target was filled.
    Invalidated = 5,
}

impl From<Status> for i32 {
    fn from(status: Status) -> i32 {
        status as i32
    }
}

/// Register the class and its methods, with their capability descriptors,
/// against a host registry.
pub fn register(registry: &mut objclass::Registry) {
    registry
        .class(CLASS)
        .read_write("seal", methods::seal)
        .read_write("write", methods::write)
        .read_write("fill", methods::fill)
        .read_only("read", methods::read)
        .read_only("max_position", methods::max_position)
        .read_only("get_projection", methods::get_projection)
        .read_write("set_projection", methods::set_projection);
}
