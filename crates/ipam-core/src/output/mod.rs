// # Artifact Output
//
// Filesystem side of generation: advisory locks and locked writes.

pub mod lock;
pub mod writer;

pub use lock::ExclusiveLock;
pub use writer::write_locked;
