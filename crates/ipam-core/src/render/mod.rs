//! Artifact renderers
//!
//! Pure functions from an [`Inventory`](crate::inventory::Inventory) snapshot
//! to file contents. No I/O happens here; see [`crate::output`] and
//! [`crate::soa`] for the filesystem side.

pub mod dhcp;
pub mod forward;
pub mod radius;
pub mod reverse;
pub mod zone;

pub use dhcp::{DhcpConfig, render_dhcp};
pub use forward::render_forward;
pub use radius::{DEFAULT_REJECT_MESSAGE, render_users};
pub use reverse::{ReverseZone, delegation_blocks, render_reverse, reverse_pointer};
pub use zone::{ResourceLine, Zone, parse_zone};
