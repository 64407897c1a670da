// Shared helpers

pub mod ip_mask;
pub mod paths;

pub use ip_mask::{mask_ip_addresses, IP_ADDRESS_MASK};
pub use paths::join_paths;
