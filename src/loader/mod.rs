// ACL loading

pub mod acl_loader;

pub use acl_loader::{resolve_rbac_acl, AclDocument, AclRule};
