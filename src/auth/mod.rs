// Caller authorization against the cluster

pub mod access_review;
pub mod token;

pub use access_review::{authorize_admin_only, derive_role, AccessReviewClient};
