// ACL policy engine

pub mod evaluator;
pub mod interceptor;
pub mod object_name;
pub mod pattern_matcher;

pub use evaluator::AclPolicyEngine;
