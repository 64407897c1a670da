// Upstream access and request orchestration

pub mod bulk;
pub mod client;
pub mod gateway;

pub use bulk::{handle_request_with_role, reassemble};
pub use client::JolokiaClient;
pub use gateway::{proxy_jolokia_agent, proxy_with_rbac, proxy_without_rbac};
