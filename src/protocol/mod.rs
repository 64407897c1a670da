// Jolokia wire protocol: request model and inbound translation

pub mod request;
pub mod translator;

pub use request::{JolokiaPayload, JolokiaRequest};
pub use translator::{parse_get_path, parse_post_body, translate};
