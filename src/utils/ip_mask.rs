// IPv4 address redaction for response bodies

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Replacement for every redacted address
pub const IP_ADDRESS_MASK: &str = "***.***.***.***";

/// Word boundaries are ASCII-only: a letter such as `é` next to an address
/// does not shield it from masking
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u:\b)(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)(?-u:\b)",
    )
    .expect("IPv4 pattern is a valid regex")
});

/// Replace dotted-quad IPv4 literals with [`IP_ADDRESS_MASK`] when `enabled`
///
/// Works on the serialized text; bytes outside a match are left untouched.
pub fn mask_ip_addresses(body: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled || body.is_empty() {
        return Cow::Borrowed(body);
    }
    IPV4.replace_all(body, IP_ADDRESS_MASK)
}
