// URI path joining

/// Join URI parts with `/`, trimming slashes at the seams only
///
/// A leading slash on the first part and a trailing slash on the last part
/// are kept. Blank parts are skipped; a bare `/` contributes an empty segment.
pub fn join_paths(parts: &[&str]) -> String {
    let last = parts.len().saturating_sub(1);
    let mut joined: Vec<&str> = Vec::with_capacity(parts.len());

    for (index, part) in parts.iter().enumerate() {
        if part.trim().is_empty() {
            continue;
        }
        if *part == "/" {
            joined.push("");
            continue;
        }

        let mut part = *part;
        if index != 0 {
            part = part.strip_prefix('/').unwrap_or(part);
        }
        if index < last {
            part = part.strip_suffix('/').unwrap_or(part);
        }
        if !part.trim().is_empty() {
            joined.push(part);
        }
    }

    joined.join("/")
}
