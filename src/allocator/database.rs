use std::collections::BTreeSet;

/// Postgres truncates identifiers past 63 bytes.
const MAX_IDENTIFIER_LEN: usize = 63;
/// Characters of the sanitized project name kept in the database name.
const BASE_LEN: usize = 60;
const SUFFIX: &str = "db";

/// Database name for a project: ASCII alphanumerics of the name, lowercased,
/// truncated to 60 characters, with a `db` suffix.
pub fn derive_database_name(project_name: &str) -> String {
    let base: String = project_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(BASE_LEN)
        .collect();
    format!("{}{}", base, SUFFIX)
}

/// Make `derived` unique against `used` by inserting a counter before the
/// suffix (`fooairflow2db`, `fooairflow3db`, ...), trimming the base so the
/// result stays a valid Postgres identifier.
pub fn unique_database_name(derived: &str, used: &BTreeSet<&str>) -> String {
    if !used.contains(derived) {
        return derived.to_string();
    }

    let base = derived.strip_suffix(SUFFIX).unwrap_or(derived);
    let mut counter: u32 = 2;
    loop {
        let tag = counter.to_string();
        let room = MAX_IDENTIFIER_LEN - SUFFIX.len() - tag.len();
        let trimmed: String = base.chars().take(room).collect();
        let candidate = format!("{}{}{}", trimmed, tag, SUFFIX);
        if !used.contains(candidate.as_str()) {
            tracing::debug!(derived, candidate, "database name collided, using counter");
            return candidate;
        }
        counter += 1;
    }
}
