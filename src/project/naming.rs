use crate::error::{Error, Result};
use crate::registry::ProjectKind;

const NAME_SUFFIX: &str = "airflow";
const MAX_NAME_LEN: usize = 100;

/// Canonical project name: `<lowercase name>-<kind>-airflow`.
///
/// The name must be non-empty and use ASCII letters, digits, `-` and `_`
/// only; it becomes a directory name and a Docker image name.
pub fn canonical_name(name: &str, kind: ProjectKind) -> Result<String> {
    let trimmed = name.trim();
    let invalid = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("name is empty"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 100 characters"));
    }
    if let Some(bad) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(invalid(&format!("character '{}' is not allowed", bad)));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("name must not start with '-'"));
    }

    Ok(format!(
        "{}-{}-{}",
        trimmed.to_ascii_lowercase(),
        kind.as_str(),
        NAME_SUFFIX
    ))
}

/// Kind encoded in a canonical project name, if it has one.
pub fn kind_from_canonical(name: &str) -> Option<ProjectKind> {
    let stem = name.strip_suffix(NAME_SUFFIX)?.strip_suffix('-')?;
    ProjectKind::ALL
        .into_iter()
        .find(|kind| {
            stem.strip_suffix(kind.as_str())
                .is_some_and(|rest| rest.len() > 1 && rest.ends_with('-'))
        })
}
