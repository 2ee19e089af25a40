//! Include/exclude selection shared by `compile` and `sync`.
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// The filters left nothing to operate on.
    #[error("the selection is empty; nothing to do")]
    EmptySelection,
    /// An included name has no counterpart; unlike excludes, this is a typo
    /// the user certainly wants to hear about.
    #[error("'{0}' is not available for selection")]
    UnknownInclude(String),
}

/// Applies the filters over the available names.
///
/// No includes means "everything". Excludes are applied afterwards; an
/// exclude that matches nothing only warns.
pub fn select(
    available: &BTreeSet<String>,
    include: &[String],
    exclude: &[String],
) -> Result<BTreeSet<String>, SelectionError> {
    let mut selected = if include.is_empty() {
        available.clone()
    } else {
        let mut picked = BTreeSet::new();
        for name in include {
            if !available.contains(name) {
                return Err(SelectionError::UnknownInclude(name.clone()));
            }
            picked.insert(name.clone());
        }
        picked
    };

    for name in exclude {
        if !selected.remove(name) {
            warn!(name = %name, "excluded name matches nothing");
        }
    }

    if selected.is_empty() {
        return Err(SelectionError::EmptySelection);
    }
    Ok(selected)
}
