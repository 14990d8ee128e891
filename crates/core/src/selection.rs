//! Option-selection validation for annotation submissions.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::types::DbId;

/// Validation view of one category: its display name, whether an empty
/// selection is acceptable, and the ids of its options.
#[derive(Debug, Clone)]
pub struct CategorySpec<'a> {
    pub name: &'a str,
    pub allows_empty: bool,
    pub option_ids: &'a [DbId],
}

/// Validate the selected option ids for one category.
///
/// A submission must pick at least one option unless the category allows
/// empty selections, must not repeat an option, and every id must belong
/// to the category.
pub fn check_option_selection(selected: &[DbId], category: &CategorySpec) -> Result<(), CoreError> {
    if selected.is_empty() {
        if category.allows_empty {
            return Ok(());
        }
        return Err(CoreError::Validation(format!(
            "Please select at least one option for category '{}'",
            category.name
        )));
    }

    let mut seen = HashSet::with_capacity(selected.len());
    for id in selected {
        if !seen.insert(*id) {
            return Err(CoreError::Validation(format!(
                "Option {id} selected more than once for category '{}'",
                category.name
            )));
        }
        if !category.option_ids.contains(id) {
            return Err(CoreError::Validation(format!(
                "Invalid option id {id} for category '{}'",
                category.name
            )));
        }
    }
    Ok(())
}

/// Reject an image-wide submission that leaves assigned categories
/// without a selection. `missing` holds the display names of categories
/// the annotator still owes work for.
pub fn check_no_missing_categories(missing: &[String]) -> Result<(), CoreError> {
    if missing.is_empty() {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "Please select an option for each category. Missing: {}",
        missing.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn lighting<'a>(option_ids: &'a [DbId]) -> CategorySpec<'a> {
        CategorySpec {
            name: "Lighting Variation",
            allows_empty: false,
            option_ids,
        }
    }

    #[test]
    fn test_valid_selection_passes() {
        let spec = lighting(&[1, 2, 3]);
        assert!(check_option_selection(&[2], &spec).is_ok());
        assert!(check_option_selection(&[1, 3], &spec).is_ok());
    }

    #[test]
    fn test_empty_selection_requires_allows_empty() {
        let spec = lighting(&[1, 2, 3]);
        assert_matches!(
            check_option_selection(&[], &spec),
            Err(CoreError::Validation(_))
        );

        let permissive = CategorySpec {
            allows_empty: true,
            ..spec
        };
        assert!(check_option_selection(&[], &permissive).is_ok());
    }

    #[test]
    fn test_foreign_option_rejected() {
        let spec = lighting(&[1, 2, 3]);
        let err = check_option_selection(&[2, 99], &spec).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("99"));
    }

    #[test]
    fn test_duplicate_option_rejected() {
        let spec = lighting(&[1, 2, 3]);
        assert_matches!(
            check_option_selection(&[2, 2], &spec),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn test_missing_categories_message_lists_names() {
        assert!(check_no_missing_categories(&[]).is_ok());
        let missing = vec!["Lighting Variation".to_string(), "Activity & Motion".to_string()];
        let err = check_no_missing_categories(&missing).unwrap_err();
        assert_matches!(
            err,
            CoreError::Validation(msg)
                if msg.contains("Lighting Variation, Activity & Motion")
        );
    }
}
