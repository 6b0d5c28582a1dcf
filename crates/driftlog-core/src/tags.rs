//! Tag-based eligibility of pending change-sets.

use std::collections::BTreeSet;

/// Decide whether a change-set with `tags` may be applied in a run that
/// requested `requested`.
///
/// Untagged change-sets are always eligible. Tagged ones need at least one
/// tag in common with the request, so a run requesting nothing only applies
/// untagged change-sets.
pub fn eligible(tags: &BTreeSet<String>, requested: &BTreeSet<String>) -> bool {
    tags.is_empty() || !tags.is_disjoint(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_untagged_always_eligible() {
        assert!(eligible(&set(&[]), &set(&[])));
        assert!(eligible(&set(&[]), &set(&["dev"])));
    }

    #[test]
    fn test_tagged_requires_intersection() {
        assert!(eligible(&set(&["dev"]), &set(&["dev"])));
        assert!(eligible(&set(&["dev", "seed"]), &set(&["seed", "prod"])));
        assert!(!eligible(&set(&["dev"]), &set(&["prod"])));
    }

    #[test]
    fn test_empty_request_excludes_tagged() {
        assert!(!eligible(&set(&["dev"]), &set(&[])));
    }
}
