//! Pure reviewer-selection logic.
//!
//! The engine works over candidate pools the service reads from the
//! directory store. It performs no I/O and raises no domain errors:
//! an empty selection is a valid outcome the caller interprets.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::store::User;

/// Fixed cap on reviewers assigned at PR creation.
pub const MAX_REVIEWERS: usize = 2;

/// Pick up to [`MAX_REVIEWERS`] reviewers uniformly at random, without
/// replacement, from the author's active teammates. The caller has already
/// excluded the author from `pool`. An empty pool yields an unreviewed PR.
pub fn select_initial_reviewers(pool: &[User]) -> Vec<String> {
    let mut rng = rand::thread_rng();
    pool.choose_multiple(&mut rng, MAX_REVIEWERS)
        .map(|user| user.id.clone())
        .collect()
}

/// Pick one replacement uniformly at random from `pool` minus `exclude`.
/// `exclude` must contain the PR author, every current reviewer, and the
/// outgoing reviewer. `None` means no eligible candidate remains.
pub fn select_replacement(pool: &[User], exclude: &HashSet<&str>) -> Option<String> {
    let eligible: Vec<&User> = pool
        .iter()
        .filter(|user| !exclude.contains(user.id.as_str()))
        .collect();

    let mut rng = rand::thread_rng();
    eligible.choose(&mut rng).map(|user| user.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            is_active: true,
            team_id: 1,
            team_name: None,
        }
    }

    // Selection is random, so the assertions below check cardinality and
    // membership rather than exact picks.

    #[test]
    fn test_initial_selection_caps_at_two() {
        let pool = vec![member("b"), member("c"), member("d"), member("e")];

        for _ in 0..50 {
            let picked = select_initial_reviewers(&pool);
            assert_eq!(picked.len(), 2);
            // Without replacement: no duplicates.
            assert_ne!(picked[0], picked[1]);
            for id in &picked {
                assert!(pool.iter().any(|u| &u.id == id));
            }
        }
    }

    #[test]
    fn test_initial_selection_small_pools() {
        let one = vec![member("b")];
        assert_eq!(select_initial_reviewers(&one), vec!["b".to_string()]);

        assert!(select_initial_reviewers(&[]).is_empty());
    }

    #[test]
    fn test_initial_selection_eventually_covers_pool() {
        let pool = vec![member("b"), member("c"), member("d")];
        let mut seen = HashSet::new();
        for _ in 0..200 {
            for id in select_initial_reviewers(&pool) {
                seen.insert(id);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_replacement_respects_exclusions() {
        let pool = vec![member("b"), member("c"), member("d")];
        let exclude: HashSet<&str> = ["a", "b", "c"].into_iter().collect();

        for _ in 0..50 {
            let picked = select_replacement(&pool, &exclude);
            assert_eq!(picked.as_deref(), Some("d"));
        }
    }

    #[test]
    fn test_replacement_empty_pool_is_none() {
        let pool = vec![member("b"), member("c")];
        let exclude: HashSet<&str> = ["b", "c"].into_iter().collect();

        assert!(select_replacement(&pool, &exclude).is_none());
        assert!(select_replacement(&[], &HashSet::new()).is_none());
    }
}
