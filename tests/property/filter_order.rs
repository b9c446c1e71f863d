//! Property-based tests for filtered view derivation.
//!
//! Uses proptest to verify:
//! 1. The filtered view does not depend on the order the dimensions run in.
//! 2. The view is an order-preserving subsequence of the task list.
//! 3. Every task in the view passes every dimension; every task left out
//!    fails at least one.
//! 4. An unconstrained filter is the identity.

use std::collections::BTreeSet;

use proptest::prelude::*;
use taskdash::tasks::{FilterStep, apply_filters, apply_filters_in_order};
use taskdash_proto::{StatusFilter, Task, TaskFilters, UserId};

// --- Strategies ---

/// Tasks with unique ids, small user ids, and titles from a tiny alphabet
/// so that searches hit often.
fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((1i64..5, "[aAbBc ]{0,8}", any::<bool>()), 0..24).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (user, title, completed))| {
                Task::new(i64::try_from(i).unwrap_or(i64::MAX) + 1, user, title, completed)
            })
            .collect()
    })
}

fn arb_status() -> impl Strategy<Value = Option<StatusFilter>> {
    prop_oneof![
        Just(None),
        Just(Some(StatusFilter::All)),
        Just(Some(StatusFilter::Completed)),
        Just(Some(StatusFilter::Pending)),
    ]
}

fn arb_filters() -> impl Strategy<Value = TaskFilters> {
    (
        prop::option::of(prop::collection::btree_set(1i64..6, 0..4)),
        arb_status(),
        prop::option::of("[abAB]{0,3}"),
    )
        .prop_map(|(user_ids, status, search)| TaskFilters {
            user_ids: user_ids.map(|ids| ids.into_iter().map(UserId::new).collect::<BTreeSet<_>>()),
            status,
            search,
        })
}

fn arb_order() -> impl Strategy<Value = Vec<FilterStep>> {
    Just(FilterStep::DEFAULT_ORDER.to_vec()).prop_shuffle()
}

proptest! {
    #[test]
    fn order_of_dimensions_does_not_matter(
        tasks in arb_tasks(),
        filters in arb_filters(),
        order in arb_order(),
    ) {
        prop_assert_eq!(
            apply_filters(&tasks, &filters),
            apply_filters_in_order(&tasks, &filters, &order)
        );
    }

    #[test]
    fn view_is_ordered_subsequence(tasks in arb_tasks(), filters in arb_filters()) {
        let view = apply_filters(&tasks, &filters);
        let mut remaining = tasks.iter();
        for task in &view {
            prop_assert!(remaining.any(|t| t == task));
        }
    }

    #[test]
    fn membership_matches_every_dimension(tasks in arb_tasks(), filters in arb_filters()) {
        let view = apply_filters(&tasks, &filters);
        for task in &tasks {
            let passes = FilterStep::DEFAULT_ORDER
                .iter()
                .all(|step| step.matches(task, &filters));
            prop_assert_eq!(passes, view.contains(task));
        }
    }

    #[test]
    fn unconstrained_filter_is_identity(tasks in arb_tasks()) {
        prop_assert_eq!(apply_filters(&tasks, &TaskFilters::default()), tasks);
    }
}
