//! Chain grouping for client dispatch.
//!
//! A chain is a maximal linear run of client tasks from the runnable
//! slice: each link depends on the previous one and on nothing else in
//! the slice. A client that receives a whole chain resolves the internal
//! bindings locally and executes it end-to-end, so the server pays one
//! network trip instead of one per step.

use std::collections::HashSet;

use crate::domain::foundation::TaskId;

use super::TaskRecord;

/// Partitions the runnable client slice into dependency chains.
///
/// Chain starts are picked in insertion order. Extension picks the
/// earliest unprocessed dependent of the current link whose remaining
/// dependencies all lie outside the slice; insertion-order position wins,
/// id lexicographic order breaks ties.
pub fn group_chains(tasks: Vec<TaskRecord>) -> Vec<Vec<TaskRecord>> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let in_slice: HashSet<TaskId> = tasks.iter().map(|t| t.task_id().clone()).collect();
    let mut processed: HashSet<TaskId> = HashSet::new();
    let mut chains: Vec<Vec<usize>> = Vec::new();

    for (start, record) in tasks.iter().enumerate() {
        if processed.contains(record.task_id()) {
            continue;
        }

        let mut chain = vec![start];
        processed.insert(record.task_id().clone());
        let mut current_id = record.task_id().clone();

        loop {
            let next = tasks
                .iter()
                .enumerate()
                .filter(|(_, candidate)| {
                    !processed.contains(candidate.task_id())
                        && candidate.depends_on().contains(&current_id)
                        && candidate
                            .depends_on()
                            .iter()
                            .all(|dep| *dep == current_id || !in_slice.contains(dep))
                })
                .min_by(|(i, a), (j, b)| i.cmp(j).then_with(|| a.task_id().cmp(b.task_id())));

            match next {
                Some((index, candidate)) => {
                    processed.insert(candidate.task_id().clone());
                    current_id = candidate.task_id().clone();
                    chain.push(index);
                }
                None => break,
            }
        }

        chains.push(chain);
    }

    // Move the records out, preserving each chain's internal order.
    let mut slots: Vec<Option<TaskRecord>> = tasks.into_iter().map(Some).collect();
    chains
        .into_iter()
        .map(|chain| chain.into_iter().filter_map(|i| slots[i].take()).collect())
        .collect()
}
