//! Diffed list view over the session history.
//!
//! [`ListProjection`] remembers the last sequence it rendered and turns each
//! new sequence into an edit script, so a list view only touches the rows
//! that actually changed.
//!
//! # Edit script semantics
//!
//! Changes are meant to be applied in order to the previously rendered
//! sequence:
//!
//! 1. [`ListChange::Remove`] for every record that disappeared, highest index
//!    first so earlier removals never shift later ones.
//! 2. [`ListChange::Insert`] and [`ListChange::Move`] walking the new sequence
//!    front to back, each index referring to the sequence as it stands after
//!    the preceding changes. A move removes at `from`, then inserts at `to`.
//! 3. [`ListChange::Update`] for records whose identity is unchanged but whose
//!    contents differ, indexed into the final sequence.

use std::collections::HashMap;

use crate::session::SessionRecord;
use crate::types::SessionId;

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    Remove { index: usize, id: SessionId },
    Insert { index: usize, record: SessionRecord },
    Move { from: usize, to: usize, id: SessionId },
    Update { index: usize, record: SessionRecord },
}

/// The rendered side of a diffed list.
#[derive(Debug, Clone, Default)]
pub struct ListProjection {
    rendered: Vec<SessionRecord>,
}

impl ListProjection {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rendered: Vec::new(),
        }
    }

    /// The sequence as of the last [`submit`](Self::submit).
    #[must_use]
    pub fn rendered(&self) -> &[SessionRecord] {
        &self.rendered
    }

    /// Diffs `next` against the rendered sequence and adopts it.
    pub fn submit(&mut self, next: Vec<SessionRecord>) -> Vec<ListChange> {
        let changes = diff(&self.rendered, &next);
        self.rendered = next;
        changes
    }
}

/// Computes the edit script turning `old` into `new`.
///
/// Identity is decided by `id`, re-rendering by full equality. Retained
/// records on a longest run that kept its relative order stay put and only
/// the others are moved, so the script has the fewest moves possible.
/// Runs in `O(n log n)`.
#[must_use]
pub fn diff(old: &[SessionRecord], new: &[SessionRecord]) -> Vec<ListChange> {
    let new_index: HashMap<SessionId, usize> = new
        .iter()
        .enumerate()
        .map(|(index, record)| (record.id, index))
        .collect();
    let old_by_id: HashMap<SessionId, &SessionRecord> =
        old.iter().map(|record| (record.id, record)).collect();

    let mut changes = Vec::new();

    for (index, record) in old.iter().enumerate().rev() {
        if !new_index.contains_key(&record.id) {
            changes.push(ListChange::Remove {
                index,
                id: record.id,
            });
        }
    }

    // New positions of the retained records, in rendered order.
    let retained: Vec<usize> = old
        .iter()
        .filter_map(|record| new_index.get(&record.id).copied())
        .collect();
    let stable = longest_increasing(&retained);

    let mut unplaced = vec![None; new.len()];
    for (position, &index) in retained.iter().enumerate() {
        if !stable[position] {
            unplaced[index] = Some(position);
        }
    }

    let layout = SlotLayout::new(&retained, &stable, new.len());
    let mut occupied = Occupancy::new(layout.len);
    for (position, &index) in retained.iter().enumerate() {
        let slot = if stable[position] {
            layout.new_slot[index]
        } else {
            layout.old_slot[position]
        };
        occupied.insert(slot);
    }

    for (index, record) in new.iter().enumerate() {
        let target = layout.new_slot[index];
        if let Some(position) = unplaced[index] {
            let source = layout.old_slot[position];
            let from = occupied.before(source);
            occupied.remove(source);
            let to = occupied.before(target);
            occupied.insert(target);
            if from != to {
                changes.push(ListChange::Move {
                    from,
                    to,
                    id: record.id,
                });
            }
        } else if !old_by_id.contains_key(&record.id) {
            changes.push(ListChange::Insert {
                index: occupied.before(target),
                record: record.clone(),
            });
            occupied.insert(target);
        }
    }

    for (index, record) in new.iter().enumerate() {
        if let Some(previous) = old_by_id.get(&record.id) {
            if *previous != record {
                changes.push(ListChange::Update {
                    index,
                    record: record.clone(),
                });
            }
        }
    }

    changes
}

/// Marks one longest strictly increasing subsequence of `values`.
fn longest_increasing(values: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut parent = vec![None; values.len()];
    for (position, &value) in values.iter().enumerate() {
        let at = tails.partition_point(|&tail| values[tail] < value);
        if at > 0 {
            parent[position] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(position);
        } else {
            tails[at] = position;
        }
    }

    let mut keep = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        keep[position] = true;
        cursor = parent[position];
    }
    keep
}

/// A fixed ordering of every place a record can occupy while the script
/// runs.
///
/// Stable records split the list into segments. Within a segment, records
/// placed by the script come right after the segment's stable record (in new
/// order), followed by records still waiting to move (in rendered order).
/// Every intermediate list is a subsequence of this ordering, so a record's
/// index is the number of occupied slots before it.
struct SlotLayout {
    /// Final slot of each record in the new sequence.
    new_slot: Vec<usize>,
    /// Slot a moving record leaves, by rendered position.
    old_slot: Vec<usize>,
    len: usize,
}

impl SlotLayout {
    fn new(retained: &[usize], stable: &[bool], new_len: usize) -> Self {
        let segments = stable.iter().filter(|keep| **keep).count() + 1;
        let mut placed: Vec<Vec<usize>> = vec![Vec::new(); segments];
        let mut waiting: Vec<Vec<usize>> = vec![Vec::new(); segments];

        let mut is_stable = vec![false; new_len];
        let mut segment = 0;
        for (position, &index) in retained.iter().enumerate() {
            if stable[position] {
                segment += 1;
                is_stable[index] = true;
            } else {
                waiting[segment].push(position);
            }
        }

        segment = 0;
        for (index, &anchor) in is_stable.iter().enumerate() {
            if anchor {
                segment += 1;
            }
            placed[segment].push(index);
        }

        let mut new_slot = vec![0; new_len];
        let mut old_slot = vec![0; retained.len()];
        let mut len = 0;
        for (chain, gap) in placed.iter().zip(&waiting) {
            for &index in chain {
                new_slot[index] = len;
                len += 1;
            }
            for &position in gap {
                old_slot[position] = len;
                len += 1;
            }
        }

        Self {
            new_slot,
            old_slot,
            len,
        }
    }
}

/// Fenwick tree counting occupied slots.
struct Occupancy {
    tree: Vec<usize>,
}

impl Occupancy {
    fn new(len: usize) -> Self {
        Self {
            tree: vec![0; len + 1],
        }
    }

    fn insert(&mut self, slot: usize) {
        let mut node = slot + 1;
        while node < self.tree.len() {
            self.tree[node] += 1;
            node += node & node.wrapping_neg();
        }
    }

    /// `slot` must be occupied.
    fn remove(&mut self, slot: usize) {
        let mut node = slot + 1;
        while node < self.tree.len() {
            self.tree[node] -= 1;
            node += node & node.wrapping_neg();
        }
    }

    /// Number of occupied slots before `slot`.
    fn before(&self, slot: usize) -> usize {
        let mut node = slot;
        let mut count = 0;
        while node > 0 {
            count += self.tree[node];
            node &= node - 1;
        }
        count
    }
}

/// Applies an edit script to a sequence. Used to check scripts and by
/// renderers that keep their own copy of the rows.
pub fn apply(rows: &mut Vec<SessionRecord>, changes: &[ListChange]) {
    for change in changes {
        match change {
            ListChange::Remove { index, .. } => {
                rows.remove(*index);
            }
            ListChange::Insert { index, record } => rows.insert(*index, record.clone()),
            ListChange::Move { from, to, .. } => {
                let record = rows.remove(*from);
                rows.insert(*to, record);
            }
            ListChange::Update { index, record } => rows[*index] = record.clone(),
        }
    }
}
