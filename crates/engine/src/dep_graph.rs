//! Dependency graph for formula cells.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "A's formula reads B"  (B is a precedent of A)
//! ```
//!
//! The graph is rebuilt from raw cell text on every recalculation, so it is
//! always a pure function of the current grid — there is no incremental
//! maintenance to get out of sync. `reverse()` flips the edges, answering
//! "who reads me?" for affected-set computation.
//!
//! # Invariants
//!
//! 1. **No empty entries:** cells without references are not stored; lookups
//!    return the empty slice.
//! 2. **Deterministic traversal:** keys are kept in insertion order and
//!    adjacency lists in reference order, so every traversal is reproducible
//!    for identical input.
//! 3. **Dangling edges are legal:** an adjacency list may name cells outside
//!    the key set (for instance out-of-grid references); traversals treat
//!    them as leaves.

use std::collections::hash_map::Entry;
use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell_ref::CellRef;
use crate::formula::refs::extract_refs;
use crate::grid::Grid;

/// Directed reference graph over grid cells.
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    /// Direct references per cell, in formula token order. Duplicates are
    /// tolerated and not deduplicated.
    edges: FxHashMap<CellRef, Vec<CellRef>>,
    /// Keys in insertion order, for deterministic traversal.
    order: Vec<CellRef>,
}

/// Explicit frame for the iterative depth-first traversals. Recursion depth
/// would otherwise be bounded by the longest reference chain in the grid.
struct DfsFrame {
    cell: CellRef,
    next: usize,
}

impl DepGraph {
    /// Build the graph from the current raw text of every cell.
    ///
    /// Cells are scanned in row-major order; cost is proportional to the
    /// total raw text length.
    pub fn build(grid: &Grid) -> Self {
        let mut graph = DepGraph::default();
        for (cell, state) in grid.iter() {
            let refs = extract_refs(&state.raw);
            if !refs.is_empty() {
                graph.order.push(cell);
                graph.edges.insert(cell, refs);
            }
        }
        graph
    }

    /// The cells this cell directly references, in formula token order.
    pub fn neighbors(&self, cell: CellRef) -> &[CellRef] {
        self.edges.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of cells with at least one outgoing edge.
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Invert every edge: `reverse()[B]` lists the cells whose formulas
    /// read B. Key order derives from the forward build order, keeping
    /// reverse traversals deterministic too.
    pub fn reverse(&self) -> DepGraph {
        let mut reversed = DepGraph::default();
        for &node in &self.order {
            for &dep in self.neighbors(node) {
                reversed.add_edge(dep, node);
            }
        }
        reversed
    }

    fn add_edge(&mut self, from: CellRef, to: CellRef) {
        match self.edges.entry(from) {
            Entry::Occupied(mut entry) => entry.get_mut().push(to),
            Entry::Vacant(entry) => {
                entry.insert(vec![to]);
                self.order.push(from);
            }
        }
    }

    /// Find every cell that is on a reference cycle or reads into one.
    ///
    /// Depth-first traversal with an on-stack marker: a cell re-encountered
    /// while still on the active path closes a cycle. Membership then
    /// propagates to every ancestor on the path that reaches a flagged cell
    /// — deliberately over-approximate, because a cell that reads a cycle
    /// (even through intermediaries) has no well-defined value either.
    ///
    /// Self-loops and dangling edges terminate normally.
    pub fn find_cycle_members(&self) -> FxHashSet<CellRef> {
        let mut visited: FxHashSet<CellRef> = FxHashSet::default();
        let mut on_stack: FxHashSet<CellRef> = FxHashSet::default();
        let mut members: FxHashSet<CellRef> = FxHashSet::default();

        for &root in &self.order {
            if visited.contains(&root) {
                continue;
            }
            visited.insert(root);
            on_stack.insert(root);
            let mut stack = vec![DfsFrame { cell: root, next: 0 }];

            while let Some(frame) = stack.last_mut() {
                let cell = frame.cell;
                let deps = self.neighbors(cell);

                if frame.next < deps.len() {
                    let next = deps[frame.next];
                    frame.next += 1;

                    if on_stack.contains(&next) {
                        // Back edge: `next` closes a cycle, and reaching it
                        // taints the current cell as well.
                        members.insert(next);
                        members.insert(cell);
                    } else if visited.contains(&next) {
                        if members.contains(&next) {
                            members.insert(cell);
                        }
                    } else {
                        visited.insert(next);
                        on_stack.insert(next);
                        stack.push(DfsFrame { cell: next, next: 0 });
                    }
                } else {
                    // All references explored — pop and propagate membership
                    // to the parent still on the path.
                    stack.pop();
                    on_stack.remove(&cell);
                    if members.contains(&cell) {
                        if let Some(parent) = stack.last() {
                            members.insert(parent.cell);
                        }
                    }
                }
            }
        }

        members
    }

    /// All cells reachable from `start` by following edges, `start` first,
    /// in breadth-first discovery order. Each cell appears exactly once.
    ///
    /// Called on the reverse graph this yields the set of cells whose
    /// values can change when `start` changes.
    pub fn reachable_from(&self, start: CellRef) -> Vec<CellRef> {
        let mut seen: FxHashSet<CellRef> = FxHashSet::default();
        seen.insert(start);
        let mut result = vec![start];
        let mut queue: VecDeque<CellRef> = VecDeque::new();
        queue.push_back(start);

        while let Some(cell) = queue.pop_front() {
            for &next in self.neighbors(cell) {
                if seen.insert(next) {
                    result.push(next);
                    queue.push_back(next);
                }
            }
        }

        result
    }

    /// Order `subset` so that every reference of a cell that is itself in
    /// `subset` appears before the cell.
    ///
    /// Depth-first post-order: references are visited first, the cell is
    /// emitted on unwind. Cells outside `subset` are traversed through but
    /// not emitted. Ties are deterministic: roots in `subset` order,
    /// references in token order.
    pub fn topo_order(&self, subset: &[CellRef]) -> Vec<CellRef> {
        let in_subset: FxHashSet<CellRef> = subset.iter().copied().collect();
        let mut visited: FxHashSet<CellRef> = FxHashSet::default();
        let mut result = Vec::with_capacity(subset.len());

        for &root in subset {
            if visited.contains(&root) {
                continue;
            }
            visited.insert(root);
            let mut stack = vec![DfsFrame { cell: root, next: 0 }];

            while let Some(frame) = stack.last_mut() {
                let cell = frame.cell;
                let deps = self.neighbors(cell);

                if frame.next < deps.len() {
                    let next = deps[frame.next];
                    frame.next += 1;
                    if !visited.contains(&next) {
                        visited.insert(next);
                        stack.push(DfsFrame { cell: next, next: 0 });
                    }
                } else {
                    stack.pop();
                    if in_subset.contains(&cell) {
                        result.push(cell);
                    }
                }
            }
        }

        result
    }
}
