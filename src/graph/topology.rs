//! Layering of node-and-edge structures by repeated removal of nodes without
//! incoming edges (Kahn's algorithm).

use ahash::{AHashMap, AHashSet};

/// Result of [`layers`].
#[derive(Debug, Clone, Default)]
pub struct Layering<'a> {
    depth: AHashMap<&'a str, usize>,
    cyclic: Vec<&'a str>,
}

impl<'a> Layering<'a> {
    /// Longest-path distance from a source node. Nodes on or behind a cycle
    /// keep the depth reached before the cycle.
    pub fn depth(&self, id: &str) -> usize {
        self.depth.get(id).copied().unwrap_or(0)
    }

    /// Nodes that could not be ordered, in input order.
    pub fn cyclic(&self) -> &[&'a str] {
        &self.cyclic
    }

    pub fn is_acyclic(&self) -> bool {
        self.cyclic.is_empty()
    }
}

/// Layers `nodes` by the `(source, destination)` pairs in `edges`.
///
/// Repeated pairs count once. Pairs naming an unknown node are ignored.
pub fn layers<'a>(
    nodes: impl IntoIterator<Item = &'a str>,
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Layering<'a> {
    let nodes: Vec<&str> = nodes.into_iter().collect();
    let mut in_degree: AHashMap<&str, usize> = nodes.iter().map(|id| (*id, 0)).collect();
    let mut successors: AHashMap<&str, Vec<&str>> = AHashMap::new();
    let mut seen: AHashSet<(&str, &str)> = AHashSet::new();

    for (source, destination) in edges {
        if !in_degree.contains_key(source) || !seen.insert((source, destination)) {
            continue;
        }
        if let Some(degree) = in_degree.get_mut(destination) {
            *degree += 1;
            successors.entry(source).or_default().push(destination);
        }
    }

    let mut depth: AHashMap<&str, usize> = AHashMap::new();
    let mut ready: Vec<&str> = nodes
        .iter()
        .copied()
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();
    while let Some(id) = ready.pop() {
        in_degree.remove(id);
        let next_depth = depth.get(id).copied().unwrap_or(0) + 1;
        for next in successors.get(id).into_iter().flatten() {
            let entry = depth.entry(*next).or_insert(0);
            *entry = (*entry).max(next_depth);
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(*next);
                }
            }
        }
    }

    let cyclic = nodes
        .into_iter()
        .filter(|id| in_degree.contains_key(id))
        .collect();
    Layering { depth, cyclic }
}
