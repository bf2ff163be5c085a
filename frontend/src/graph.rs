//! Directed acyclic dependency graph
//!
//! Nodes declare the nodes they read. The graph is validated and
//! topologically ordered once at build time; afterwards it only answers
//! "what must be recomputed, in which order" for a set of changed nodes.

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} declared twice")]
    DuplicateNode(String),
    #[error("node {node} depends on undeclared node {dependency}")]
    UnknownDependency { node: String, dependency: String },
    #[error("dependency cycle through {0:?}")]
    Cycle(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct GraphBuilder<K> {
    nodes: IndexMap<K, Vec<K>>,
    duplicates: Vec<K>,
}

impl<K> Default for GraphBuilder<K> {
    fn default() -> Self {
        Self {
            nodes: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<K> GraphBuilder<K>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// A node with no dependencies, e.g. a user parameter.
    pub fn source(self, node: K) -> Self {
        self.node(node, &[])
    }

    pub fn node(mut self, node: K, dependencies: &[K]) -> Self {
        if self.nodes.insert(node, dependencies.to_vec()).is_some() {
            self.duplicates.push(node);
        }
        self
    }

    pub fn build(self) -> Result<DependencyGraph<K>, GraphError> {
        if let Some(node) = self.duplicates.first() {
            return Err(GraphError::DuplicateNode(format!("{node:?}")));
        }

        let mut dependents: IndexMap<K, Vec<K>> =
            self.nodes.keys().map(|&node| (node, Vec::new())).collect();
        for (&node, dependencies) in &self.nodes {
            for dependency in dependencies {
                match dependents.get_mut(dependency) {
                    Some(list) => list.push(node),
                    None => {
                        return Err(GraphError::UnknownDependency {
                            node: format!("{node:?}"),
                            dependency: format!("{dependency:?}"),
                        });
                    }
                }
            }
        }

        // Kahn's algorithm; ties keep declaration order
        let mut in_degree: IndexMap<K, usize> = self
            .nodes
            .iter()
            .map(|(&node, dependencies)| (node, dependencies.len()))
            .collect();
        let mut ready: VecDeque<K> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&node, _)| node)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = ready.pop_front() {
            order.push(node);
            for dependent in &dependents[&node] {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(*dependent);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = in_degree
                .iter()
                .filter(|(_, degree)| **degree > 0)
                .map(|(node, _)| format!("{node:?}"))
                .collect();
            return Err(GraphError::Cycle(stuck));
        }

        let rank = order
            .iter()
            .enumerate()
            .map(|(position, &node)| (node, position))
            .collect();

        Ok(DependencyGraph {
            dependencies: self.nodes,
            dependents,
            order,
            rank,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    dependencies: IndexMap<K, Vec<K>>,
    dependents: IndexMap<K, Vec<K>>,
    order: Vec<K>,
    rank: IndexMap<K, usize>,
}

impl<K> DependencyGraph<K>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn builder() -> GraphBuilder<K> {
        GraphBuilder::new()
    }

    pub fn topological_order(&self) -> &[K] {
        &self.order
    }

    pub fn dependencies(&self, node: K) -> &[K] {
        self.dependencies.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents(&self, node: K) -> &[K] {
        self.dependents.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, node: K) -> bool {
        self.dependencies.contains_key(&node)
    }

    /// Every node downstream of `changed`, in dependency order.
    ///
    /// The changed nodes themselves are not included.
    pub fn invalidated(&self, changed: &[K]) -> Vec<K> {
        let mut reached: IndexSet<K> = IndexSet::new();
        let mut frontier: VecDeque<K> = changed.iter().copied().collect();

        while let Some(node) = frontier.pop_front() {
            for &dependent in self.dependents(node) {
                if reached.insert(dependent) {
                    frontier.push_back(dependent);
                }
            }
        }

        let mut affected: Vec<K> = reached.into_iter().collect();
        affected.sort_by_key(|node| self.rank.get(node).copied().unwrap_or(usize::MAX));
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum N {
        Year,
        Variable,
        Colormap,
        Slice,
        Style,
        View,
    }

    fn layered() -> DependencyGraph<N> {
        DependencyGraph::builder()
            .node(N::View, &[N::Slice, N::Style])
            .node(N::Style, &[N::Slice, N::Colormap])
            .node(N::Slice, &[N::Year, N::Variable])
            .source(N::Year)
            .source(N::Variable)
            .source(N::Colormap)
            .build()
            .unwrap()
    }

    fn position(order: &[N], node: N) -> usize {
        order.iter().position(|&n| n == node).unwrap()
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let graph = layered();
        let order = graph.topological_order();
        assert_eq!(order.len(), 6);
        assert!(position(order, N::Year) < position(order, N::Slice));
        assert!(position(order, N::Slice) < position(order, N::Style));
        assert!(position(order, N::Style) < position(order, N::View));
    }

    #[test]
    fn invalidated_is_minimal_and_ordered() {
        let graph = layered();
        assert_eq!(graph.invalidated(&[N::Colormap]), vec![N::Style, N::View]);
        assert_eq!(graph.invalidated(&[N::Year]), vec![N::Slice, N::Style, N::View]);
        assert_eq!(
            graph.invalidated(&[N::Year, N::Colormap]),
            vec![N::Slice, N::Style, N::View]
        );
        assert!(graph.invalidated(&[N::View]).is_empty());
    }

    #[test]
    fn cycle_is_rejected() {
        let result = DependencyGraph::builder()
            .node(N::Slice, &[N::Style])
            .node(N::Style, &[N::Slice])
            .build();
        assert!(matches!(result, Err(GraphError::Cycle(nodes)) if nodes.len() == 2));
    }

    #[test]
    fn undeclared_dependency_is_rejected() {
        let result = DependencyGraph::builder().node(N::Slice, &[N::Year]).build();
        assert!(matches!(result, Err(GraphError::UnknownDependency { .. })));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let result = DependencyGraph::builder()
            .source(N::Year)
            .source(N::Year)
            .build();
        assert_eq!(result.unwrap_err(), GraphError::DuplicateNode("Year".to_string()));
    }

    #[test]
    fn dependents_are_recorded() {
        let graph = layered();
        assert_eq!(graph.dependents(N::Slice), &[N::View, N::Style]);
        assert_eq!(graph.dependencies(N::View), &[N::Slice, N::Style]);
        assert!(graph.contains(N::Colormap));
    }
}
