//! Build order computation for resolved units using topological sort
use crate::error::{ResolveError, ResolveResult};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A unit in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitNode {
    /// Unit id
    pub id: String,
    /// Unit dependencies (other unit ids)
    pub dependencies: Vec<String>,
}

impl UnitNode {
    /// Create a new unit node
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Build graph for unit ordering
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    /// Units by id
    units: BTreeMap<String, UnitNode>,
}

impl BuildGraph {
    /// Create a new empty build graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit to the graph
    pub fn add_unit(&mut self, unit: UnitNode) {
        self.units.insert(unit.id.clone(), unit);
    }

    /// Get a unit by id
    pub fn get_unit(&self, id: &str) -> Option<&UnitNode> {
        self.units.get(id)
    }

    /// Get unit count
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Check all dependencies exist
    pub fn validate(&self) -> ResolveResult<()> {
        for (id, unit) in &self.units {
            for dep in &unit.dependencies {
                if !self.units.contains_key(dep) {
                    return Err(ResolveError::unresolved(id, dep));
                }
            }
        }
        Ok(())
    }

    /// Compute topological build order using Kahn's algorithm
    ///
    /// Dependencies come before dependents; ties break by id.
    pub fn compute_build_order(&self) -> ResolveResult<Vec<String>> {
        // In-degree = number of unbuilt dependencies
        let mut in_degree: BTreeMap<&str, usize> = self
            .units
            .iter()
            .map(|(id, unit)| (id.as_str(), unit.dependencies.len()))
            .collect();

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut result = Vec::new();

        while let Some(id) = queue.pop_front() {
            result.push(id.to_string());

            for (dependent, unit) in &self.units {
                let edges = unit.dependencies.iter().filter(|d| *d == id).count();
                if edges == 0 {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= edges;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if result.len() != self.units.len() {
            return Err(ResolveError::CyclicDependency {
                path: self.find_cycle(),
            });
        }

        Ok(result)
    }

    /// Find units that can be built in parallel
    /// Returns groups where each group can be built concurrently
    pub fn parallel_build_groups(&self) -> ResolveResult<Vec<Vec<String>>> {
        let mut groups = Vec::new();
        let mut built = BTreeSet::new();

        loop {
            // Units whose dependencies are all built; BTreeMap order keeps groups sorted
            let group: Vec<String> = self
                .units
                .iter()
                .filter(|(id, _)| !built.contains(id.as_str()))
                .filter(|(_, unit)| unit.dependencies.iter().all(|d| built.contains(d.as_str())))
                .map(|(id, _)| id.clone())
                .collect();

            if group.is_empty() {
                break;
            }

            built.extend(group.iter().cloned());
            groups.push(group);
        }

        if built.len() != self.units.len() {
            return Err(ResolveError::CyclicDependency {
                path: self.find_cycle(),
            });
        }

        Ok(groups)
    }

    /// Find a cycle in the graph (for error reporting)
    fn find_cycle(&self) -> Vec<String> {
        let mut visited = BTreeSet::new();
        let mut on_stack = BTreeSet::new();
        let mut path = Vec::new();

        for id in self.units.keys() {
            if let Some(cycle) = self.dfs_find_cycle(id, &mut visited, &mut on_stack, &mut path) {
                return cycle;
            }
        }

        Vec::new()
    }

    /// DFS to find a cycle
    fn dfs_find_cycle(
        &self,
        id: &str,
        visited: &mut BTreeSet<String>,
        on_stack: &mut BTreeSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if on_stack.contains(id) {
            let start = path.iter().position(|u| u == id).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(id.to_string());
            return Some(cycle);
        }

        if visited.contains(id) {
            return None;
        }

        visited.insert(id.to_string());
        on_stack.insert(id.to_string());
        path.push(id.to_string());

        if let Some(unit) = self.units.get(id) {
            for dep in &unit.dependencies {
                if let Some(cycle) = self.dfs_find_cycle(dep, visited, on_stack, path) {
                    return Some(cycle);
                }
            }
        }

        on_stack.remove(id);
        path.pop();
        None
    }
}
