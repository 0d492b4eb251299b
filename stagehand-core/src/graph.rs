//! Workspace dependency graph and affected-set computation.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use indexmap::IndexSet;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{Error, Result};
use crate::manifest::Workspace;

/// The full set of workspaces plus the distinguished root.
///
/// Edges point from a workspace to the workspaces it depends on: A -> B
/// exists when B's name (or any of B's aliases) appears as a key in A's
/// dependencies, dev-dependencies, or peer-dependencies. The relation is
/// used only for reachability; cycles are tolerated.
#[derive(Debug)]
pub struct WorkspaceGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    alias_map: HashMap<String, String>,
    workspaces: HashMap<NodeIndex, Workspace>,
    order: Vec<String>,
    root: NodeIndex,
}

impl WorkspaceGraph {
    /// Builds the graph from discovered workspaces.
    ///
    /// # Errors
    ///
    /// Returns an error if no workspace is flagged as the repository root.
    /// Cycles are not an error: they are reported once as a warning and
    /// traversal handles them.
    pub fn new(mut workspaces: Vec<Workspace>) -> Result<Self> {
        workspaces.sort_by(|a, b| a.name().cmp(b.name()));

        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        let mut alias_map = HashMap::new();
        let mut workspace_map = HashMap::new();
        let mut order = Vec::with_capacity(workspaces.len());
        let mut root = None;

        for workspace in workspaces {
            let name = workspace.name().to_string();
            let node = graph.add_node(name.clone());
            for alias in workspace.aliases() {
                alias_map.entry(alias).or_insert_with(|| name.clone());
            }
            if workspace.is_root() {
                root = Some(node);
            }
            node_map.insert(name.clone(), node);
            order.push(name);
            workspace_map.insert(node, workspace);
        }

        let root = root.ok_or_else(|| {
            Error::Graph("workspace set has no root workspace".to_string())
        })?;

        for (&node, workspace) in &workspace_map {
            let dep_names = workspace
                .dependencies()
                .keys()
                .chain(workspace.dev_dependencies().keys())
                .chain(workspace.peer_dependencies().keys());
            for dep_name in dep_names {
                let target = node_map
                    .get(dep_name)
                    .or_else(|| alias_map.get(dep_name).and_then(|n| node_map.get(n)));
                // Names that resolve to no workspace are external packages.
                if let Some(&target) = target {
                    graph.update_edge(node, target, ());
                }
            }
        }

        if is_cyclic_directed(&graph) {
            tracing::warn!(
                "workspace dependency graph contains a cycle; affected-set \
                 traversal still terminates but no dependency order exists"
            );
        }

        Ok(Self {
            graph,
            node_map,
            alias_map,
            workspaces: workspace_map,
            order,
            root,
        })
    }

    /// The repository root workspace.
    pub fn root(&self) -> &Workspace {
        &self.workspaces[&self.root]
    }

    /// Looks up a workspace by name or alias.
    pub fn get(&self, name: &str) -> Option<&Workspace> {
        let node = self
            .node_map
            .get(name)
            .or_else(|| self.alias_map.get(name).and_then(|n| self.node_map.get(n)))?;
        self.workspaces.get(node)
    }

    /// Looks up a workspace by name or alias, erroring with the known set.
    pub fn require(&self, name: &str) -> Result<&Workspace> {
        self.get(name).ok_or_else(|| Error::WorkspaceNotFound {
            name: name.to_string(),
            available: self.order.join(", "),
        })
    }

    /// All workspaces in deterministic (name-sorted) order; the root is a
    /// member like any other.
    pub fn workspaces(&self) -> impl Iterator<Item = &Workspace> {
        self.order
            .iter()
            .filter_map(move |name| self.node_map.get(name))
            .filter_map(move |node| self.workspaces.get(node))
    }

    /// Workspace names in iteration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Direct dependency names of a workspace.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<String>> {
        let workspace = self.require(name)?;
        let node = self.node_map[workspace.name()];
        Ok(self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|idx| self.graph[idx].clone())
            .collect())
    }

    /// Computes the affected set: the smallest superset of `seed` closed
    /// under "anything that depends on a member is also a member".
    ///
    /// Breadth-first over consumers (incoming edges) with a visited set,
    /// so graphs containing cycles still terminate. Seed names that do not
    /// resolve to a workspace are ignored.
    pub fn affected<I, S>(&self, seed: I) -> IndexSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut affected = IndexSet::new();
        let mut queue = VecDeque::new();

        for name in seed {
            let node = self.node_map.get(name.as_ref()).or_else(|| {
                self.alias_map
                    .get(name.as_ref())
                    .and_then(|n| self.node_map.get(n))
            });
            if let Some(&node) = node {
                if affected.insert(self.graph[node].clone()) {
                    queue.push_back(node);
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            for consumer in self.graph.neighbors_directed(node, Direction::Incoming) {
                if affected.insert(self.graph[consumer].clone()) {
                    queue.push_back(consumer);
                }
            }
        }

        affected
    }

    /// The workspace owning a repository-relative file path: the one with
    /// the deepest location that is a prefix of the path. Files outside
    /// every member location belong to the root.
    pub fn workspace_for_file(&self, path: impl AsRef<Path>) -> Option<&Workspace> {
        let path = path.as_ref();
        let mut owner: Option<&Workspace> = None;
        for workspace in self.workspaces() {
            if workspace.is_root() || path.starts_with(workspace.location()) {
                let deeper = owner.map_or(true, |current| {
                    workspace.location().components().count()
                        > current.location().components().count()
                });
                if deeper {
                    owner = Some(workspace);
                }
            }
        }
        owner
    }

    /// Maps changed file paths to the names of their owning workspaces,
    /// de-duplicated, in first-seen order.
    pub fn workspaces_for_files<I, S>(&self, paths: I) -> IndexSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = IndexSet::new();
        for path in paths {
            if let Some(workspace) = self.workspace_for_file(path.as_ref()) {
                names.insert(workspace.name().to_string());
            }
        }
        names
    }
}
