use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Dependency, DependencyType, Task};
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Relation carried by a graph edge (predecessor -> dependent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLink {
    pub dependency_type: DependencyType,
    pub lag_time: i64,
}

/// Directed task graph. Nodes hold task ids in input order; edges point from
/// predecessor to dependent.
pub struct TaskGraph {
    pub graph: DiGraph<i32, EdgeLink>,
    pub id_to_index: HashMap<i32, NodeIndex>,
}

impl TaskGraph {
    pub fn build(tasks: &[Task], dependencies: &[Dependency]) -> Self {
        Self::build_filtered(tasks, dependencies, |_| true)
    }

    /// Build over the tasks accepted by `include`. Edges touching a task that
    /// is unknown or filtered out are dropped.
    pub fn build_filtered<F>(tasks: &[Task], dependencies: &[Dependency], include: F) -> Self
    where
        F: Fn(&Task) -> bool,
    {
        let mut graph: DiGraph<i32, EdgeLink> = DiGraph::new();
        let mut id_to_index: HashMap<i32, NodeIndex> = HashMap::new();

        for task in tasks.iter().filter(|task| include(task)) {
            if id_to_index.contains_key(&task.id) {
                tracing::warn!(task_id = task.id, "duplicate task id ignored in graph");
                continue;
            }
            let node_ix = graph.add_node(task.id);
            id_to_index.insert(task.id, node_ix);
        }

        for dependency in dependencies {
            match (
                id_to_index.get(&dependency.predecessor_id),
                id_to_index.get(&dependency.task_id),
            ) {
                (Some(&u), Some(&v)) => {
                    graph.add_edge(
                        u,
                        v,
                        EdgeLink {
                            dependency_type: dependency.dependency_type,
                            lag_time: dependency.lag_time,
                        },
                    );
                }
                _ => tracing::debug!(
                    task_id = dependency.task_id,
                    predecessor_id = dependency.predecessor_id,
                    "dependency skipped: endpoint not in graph"
                ),
            }
        }

        Self { graph, id_to_index }
    }

    pub fn contains(&self, task_id: i32) -> bool {
        self.id_to_index.contains_key(&task_id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Task ids in insertion order.
    pub fn task_ids(&self) -> Vec<i32> {
        self.graph.node_indices().map(|ix| self.graph[ix]).collect()
    }

    fn edges(&self, task_id: i32, direction: Direction) -> Vec<(i32, EdgeLink)> {
        let Some(&node_ix) = self.id_to_index.get(&task_id) else {
            return Vec::new();
        };
        let mut edges: Vec<(EdgeIndex, i32, EdgeLink)> = self
            .graph
            .edges_directed(node_ix, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                (edge.id(), self.graph[other], *edge.weight())
            })
            .collect();
        edges.sort_by_key(|(edge_ix, _, _)| *edge_ix);
        edges
            .into_iter()
            .map(|(_, other, link)| (other, link))
            .collect()
    }

    /// Predecessors of `task_id` with the relation to each, in edge order.
    pub fn incoming(&self, task_id: i32) -> Vec<(i32, EdgeLink)> {
        self.edges(task_id, Direction::Incoming)
    }

    /// Dependents of `task_id` with the relation to each, in edge order.
    pub fn outgoing(&self, task_id: i32) -> Vec<(i32, EdgeLink)> {
        self.edges(task_id, Direction::Outgoing)
    }

    /// Distinct predecessor ids, first edge first.
    pub fn predecessors(&self, task_id: i32) -> Vec<i32> {
        Self::distinct(self.incoming(task_id))
    }

    /// Distinct dependent ids, first edge first.
    pub fn successors(&self, task_id: i32) -> Vec<i32> {
        Self::distinct(self.outgoing(task_id))
    }

    fn distinct(edges: Vec<(i32, EdgeLink)>) -> Vec<i32> {
        let mut seen = HashSet::with_capacity(edges.len());
        edges
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Tasks without predecessors.
    pub fn roots(&self) -> Vec<i32> {
        self.graph
            .node_indices()
            .filter(|&ix| {
                self.graph
                    .neighbors_directed(ix, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|ix| self.graph[ix])
            .collect()
    }

    /// Tasks without successors.
    pub fn leaves(&self) -> Vec<i32> {
        self.graph
            .node_indices()
            .filter(|&ix| {
                self.graph
                    .neighbors_directed(ix, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|ix| self.graph[ix])
            .collect()
    }

    /// Every task downstream of `task_id`, excluding itself, in breadth-first order.
    pub fn reachable_from(&self, task_id: i32) -> Vec<i32> {
        let Some(&start) = self.id_to_index.get(&task_id) else {
            return Vec::new();
        };
        let mut seen: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut order = Vec::new();
        while let Some(node_ix) = queue.pop_front() {
            let task = self.graph[node_ix];
            for (next_id, _) in self.outgoing(task) {
                let next_ix = self.id_to_index[&next_id];
                if seen.insert(next_ix) {
                    order.push(next_id);
                    queue.push_back(next_ix);
                }
            }
        }
        order
    }

    /// Kahn's algorithm over the whole graph.
    pub fn topological_order(&self) -> ScheduleResult<Vec<i32>> {
        let all: Vec<NodeIndex> = self.graph.node_indices().collect();
        self.kahn(&all)
    }

    /// Kahn's algorithm restricted to `task_ids`; edges leaving the subset are ignored.
    pub fn topological_order_within(&self, task_ids: &[i32]) -> ScheduleResult<Vec<i32>> {
        let nodes: Vec<NodeIndex> = task_ids
            .iter()
            .filter_map(|id| self.id_to_index.get(id).copied())
            .collect();
        self.kahn(&nodes)
    }

    pub fn has_cycle(&self) -> bool {
        self.topological_order().is_err()
    }

    fn kahn(&self, nodes: &[NodeIndex]) -> ScheduleResult<Vec<i32>> {
        let members: HashSet<NodeIndex> = nodes.iter().copied().collect();
        let mut in_degree: HashMap<NodeIndex, usize> =
            nodes.iter().map(|&ix| (ix, 0usize)).collect();
        for edge in self.graph.edge_references() {
            if members.contains(&edge.source()) && members.contains(&edge.target()) {
                *in_degree.entry(edge.target()).or_default() += 1;
            }
        }

        let mut queue: VecDeque<NodeIndex> = nodes
            .iter()
            .copied()
            .filter(|ix| in_degree[ix] == 0)
            .collect();
        let mut order = Vec::with_capacity(nodes.len());

        while let Some(node_ix) = queue.pop_front() {
            let task_id = self.graph[node_ix];
            order.push(task_id);
            for (next_id, _) in self.outgoing(task_id) {
                let next_ix = self.id_to_index[&next_id];
                if let Some(degree) = in_degree.get_mut(&next_ix) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next_ix);
                    }
                }
            }
        }

        if order.len() < nodes.len() {
            let mut task_ids: Vec<i32> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(ix, _)| self.graph[ix])
                .collect();
            task_ids.sort_unstable();
            return Err(ScheduleError::CycleDetected { task_ids });
        }
        Ok(order)
    }
}
