mod gate;
mod runner;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::{Edge, Vertex};

pub(crate) use crate::engine::gate::Gate;
pub(crate) use crate::engine::runner::run;

pub use crate::engine::runner::{Diagnostics, Execution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Waiting,
    Running,
    Done,
}

/// Bookkeeping for a single identity.
pub(crate) struct Task<V: Vertex> {
    pub status: Status,
    /// The edge that discovered this vertex, `None` for the root.
    pub edge: Option<V::Edge>,
    /// Set once the task is done.
    pub vertex: Option<V>,
}

impl<V: Vertex> Task<V> {
    fn root() -> Self {
        Self {
            status: Status::Running,
            edge: None,
            vertex: None,
        }
    }

    fn waiting(edge: V::Edge) -> Self {
        Self {
            status: Status::Waiting,
            edge: Some(edge),
            vertex: None,
        }
    }
}

/// What a finished resolution attempt reports back.
pub(crate) enum Failure {
    Error(anyhow::Error),
    Panic(String),
}

/// A message on the results channel.
pub(crate) struct Outcome<V: Vertex> {
    pub id: V::Id,
    pub result: Result<V, Failure>,
    /// `None` for the synthetic root result, which never took a gate slot.
    pub execution: Option<Execution>,
}

impl<V: Vertex> Outcome<V> {
    pub(crate) fn seed(root: V) -> Self {
        Self {
            id: root.identity(),
            result: Ok(root),
            execution: None,
        }
    }
}

/// The task table of a single run, together with the FIFO of waiting
/// identities. Only ever touched by the coordinator.
pub(crate) struct TaskTable<V: Vertex> {
    tasks: IndexMap<V::Id, Task<V>>,
    waiting: VecDeque<V::Id>,
    /// Every edge seen while expanding vertices, including the ones pointing
    /// at already known identities.
    links: Vec<(V::Id, V::Id)>,
    done: usize,
}

impl<V: Vertex> TaskTable<V> {
    pub(crate) fn new(root: V::Id) -> Self {
        let mut tasks = IndexMap::new();
        tasks.insert(root, Task::root());

        Self {
            tasks,
            waiting: VecDeque::new(),
            links: Vec::new(),
            done: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn done(&self) -> usize {
        self.done
    }

    pub(crate) fn pending(&self) -> usize {
        self.tasks.len() - self.done
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.done == self.tasks.len()
    }

    pub(crate) fn status(&self, id: &V::Id) -> Option<Status> {
        self.tasks.get(id).map(|task| task.status)
    }

    /// Take the oldest waiting task, mark it running and hand out a copy of
    /// its discovering edge.
    pub(crate) fn dispatch_next(&mut self) -> Option<(V::Id, V::Edge)> {
        while let Some(id) = self.waiting.pop_front() {
            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };

            if task.status != Status::Waiting {
                continue;
            }

            let Some(edge) = task.edge.clone() else {
                continue;
            };

            task.status = Status::Running;
            return Some((id, edge));
        }

        None
    }

    /// Record a resolved vertex under `id` and expand its edges. Returns the
    /// number of newly discovered identities.
    pub(crate) fn complete(&mut self, id: &V::Id, vertex: V) -> usize {
        let mut discovered = 0;

        for edge in vertex.edges() {
            let target = edge.target();
            self.links.push((id.clone(), target.clone()));

            match self.tasks.entry(target) {
                Entry::Occupied(entry) => {
                    tracing::trace!(
                        from = %id,
                        to = %entry.key(),
                        status = ?entry.get().status,
                        "Target already known, skipping edge"
                    );
                }
                Entry::Vacant(entry) => {
                    self.waiting.push_back(entry.key().clone());
                    entry.insert(Task::waiting(edge.clone()));
                    discovered += 1;
                }
            }
        }

        if let Some(task) = self.tasks.get_mut(id) {
            if task.status != Status::Done {
                task.status = Status::Done;
                self.done += 1;
            }
            task.vertex = Some(vertex);
        }

        discovered
    }

    /// Consume the table of a finished run, yielding the vertices in
    /// discovery order together with all links seen.
    pub(crate) fn into_parts(self) -> (IndexMap<V::Id, V>, Vec<(V::Id, V::Id)>) {
        let vertices = self
            .tasks
            .into_iter()
            .filter_map(|(id, task)| task.vertex.map(|vertex| (id, vertex)))
            .collect();

        (vertices, self.links)
    }
}

/// Wall-clock bound of a run, if any.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    pub(crate) fn new(start: Instant, timeout: Option<Duration>) -> Self {
        Self(timeout.map(|timeout| start + timeout))
    }

    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cancellation;

    #[derive(Debug, Clone)]
    struct Link(&'static str);

    #[derive(Debug)]
    struct Node {
        id: &'static str,
        edges: Vec<Link>,
    }

    impl Node {
        fn new(id: &'static str, edges: &[&'static str]) -> Self {
            Self {
                id,
                edges: edges.iter().map(|&target| Link(target)).collect(),
            }
        }
    }

    impl Vertex for Node {
        type Id = &'static str;
        type Edge = Link;

        fn identity(&self) -> Self::Id {
            self.id
        }

        fn edges(&self) -> &[Self::Edge] {
            &self.edges
        }
    }

    impl Edge<Node> for Link {
        fn target(&self) -> &'static str {
            self.0
        }

        fn resolve(&self, _: &Cancellation) -> anyhow::Result<Node> {
            Ok(Node::new(self.0, &[]))
        }
    }

    #[test]
    fn test_root_is_running() {
        let table = TaskTable::<Node>::new("a");
        assert_eq!(table.status(&"a"), Some(Status::Running));
        assert_eq!(table.len(), 1);
        assert!(!table.is_complete());
    }

    #[test]
    fn test_expand_and_dispatch_fifo() {
        let mut table = TaskTable::<Node>::new("a");

        let discovered = table.complete(&"a", Node::new("a", &["b", "c"]));
        assert_eq!(discovered, 2);
        assert_eq!(table.done(), 1);
        assert_eq!(table.status(&"b"), Some(Status::Waiting));

        let (id, edge) = table.dispatch_next().unwrap();
        assert_eq!(id, "b");
        assert_eq!(edge.target(), "b");
        assert_eq!(table.status(&"b"), Some(Status::Running));

        let (id, _) = table.dispatch_next().unwrap();
        assert_eq!(id, "c");
        assert!(table.dispatch_next().is_none());
    }

    #[test]
    fn test_known_target_not_tracked_twice() {
        let mut table = TaskTable::<Node>::new("a");
        table.complete(&"a", Node::new("a", &["b", "c"]));
        table.dispatch_next();
        table.dispatch_next();

        assert_eq!(table.complete(&"b", Node::new("b", &["d"])), 1);
        assert_eq!(table.complete(&"c", Node::new("c", &["d", "a"])), 0);

        assert_eq!(table.len(), 4);
        assert_eq!(table.pending(), 1);

        let (vertices, links) = table.into_parts();
        assert_eq!(vertices.len(), 3);
        assert_eq!(links.len(), 5);
    }

    #[test]
    fn test_done_is_counted_once() {
        let mut table = TaskTable::<Node>::new("a");
        table.complete(&"a", Node::new("a", &[]));
        table.complete(&"a", Node::new("a", &[]));

        assert_eq!(table.done(), 1);
        assert!(table.is_complete());
    }
}
