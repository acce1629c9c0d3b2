use indexmap::IndexMap;
use petgraph::Graph;
use petgraph::graph::NodeIndex;

use crate::{Diagnostics, Vertex};

/// The outcome of a successful run: every vertex reachable from the root,
/// each resolved exactly once.
pub struct Resolution<V: Vertex> {
    vertices: IndexMap<V::Id, V>,
    graph: Graph<V::Id, ()>,
    diagnostics: Diagnostics<V::Id>,
}

impl<V: Vertex> Resolution<V> {
    pub(crate) fn new(
        vertices: IndexMap<V::Id, V>,
        links: Vec<(V::Id, V::Id)>,
        diagnostics: Diagnostics<V::Id>,
    ) -> Self {
        let mut graph = Graph::with_capacity(vertices.len(), links.len());
        let indices: IndexMap<V::Id, NodeIndex> = vertices
            .keys()
            .map(|id| (id.clone(), graph.add_node(id.clone())))
            .collect();

        for (source, target) in &links {
            if let (Some(&a), Some(&b)) = (indices.get(source), indices.get(target)) {
                graph.add_edge(a, b, ());
            }
        }

        Self {
            vertices,
            graph,
            diagnostics,
        }
    }

    /// Number of distinct vertices, the root included.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, id: &V::Id) -> bool {
        self.vertices.contains_key(id)
    }

    pub fn get(&self, id: &V::Id) -> Option<&V> {
        self.vertices.get(id)
    }

    /// The root vertex, always the first one discovered.
    pub fn root(&self) -> Option<&V> {
        self.vertices.first().map(|(_, vertex)| vertex)
    }

    /// Resolved vertices in discovery order, root first.
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.vertices.values()
    }

    pub fn identities(&self) -> impl Iterator<Item = &V::Id> {
        self.vertices.keys()
    }

    /// Every edge seen during the run, including edges into vertices that
    /// were already known when the edge was expanded. Node weights are
    /// identities, node indices follow discovery order.
    pub fn graph(&self) -> &Graph<V::Id, ()> {
        &self.graph
    }

    pub fn diagnostics(&self) -> &Diagnostics<V::Id> {
        &self.diagnostics
    }

    /// Mermaid diagram of the resolved graph, see [`Diagnostics::render_mermaid`].
    pub fn render_mermaid(&self) -> String {
        self.diagnostics.render_mermaid(&self.graph)
    }

    pub fn into_vertices(self) -> IndexMap<V::Id, V> {
        self.vertices
    }
}

impl<V> std::fmt::Debug for Resolution<V>
where
    V: Vertex + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolution")
            .field("vertices", &self.vertices)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}
