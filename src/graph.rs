//! The vertex and edge abstractions the engine resolves.
//!
//! The engine does not know what a vertex represents. A component version, an
//! OCI blob or a package manifest are all fine, as long as the type can tell
//! its own identity and list the edges leading out of it.
//!
//! ## Core abstractions
//!
//! * [`Vertex`]: an already resolved node. It exposes an [`Vertex::Id`] used
//!   to deduplicate work and an ordered, fixed list of outgoing edges.
//! * [`Edge`]: a lazy pointer to another vertex. It knows the identity of its
//!   target without doing any work, and resolving it may block for as long as
//!   it needs (network, disk), and may fail.
//!
//! ## Ownership
//!
//! Edges stay owned by the vertex that declared them. The engine only clones
//! an edge when it becomes the *discovering* edge of a vertex seen for the
//! first time, so edges should be cheap to clone (an `Arc` inside is the usual
//! shape).

use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::Cancellation;

/// A resolved node of the dependency graph.
pub trait Vertex: Sized + Send + 'static {
    /// Key used to address vertices and detect already seen work.
    type Id: Clone + Eq + Hash + Display + Debug + Send + 'static;

    /// The outgoing edge type of this vertex.
    type Edge: Edge<Self>;

    /// Must be cheap, pure and stable for the lifetime of the vertex.
    fn identity(&self) -> Self::Id;

    /// Outgoing edges, in declaration order. The list must not change once
    /// the vertex has been constructed.
    fn edges(&self) -> &[Self::Edge];
}

/// A lazy, fallible pointer to another [`Vertex`].
///
/// `resolve` runs on a worker thread, concurrently with other edges being
/// resolved, so implementations must not rely on the thread that built them.
pub trait Edge<V: Vertex>: Clone + Send + 'static {
    /// Identity of the target vertex, available without resolving.
    fn target(&self) -> V::Id;

    /// Resolve the target vertex.
    ///
    /// Any error is treated as permanent and aborts the whole run. When the
    /// run is aborted the `cancel` token is tripped; long running
    /// implementations should poll it (or sleep through
    /// [`Cancellation::sleep`]) and bail out early.
    fn resolve(&self, cancel: &Cancellation) -> anyhow::Result<V>;
}
