mod diagnostics;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::Instant;

use indicatif::ProgressStyle;
use rayon::{Scope, ThreadPool};
use tracing::{Level, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::engine::{Deadline, Failure, Gate, Outcome, Status, TaskTable};
use crate::{Cancellation, Edge, ResolveError, Resolution, ResolverConfig, Vertex};

pub use diagnostics::{Diagnostics, Execution};

/// Resolve the transitive closure of `root` on the given pool.
///
/// The calling thread acts as the coordinator and is the only one to ever
/// touch the task table. The algorithm works as follows:
/// 1. The root is inserted as a running task and a synthetic successful
///    result carrying it is posted on the results channel.
/// 2. While the admission gate has free slots, the oldest waiting task is
///    marked running and its discovering edge is resolved on the pool.
/// 3. The coordinator blocks on the results channel. A resolved vertex is
///    marked done and each of its edges pointing at an identity that has no
///    task yet becomes a new waiting task.
/// 4. The run ends successfully once every task is done. The first error
///    trips the cancellation token, and the scope waits for the workers that
///    are still in flight before the error is returned.
pub(crate) fn run<V: Vertex>(
    pool: &ThreadPool,
    config: &ResolverConfig,
    root: V,
) -> Result<Resolution<V>, ResolveError> {
    let start = Instant::now();
    let deadline = Deadline::new(start, config.timeout);
    let root_id = root.identity();

    let span = tracing::span!(Level::INFO, "resolve", root = %root_id);
    let edge_style = if config.progress {
        span.pb_set_style(&crate::utils::get_style_run()?);
        span.pb_set_length(1);
        span.pb_set_message(&format!("Resolving {root_id}"));
        Some(crate::utils::get_style_edge()?)
    } else {
        None
    };
    let _enter = span.enter();

    let mut table = TaskTable::new(root_id.clone());
    let mut gate = Gate::new(config.workers);
    let cancel = Cancellation::new();

    let (sender, receiver) = channel::<Outcome<V>>();
    let seeded = sender.send(Outcome::seed(root));
    debug_assert!(seeded.is_ok(), "receiver dropped before the root was seeded");

    let mut coordinator = Coordinator {
        table: &mut table,
        gate: &mut gate,
        diagnostics: Diagnostics::default(),
        outstanding: 1,
        integrating: None,
        deadline,
        start,
        span: &span,
        edge_style,
        progress: config.progress,
    };

    let result = pool.in_place_scope(|scope| {
        // Vertex and edge code also runs on this thread, a panic there must
        // abort the run like any failed edge.
        let result = catch_unwind(AssertUnwindSafe(|| {
            coordinator.drive(scope, &sender, &receiver, &cancel)
        }))
        .unwrap_or_else(|panic| {
            let target = coordinator.integrating.as_ref().unwrap_or(&root_id);
            Err(ResolveError::Panicked {
                target: target.to_string(),
                message: panic_message(panic),
            })
        });

        if let Err(err) = &result {
            cancel.cancel();
            tracing::warn!(
                in_flight = coordinator.gate.in_flight(),
                "Aborting resolution: {err}"
            );
        }

        // Late workers find the channel closed and drop their results.
        drop(receiver);
        result
    });

    let mut diagnostics = coordinator.diagnostics;
    let peak = gate.peak();
    result?;

    diagnostics.elapsed = start.elapsed();
    diagnostics.peak_in_flight = peak;

    tracing::info!(
        vertices = table.len(),
        elapsed = ?diagnostics.elapsed,
        "Resolution complete"
    );

    let (vertices, links) = table.into_parts();
    Ok(Resolution::new(vertices, links, diagnostics))
}

/// Mutable state of the control loop for the duration of one run.
struct Coordinator<'a, V: Vertex> {
    table: &'a mut TaskTable<V>,
    gate: &'a mut Gate,
    diagnostics: Diagnostics<V::Id>,
    /// Results the coordinator still expects on the channel.
    outstanding: usize,
    /// Identity whose result is being integrated right now.
    integrating: Option<V::Id>,
    deadline: Deadline,
    start: Instant,
    span: &'a Span,
    edge_style: Option<ProgressStyle>,
    progress: bool,
}

impl<'a, V: Vertex> Coordinator<'a, V> {
    fn drive<'scope>(
        &mut self,
        scope: &Scope<'scope>,
        sender: &Sender<Outcome<V>>,
        receiver: &Receiver<Outcome<V>>,
        cancel: &Cancellation,
    ) -> Result<(), ResolveError> {
        loop {
            self.admit(scope, sender, cancel);

            if self.table.is_complete() {
                return Ok(());
            }

            if self.outstanding == 0 {
                return Err(ResolveError::Stalled {
                    pending: self.table.pending(),
                });
            }

            let outcome = self.next_outcome(receiver)?;
            self.integrate(outcome)?;
        }
    }

    /// Spawn workers for waiting tasks until the gate is full.
    fn admit<'scope>(
        &mut self,
        scope: &Scope<'scope>,
        sender: &Sender<Outcome<V>>,
        cancel: &Cancellation,
    ) {
        while self.gate.has_capacity() {
            let Some((id, edge)) = self.table.dispatch_next() else {
                break;
            };

            self.gate.try_acquire();
            self.outstanding += 1;

            tracing::debug!(id = %id, in_flight = self.gate.in_flight(), "Dispatching");

            let sender = sender.clone();
            let cancel = cancel.clone();
            let parent = self.span.clone();
            let style = self.edge_style.clone();

            scope.spawn(move |_| {
                let outcome = work::<V>(id, edge, &cancel, &parent, style.as_ref());
                // Nobody is listening once the run has been aborted.
                let _ = sender.send(outcome);
            });
        }
    }

    fn next_outcome(&self, receiver: &Receiver<Outcome<V>>) -> Result<Outcome<V>, ResolveError> {
        let timeout = || ResolveError::Timeout {
            elapsed: self.start.elapsed(),
            pending: self.table.pending(),
        };

        let stalled = || ResolveError::Stalled {
            pending: self.table.pending(),
        };

        match self.deadline.remaining() {
            Some(remaining) => match receiver.recv_timeout(remaining) {
                Ok(outcome) => Ok(outcome),
                Err(RecvTimeoutError::Timeout) => Err(timeout()),
                Err(RecvTimeoutError::Disconnected) => Err(stalled()),
            },
            None => receiver.recv().map_err(|_| stalled()),
        }
    }

    fn integrate(&mut self, outcome: Outcome<V>) -> Result<(), ResolveError> {
        let Outcome {
            id,
            result,
            execution,
        } = outcome;

        self.outstanding -= 1;
        self.integrating = Some(id.clone());
        debug_assert_eq!(self.table.status(&id), Some(Status::Running));

        if let Some(execution) = execution {
            self.gate.release();
            self.diagnostics.executions.insert(id.clone(), execution);
        }

        let vertex = match result {
            Ok(vertex) => vertex,
            Err(Failure::Error(source)) => {
                return Err(ResolveError::Edge {
                    target: id.to_string(),
                    source,
                });
            }
            Err(Failure::Panic(message)) => {
                return Err(ResolveError::Panicked {
                    target: id.to_string(),
                    message,
                });
            }
        };

        let identity = vertex.identity();
        if identity != id {
            tracing::warn!(
                expected = %id,
                actual = %identity,
                "Resolved vertex reports a different identity, keeping the edge target"
            );
        }

        let discovered = self.table.complete(&id, vertex);
        self.integrating = None;

        tracing::debug!(
            id = %id,
            discovered,
            done = self.table.done(),
            total = self.table.len(),
            "Resolved"
        );

        if self.progress {
            self.span.pb_set_length(self.table.len() as u64);
            self.span.pb_set_position(self.table.done() as u64);
        }

        Ok(())
    }
}

/// Resolve a single edge on a worker thread. Always produces an outcome, a
/// panic inside the edge is turned into a failure.
fn work<V: Vertex>(
    id: V::Id,
    edge: V::Edge,
    cancel: &Cancellation,
    parent: &Span,
    style: Option<&ProgressStyle>,
) -> Outcome<V> {
    let span = tracing::span!(parent: parent, Level::INFO, "resolve_edge", id = %id);
    if let Some(style) = style {
        span.pb_set_style(style);
        span.pb_set_message(&format!("Resolving {id}"));
    }
    let _enter = span.enter();

    let start = Instant::now();

    let result = match catch_unwind(AssertUnwindSafe(|| edge.resolve(cancel))) {
        Ok(Ok(vertex)) => Ok(vertex),
        Ok(Err(err)) => Err(Failure::Error(err)),
        Err(panic) => Err(Failure::Panic(panic_message(panic))),
    };

    let duration = start.elapsed();

    Outcome {
        id,
        result,
        execution: Some(Execution { start, duration }),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("unknown payload")
    }
}
