use std::fmt::{Display, Write};
use std::hash::Hash;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use petgraph::Graph;

#[derive(Debug, Clone, Copy)]
pub struct Execution {
    pub start: Instant,
    pub duration: Duration,
}

/// Resolution diagnostics and performance metrics.
///
/// Returned as part of every [`Resolution`](crate::Resolution). The root never
/// goes through a worker, so it has no entry in `executions`.
#[derive(Debug)]
pub struct Diagnostics<Id> {
    /// Time spent in each edge resolution, in the order results arrived.
    pub executions: IndexMap<Id, Execution>,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
    /// Highest number of edges resolved at the same time.
    pub peak_in_flight: usize,
}

impl<Id> Default for Diagnostics<Id> {
    fn default() -> Self {
        Self {
            executions: IndexMap::new(),
            elapsed: Duration::ZERO,
            peak_in_flight: 0,
        }
    }
}

impl<Id> Diagnostics<Id>
where
    Id: Eq + Hash + Display,
{
    /// Sum of all edge resolution times, what a sequential walk would cost.
    pub fn busy_time(&self) -> Duration {
        self.executions.values().map(|exec| exec.duration).sum()
    }

    /// Renders the resolved graph as a Mermaid diagram, color-coded by how long
    /// each vertex took to resolve.
    ///
    /// * **Green**: Fast
    /// * **Yellow**: Moderate
    /// * **Red**: Slow
    /// * **Blue**: Root
    pub fn render_mermaid(&self, graph: &Graph<Id, ()>) -> String {
        let mut f = String::new();
        let _ = writeln!(f, "graph LR");

        let mut min_time = f64::MAX;
        let mut max_time = f64::MIN;

        for exec in self.executions.values() {
            let secs = exec.duration.as_secs_f64();
            min_time = min_time.min(secs);
            max_time = max_time.max(secs);
        }

        if min_time > max_time {
            min_time = 0.0;
            max_time = 0.0;
        }

        // Avoid divide by zero if every edge took the same time
        if (max_time - min_time).abs() < f64::EPSILON {
            max_time = min_time + 1.0;
        }

        for index in graph.node_indices() {
            let id = &graph[index];
            let name = id.to_string().replace('"', "\\\"");

            let (label_extra, color_code) = match self.executions.get(id) {
                Some(exec) => {
                    let t = (exec.duration.as_secs_f64() - min_time) / (max_time - min_time);
                    let (r, g, b) = gradient(t);
                    (
                        format!("{:.2?}", exec.duration),
                        format!("#{r:02X}{g:02X}{b:02X}"),
                    )
                }
                None => ("root".to_string(), "#ADD8E6".to_string()),
            };

            let _ = writeln!(f, "    {}[\"{}\\n{}\"]", index.index(), name, label_extra);
            let _ = writeln!(f, "    style {} fill:{}", index.index(), color_code);
        }

        for edge in graph.raw_edges() {
            let _ = writeln!(
                f,
                "    {} --> {}",
                edge.source().index(),
                edge.target().index()
            );
        }

        f
    }
}

/// Green (0.0) to yellow (0.5) to red (1.0).
fn gradient(t: f64) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);

    if t < 0.5 {
        let r = (255.0 * t * 2.0) as u8;
        (r, 255, 0)
    } else {
        let g = (255.0 * (1.0 - (t - 0.5) * 2.0)) as u8;
        (255, g, 0)
    }
}
