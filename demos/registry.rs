//! Resolves a simulated component registry where every lookup takes a while.
//!
//! ```sh
//! cargo run --example registry --features logging -- --workers 2
//! cargo run --example registry --features logging -- --fail ingress:1.4
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use console::style;
use depwalk::{Cancellation, Edge, Resolver, Vertex};

#[derive(Parser, Debug, Clone)]
struct Args {
    /// Maximum number of lookups in flight.
    #[clap(long, default_value_t = depwalk::DEFAULT_WORKERS)]
    workers: usize,

    /// Make the lookup of this component fail.
    #[clap(long)]
    fail: Option<String>,

    /// Print the resolved graph as a Mermaid diagram.
    #[clap(long)]
    mermaid: bool,
}

struct Entry {
    latency_ms: u64,
    references: &'static [&'static str],
}

struct Catalog {
    entries: HashMap<&'static str, Entry>,
    broken: Option<String>,
}

impl Catalog {
    fn new(broken: Option<String>) -> Self {
        let entries = [
            ("platform:2.0", 0, &["ingress:1.4", "monitoring:0.9", "dns:3.1"][..]),
            ("ingress:1.4", 300, &["cert-manager:1.12", "dns:3.1"][..]),
            ("monitoring:0.9", 800, &["storage:5.0"][..]),
            ("dns:3.1", 200, &[][..]),
            ("cert-manager:1.12", 400, &["dns:3.1"][..]),
            ("storage:5.0", 250, &[][..]),
        ]
        .into_iter()
        .map(|(name, latency_ms, references)| {
            (
                name,
                Entry {
                    latency_ms,
                    references,
                },
            )
        })
        .collect();

        Self { entries, broken }
    }

    fn component(self: &Arc<Self>, name: &str) -> anyhow::Result<Component> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("component {name} is not in the catalog"))?;

        let references = entry
            .references
            .iter()
            .map(|&target| Reference {
                target: target.to_string(),
                catalog: self.clone(),
            })
            .collect();

        Ok(Component {
            name: name.to_string(),
            references,
        })
    }
}

struct Component {
    name: String,
    references: Vec<Reference>,
}

#[derive(Clone)]
struct Reference {
    target: String,
    catalog: Arc<Catalog>,
}

impl Vertex for Component {
    type Id = String;
    type Edge = Reference;

    fn identity(&self) -> String {
        self.name.clone()
    }

    fn edges(&self) -> &[Reference] {
        &self.references
    }
}

impl Edge<Component> for Reference {
    fn target(&self) -> String {
        self.target.clone()
    }

    fn resolve(&self, cancel: &Cancellation) -> anyhow::Result<Component> {
        let latency = self
            .catalog
            .entries
            .get(self.target.as_str())
            .map_or(0, |entry| entry.latency_ms);

        cancel.sleep(Duration::from_millis(latency))?;

        if self.catalog.broken.as_deref() == Some(self.target.as_str()) {
            anyhow::bail!("registry returned 503 for {}", self.target);
        }

        self.catalog.component(&self.target)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    depwalk::init_logging()?;

    eprintln!(
        "Resolving {} with {} workers.",
        style("platform:2.0").red(),
        style(args.workers).blue()
    );

    let catalog = Arc::new(Catalog::new(args.fail));
    let root = catalog.component("platform:2.0")?;

    let resolver = Resolver::config().workers(args.workers).build()?;

    let start = Instant::now();
    let resolution = resolver.resolve(root)?;

    for component in resolution.vertices() {
        println!("{}", component.name);
    }

    let diagnostics = resolution.diagnostics();
    eprintln!(
        "Resolved {} components in {:.2?} ({:.2?} of lookups, peak {} in flight).",
        resolution.len(),
        start.elapsed(),
        diagnostics.busy_time(),
        diagnostics.peak_in_flight,
    );

    if args.mermaid {
        println!("{}", resolution.render_mermaid());
    }

    Ok(())
}
