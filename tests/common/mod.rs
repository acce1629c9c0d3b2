//! In-memory registry used to drive the resolver in tests.
//!
//! Every vertex is looked up by name. Edges sleep through the cancellation
//! token for the configured latency and count how many resolutions are active
//! at any point in time.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use depwalk::{Cancellation, Edge, Vertex};

#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub edges: Vec<&'static str>,
    pub latency: Duration,
    pub fail: bool,
    pub panic: bool,
    /// Ignore the cancellation token while sleeping.
    pub stubborn: bool,
    /// Panic when the resolved vertex is asked for its edges.
    pub explode: bool,
    /// Identity reported by the resolved vertex instead of its own name.
    pub alias: Option<&'static str>,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<&'static str, Entry>,
    active: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, id: &'static str) -> &mut Entry {
        self.entries.entry(id).or_default()
    }

    pub fn node(mut self, id: &'static str, edges: &[&'static str]) -> Self {
        self.entry_mut(id).edges = edges.to_vec();
        for &edge in edges {
            self.entry_mut(edge);
        }
        self
    }

    pub fn latency(mut self, id: &'static str, millis: u64) -> Self {
        self.entry_mut(id).latency = Duration::from_millis(millis);
        self
    }

    pub fn failing(mut self, id: &'static str) -> Self {
        self.entry_mut(id).fail = true;
        self
    }

    pub fn panicking(mut self, id: &'static str) -> Self {
        self.entry_mut(id).panic = true;
        self
    }

    pub fn stubborn(mut self, id: &'static str) -> Self {
        self.entry_mut(id).stubborn = true;
        self
    }

    pub fn exploding(mut self, id: &'static str) -> Self {
        self.entry_mut(id).explode = true;
        self
    }

    pub fn reporting(mut self, id: &'static str, alias: &'static str) -> Self {
        self.entry_mut(id).alias = Some(alias);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn calls(&self, id: &str) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

pub fn vertex(registry: &Arc<Registry>, id: &'static str) -> Node {
    let entry = registry.entries.get(id).cloned().unwrap_or_default();
    let edges = entry
        .edges
        .into_iter()
        .map(|target| Ref {
            target,
            registry: registry.clone(),
        })
        .collect();

    Node {
        id: entry.alias.unwrap_or(id),
        edges,
        explode: entry.explode,
    }
}

#[derive(Debug)]
pub struct Node {
    pub id: &'static str,
    edges: Vec<Ref>,
    explode: bool,
}

#[derive(Debug, Clone)]
pub struct Ref {
    target: &'static str,
    registry: Arc<Registry>,
}

impl Vertex for Node {
    type Id = &'static str;
    type Edge = Ref;

    fn identity(&self) -> Self::Id {
        self.id
    }

    fn edges(&self) -> &[Self::Edge] {
        if self.explode {
            panic!("{} has a corrupt manifest", self.id);
        }
        &self.edges
    }
}

impl Edge<Node> for Ref {
    fn target(&self) -> &'static str {
        self.target
    }

    fn resolve(&self, cancel: &Cancellation) -> anyhow::Result<Node> {
        let registry = &self.registry;
        *registry.calls.lock().unwrap().entry(self.target).or_default() += 1;

        let Some(entry) = registry.entries.get(self.target) else {
            anyhow::bail!("no such vertex: {}", self.target);
        };

        let now = registry.active.fetch_add(1, Ordering::SeqCst) + 1;
        registry.peak.fetch_max(now, Ordering::SeqCst);

        let slept = if entry.stubborn {
            thread::sleep(entry.latency);
            Ok(())
        } else {
            cancel.sleep(entry.latency)
        };

        registry.active.fetch_sub(1, Ordering::SeqCst);
        registry.finished.fetch_add(1, Ordering::SeqCst);
        slept?;

        if entry.panic {
            panic!("{} exploded", self.target);
        }

        if entry.fail {
            anyhow::bail!("{} is not available", self.target);
        }

        Ok(vertex(registry, self.target))
    }
}
