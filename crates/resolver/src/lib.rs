#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency resolution for sprig
//!
//! This crate turns a root package request plus a recipe repository
//! snapshot into a concrete, reproducible installation graph. It expands
//! the request into a constraint graph, runs a finite-domain backtracking
//! search over versions and variants, and returns an immutable
//! [`ConcretizedGraph`] in topological order - or a structured failure.
//!
//! Each solve is a pure function of (request, repository snapshot):
//! solving the same input twice yields identical graphs. Independent
//! requests can be solved in parallel over a shared repository; see
//! [`Resolver::resolve_many`].

mod builder;
mod graph;
mod solve;

pub use graph::{ConcretizedGraph, ConcretizedSpec, ResolvedEdge};

use solve::Searcher;
use sprig_errors::{Error, Result};
use sprig_events::{Event, EventEmitter, EventSender};
use sprig_repo::Repository;
use sprig_types::Spec;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// A root request to concretize
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    /// The root spec: package name plus optional version range, variant
    /// pins, and toolchain
    pub root: Spec,
    cancel: Option<Arc<AtomicBool>>,
    events: Option<EventSender>,
}

impl ResolutionRequest {
    /// Create a request from a root spec
    #[must_use]
    pub fn new(root: Spec) -> Self {
        Self {
            root,
            cancel: None,
            events: None,
        }
    }

    /// Parse a request from spec syntax, e.g. `gaudi@:34.99 +optional`
    ///
    /// # Errors
    ///
    /// Returns `VersionError` if the spec string is malformed.
    pub fn parse(spec: &str) -> Result<Self> {
        Ok(Self::new(Spec::parse(spec).map_err(Error::Version)?))
    }

    /// Attach a cancellation token, checked at every solver choice point
    #[must_use]
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attach an event sender for solver progress
    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }
}

/// Dependency resolver over a read-only repository snapshot
#[derive(Clone)]
pub struct Resolver {
    repository: Arc<Repository>,
}

impl Resolver {
    /// Create a new resolver over a repository snapshot
    #[must_use]
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// The repository this resolver solves against
    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Concretize one root request
    ///
    /// # Errors
    ///
    /// Returns `UnknownPackage` for a request or edge naming an
    /// unregistered package, `CyclicDependency` for cyclic recipe input,
    /// `Unsatisfiable` (with the conflicting constraint set) when no
    /// assignment exists, and `Cancelled` if the token was triggered. No
    /// partial graph is returned on failure.
    pub async fn resolve(&self, request: ResolutionRequest) -> Result<ConcretizedGraph> {
        let root = request.root;
        let events = request.events;
        events.emit(Event::SolveStarted {
            root: root.to_string(),
        });

        let searcher = Searcher {
            repository: self.repository.as_ref(),
            compiler: root.compiler.clone(),
            cancel: request.cancel,
            events: events.clone(),
        };

        match searcher.solve(&root) {
            Ok(graph) => {
                events.emit(Event::SolveSucceeded {
                    root: root.to_string(),
                    nodes: graph.len(),
                });
                Ok(graph)
            }
            Err(error) => {
                events.emit(Event::SolveFailed {
                    root: root.to_string(),
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Concretize several independent root requests in parallel
    ///
    /// Each request is solved on its own worker task against the shared
    /// repository snapshot; results come back in request order. The first
    /// failure is returned, but every task runs to completion first.
    ///
    /// # Errors
    ///
    /// Returns the first failing request's error, or an internal error if
    /// a worker task panics.
    pub async fn resolve_many(
        &self,
        requests: Vec<ResolutionRequest>,
    ) -> Result<Vec<ConcretizedGraph>> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let resolver = self.clone();
                tokio::spawn(async move { resolver.resolve(request).await })
            })
            .collect();

        let joined = futures::future::try_join_all(handles)
            .await
            .map_err(|e| Error::internal(format!("solver task failed: {e}")))?;
        joined.into_iter().collect()
    }
}
