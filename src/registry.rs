//! Metadata registry abstraction.
//!
//! The resolver only needs one capability from a registry: given a parsed
//! reference, return candidate works in the registry's own ranking order.

use crate::error::{ResolveError, Result};
use crate::types::{Candidate, Reference};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// Boxed future returned by [`Registry::query`].
pub type QueryFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Candidate>>> + Send + 'a>>;

/// A searchable metadata registry.
pub trait Registry: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Search for works matching `reference`, returning at most `rows`
    /// candidates in ranking order.
    fn query<'a>(&'a self, reference: &'a Reference, rows: u32) -> QueryFuture<'a>;
}

impl<T: Registry + ?Sized> Registry for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn query<'a>(&'a self, reference: &'a Reference, rows: u32) -> QueryFuture<'a> {
        (**self).query(reference, rows)
    }
}

/// A scripted response for [`MockRegistry`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return these candidates (truncated to the requested row count).
    Candidates(Vec<Candidate>),
    /// Fail the query as if the registry were unreachable.
    Unavailable(String),
}

/// Deterministic in-memory registry for tests.
///
/// Responses are scripted per ordinal; unscripted ordinals return no
/// candidates. A response can be made to fail a fixed number of times before
/// succeeding, to exercise retry-on-resume paths.
#[derive(Default)]
pub struct MockRegistry {
    responses: HashMap<u32, MockResponse>,
    failures: Mutex<HashMap<u32, usize>>,
    calls: Mutex<Vec<u32>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the candidates returned for `ordinal`.
    pub fn with_candidates(mut self, ordinal: u32, candidates: Vec<Candidate>) -> Self {
        self.responses
            .insert(ordinal, MockResponse::Candidates(candidates));
        self
    }

    /// Make every query for `ordinal` fail.
    pub fn with_unavailable(mut self, ordinal: u32, message: &str) -> Self {
        self.responses
            .insert(ordinal, MockResponse::Unavailable(message.to_string()));
        self
    }

    /// Make the first `times` queries for `ordinal` fail before the scripted
    /// response is returned.
    pub fn failing_first(self, ordinal: u32, times: usize) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(ordinal, times);
        }
        self
    }

    /// Ordinals queried so far, in call order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn respond(&self, reference: &Reference, rows: u32) -> Result<Vec<Candidate>> {
        let ordinal = reference.ordinal;
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ordinal);
        }

        if let Ok(mut failures) = self.failures.lock() {
            if let Some(remaining) = failures.get_mut(&ordinal) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ResolveError::Api {
                        status: 503,
                        message: "scripted failure".to_string(),
                    });
                }
            }
        }

        match self.responses.get(&ordinal) {
            Some(MockResponse::Candidates(candidates)) => {
                Ok(candidates.iter().take(rows as usize).cloned().collect())
            }
            Some(MockResponse::Unavailable(message)) => Err(ResolveError::Api {
                status: 503,
                message: message.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

impl Registry for MockRegistry {
    fn name(&self) -> &str {
        "mock"
    }

    fn query<'a>(&'a self, reference: &'a Reference, rows: u32) -> QueryFuture<'a> {
        Box::pin(async move { self.respond(reference, rows) })
    }
}
