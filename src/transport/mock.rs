//! # Mock Transport & Testing Guide
//!
//! [`MockTransport`] implements [`ResourceTransport`] from a queue of
//! expectations. Each call pops the next expectation, checks it is for the same
//! operation, and returns the canned response. Calls are also recorded so tests
//! can assert on what was sent.
//!
//! ## When to use Mocks vs the In-Memory Store
//!
//! | Feature | MockTransport | CatalogStore |
//! |---------|---------------|--------------|
//! | **Determinism** | Exact call sequence | Real state, scheduler dependent |
//! | **Error Injection** | Any response, any call | Next call of one operation |
//! | **Use Case** | Adapter and linker logic | End-to-end and concurrency |
//!
//! ## Example
//!
//! ```rust
//! use catalog_reconcile::adapter::ReconciliationAdapter;
//! use catalog_reconcile::model::{Attributes, ResourceKey, ResourceRef, ResourceType};
//! use catalog_reconcile::transport::mock::{sparse, MockTransport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = Arc::new(MockTransport::new());
//!     mock.expect_search("guava")
//!         .return_ok(vec![sparse(ResourceType::Component, "c1", "guava", "")]);
//!
//!     let adapter = ReconciliationAdapter::new(ResourceType::Component, mock.clone())
//!         .refetch_matches(false);
//!     let desired = ResourceRef::new(ResourceKey::component("guava"), Attributes::new());
//!     let resolved = adapter.get_or_create(desired).await.unwrap();
//!
//!     assert_eq!(resolved.persisted_id().unwrap().as_str(), "c1");
//!     mock.verify();
//! }
//! ```

use crate::error::TransportError;
use crate::identity::href_for;
use crate::model::{Attributes, Envelope, LinkSet, PersistedId, ResourceType};
use crate::transport::ResourceTransport;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Base URL of the self links built by [`sparse`] and [`full`].
pub const MOCK_BASE_URL: &str = "http://mock/api";

/// A sparse envelope as a search would return it.
pub fn sparse(kind: ResourceType, id: &str, name: &str, version: &str) -> Envelope {
    let mut attributes = Attributes::new();
    attributes.insert("name".into(), json!(name));
    if !version.is_empty() {
        attributes.insert("version".into(), json!(version));
    }
    Envelope::new(
        attributes,
        LinkSet::with_self(href_for(MOCK_BASE_URL, kind, &PersistedId::from(id))),
    )
}

/// A full envelope carrying `attributes` and a self link for `id`.
pub fn full(kind: ResourceType, id: &str, attributes: Attributes) -> Envelope {
    Envelope::new(
        attributes,
        LinkSet::with_self(href_for(MOCK_BASE_URL, kind, &PersistedId::from(id))),
    )
}

/// A call the mock received.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Search {
        kind: ResourceType,
        name: String,
    },
    List {
        kind: ResourceType,
    },
    Get {
        kind: ResourceType,
        id: PersistedId,
    },
    Create {
        kind: ResourceType,
        attributes: Attributes,
    },
    AppendLinks {
        kind: ResourceType,
        parent: PersistedId,
        hrefs: BTreeSet<String>,
    },
    Linked {
        kind: ResourceType,
        parent: PersistedId,
    },
}

enum Expectation {
    Search {
        name: String,
        response: Result<Vec<Envelope>, TransportError>,
    },
    List {
        kind: ResourceType,
        response: Result<Vec<Envelope>, TransportError>,
    },
    Get {
        id: PersistedId,
        response: Result<Option<Envelope>, TransportError>,
    },
    Create {
        response: Result<Envelope, TransportError>,
    },
    AppendLinks {
        parent: PersistedId,
        response: Result<(), TransportError>,
    },
    Linked {
        parent: PersistedId,
        response: Result<Vec<Envelope>, TransportError>,
    },
}

type Expectations = Arc<Mutex<VecDeque<Expectation>>>;

/// Transport that answers from a queue of expectations.
///
/// Panics on a call that does not match the next expectation, which fails the
/// test that made it.
#[derive(Default)]
pub struct MockTransport {
    expectations: Expectations,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a `search` for `name`.
    pub fn expect_search(&self, name: impl Into<String>) -> ExpectationBuilder<Vec<Envelope>> {
        let name = name.into();
        self.builder(move |response| Expectation::Search { name, response })
    }

    /// Expects a `list` of the `kind` collection.
    pub fn expect_list(&self, kind: ResourceType) -> ExpectationBuilder<Vec<Envelope>> {
        self.builder(move |response| Expectation::List { kind, response })
    }

    /// Expects a `get` of `id`.
    pub fn expect_get(&self, id: impl Into<PersistedId>) -> ExpectationBuilder<Option<Envelope>> {
        let id = id.into();
        self.builder(move |response| Expectation::Get { id, response })
    }

    /// Expects a `create`.
    pub fn expect_create(&self) -> ExpectationBuilder<Envelope> {
        self.builder(|response| Expectation::Create { response })
    }

    /// Expects an `append_links` on `parent`.
    pub fn expect_append_links(&self, parent: impl Into<PersistedId>) -> ExpectationBuilder<()> {
        let parent = parent.into();
        self.builder(move |response| Expectation::AppendLinks { parent, response })
    }

    /// Expects a `linked` query on `parent`.
    pub fn expect_linked(&self, parent: impl Into<PersistedId>) -> ExpectationBuilder<Vec<Envelope>> {
        let parent = parent.into();
        self.builder(move |response| Expectation::Linked { parent, response })
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `create` calls received so far.
    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RecordedCall::Create { .. }))
            .count()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }

    fn builder<T>(
        &self,
        build: impl FnOnce(Result<T, TransportError>) -> Expectation + Send + 'static,
    ) -> ExpectationBuilder<T> {
        ExpectationBuilder {
            build: Box::new(build),
            expectations: self.expectations.clone(),
        }
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(&self) -> Option<Expectation> {
        self.expectations.lock().unwrap().pop_front()
    }
}

/// Completes an expectation with the response the mock should return.
pub struct ExpectationBuilder<T> {
    build: Box<dyn FnOnce(Result<T, TransportError>) -> Expectation + Send>,
    expectations: Expectations,
}

impl<T> ExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        let expectation = (self.build)(Ok(value));
        self.expectations.lock().unwrap().push_back(expectation);
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: TransportError) {
        let expectation = (self.build)(Err(error));
        self.expectations.lock().unwrap().push_back(expectation);
    }
}

#[async_trait]
impl ResourceTransport for MockTransport {
    async fn search(
        &self,
        kind: ResourceType,
        name: &str,
    ) -> Result<Vec<Envelope>, TransportError> {
        self.record(RecordedCall::Search {
            kind,
            name: name.to_string(),
        });
        match self.next() {
            Some(Expectation::Search {
                name: expected,
                response,
            }) => {
                assert_eq!(expected, name, "search for unexpected name");
                response
            }
            _ => panic!("Unexpected search for {name:?} or expectation mismatch"),
        }
    }

    async fn list(&self, kind: ResourceType) -> Result<Vec<Envelope>, TransportError> {
        self.record(RecordedCall::List { kind });
        match self.next() {
            Some(Expectation::List {
                kind: expected,
                response,
            }) => {
                assert_eq!(expected, kind, "list of unexpected collection");
                response
            }
            _ => panic!("Unexpected list of {kind} or expectation mismatch"),
        }
    }

    async fn get(
        &self,
        kind: ResourceType,
        id: &PersistedId,
    ) -> Result<Option<Envelope>, TransportError> {
        self.record(RecordedCall::Get {
            kind,
            id: id.clone(),
        });
        match self.next() {
            Some(Expectation::Get {
                id: expected,
                response,
            }) => {
                assert_eq!(&expected, id, "get of unexpected id");
                response
            }
            _ => panic!("Unexpected get of {id} or expectation mismatch"),
        }
    }

    async fn create(
        &self,
        kind: ResourceType,
        attributes: &Attributes,
    ) -> Result<Envelope, TransportError> {
        self.record(RecordedCall::Create {
            kind,
            attributes: attributes.clone(),
        });
        match self.next() {
            Some(Expectation::Create { response }) => response,
            _ => panic!("Unexpected create or expectation mismatch"),
        }
    }

    async fn append_links(
        &self,
        kind: ResourceType,
        parent: &PersistedId,
        hrefs: &BTreeSet<String>,
    ) -> Result<(), TransportError> {
        self.record(RecordedCall::AppendLinks {
            kind,
            parent: parent.clone(),
            hrefs: hrefs.clone(),
        });
        match self.next() {
            Some(Expectation::AppendLinks {
                parent: expected,
                response,
            }) => {
                assert_eq!(&expected, parent, "append_links on unexpected parent");
                response
            }
            _ => panic!("Unexpected append_links on {parent} or expectation mismatch"),
        }
    }

    async fn linked(
        &self,
        kind: ResourceType,
        parent: &PersistedId,
    ) -> Result<Vec<Envelope>, TransportError> {
        self.record(RecordedCall::Linked {
            kind,
            parent: parent.clone(),
        });
        match self.next() {
            Some(Expectation::Linked {
                parent: expected,
                response,
            }) => {
                assert_eq!(&expected, parent, "linked on unexpected parent");
                response
            }
            _ => panic!("Unexpected linked on {parent} or expectation mismatch"),
        }
    }
}
