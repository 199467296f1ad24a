//! # Mock Adapters & Testing Guide
//!
//! [`MockScript`] is an in-memory expectation queue for building mock adapters. A mock
//! adapter records each call as a request value, hands it to the script, and returns
//! whatever response was scripted for it. That keeps facade tests deterministic: no
//! actors, no real stores, and failures that would be hard to provoke otherwise are one
//! `return_err` away.
//!
//! ## Mock adapters vs real stores
//!
//! | Feature | Mock adapter | Real store |
//! |---------|--------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (actor round trip) |
//! | **Call counts** | Recorded per request | Not observable |
//! | **Error injection** | `return_err` | Requires specific state |
//! | **Use case** | Routing, reconciliation, correlation binding | End-to-end migration flows |
//!
//! ## Example
//!
//! ```rust
//! use migration_framework::mock::MockScript;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Request { Get(String) }
//!
//! let script: MockScript<Request, Result<u32, String>> = MockScript::new();
//! script.expect(Request::Get("PL".into())).return_ok(48);
//! script.expect(Request::Get("XX".into())).return_err("unknown".into());
//!
//! assert_eq!(script.respond(Request::Get("PL".into())), Ok(48));
//! assert_eq!(script.respond(Request::Get("XX".into())), Err("unknown".to_string()));
//! assert_eq!(script.call_count(), 2);
//! script.verify();
//! ```
//!
//! Scripts are cheap to clone and every clone shares the same queue, so the test can
//! keep one handle while the adapter under test owns another.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

struct Expectation<Req, Resp> {
    request: Req,
    response: Resp,
}

/// An ordered list of expected requests and their scripted responses.
pub struct MockScript<Req, Resp> {
    expectations: Arc<Mutex<VecDeque<Expectation<Req, Resp>>>>,
    calls: Arc<Mutex<Vec<Req>>>,
}

impl<Req, Resp> Clone for MockScript<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            expectations: self.expectations.clone(),
            calls: self.calls.clone(),
        }
    }
}

impl<Req, Resp> Default for MockScript<Req, Resp> {
    fn default() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<Req: Debug + Clone + PartialEq, Resp> MockScript<Req, Resp> {
    /// Creates a script with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects `request` next.
    pub fn expect(&self, request: Req) -> ExpectationBuilder<Req, Resp> {
        ExpectationBuilder {
            request,
            expectations: self.expectations.clone(),
        }
    }

    /// Records `request` and returns the response scripted for it.
    ///
    /// # Panics
    /// When nothing is scripted or the next expectation is for a different request.
    pub fn respond(&self, request: Req) -> Resp {
        self.calls.lock().unwrap().push(request.clone());
        let expectation = self.expectations.lock().unwrap().pop_front();

        match expectation {
            Some(expectation) if expectation.request == request => expectation.response,
            Some(expectation) => panic!(
                "Unexpected request {:?}; expected {:?}",
                request, expectation.request
            ),
            None => panic!("Unexpected request {:?}; no expectations left", request),
        }
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<Req> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder for one expectation.
pub struct ExpectationBuilder<Req, Resp> {
    request: Req,
    expectations: Arc<Mutex<VecDeque<Expectation<Req, Resp>>>>,
}

impl<Req, Resp> ExpectationBuilder<Req, Resp> {
    /// Scripts the raw response.
    pub fn respond_with(self, response: Resp) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            request: self.request,
            response,
        });
    }
}

impl<Req, T, E> ExpectationBuilder<Req, Result<T, E>> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        self.respond_with(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: E) {
        self.respond_with(Err(error));
    }
}
