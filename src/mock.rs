//! Route bindings.
//!
//! A [`FetchMock`] is the per-route handle handed to a test author. Its
//! `will_*` methods register rules into the shared registry; its
//! introspection methods filter the shared call recorder down to the calls
//! this route saw.

use crate::error::FetchError;
use crate::headers::Headers;
use crate::matcher::{Method, ParsedUrl, PathPattern, Route};
use crate::outcome::{Body, Outcome, ResponseStub};
use crate::registry::{Rule, RuleRegistry};
use crate::response::ResponseMock;
use crate::shim::{call_method, FetchInit, FetchInput};
use crate::spy::{CallOutcome, CallRecorder};
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Per-route fluent handle. Every registration method returns the binding
/// itself so expectations can be chained.
pub struct FetchMock {
    registry: Arc<RuleRegistry>,
    recorder: CallRecorder,
    route: Route,
    /// Default headers for future resolve/fail registrations. Replacing the
    /// template never touches rules already registered.
    headers: Mutex<Headers>,
}

impl FetchMock {
    pub(crate) fn new(registry: Arc<RuleRegistry>, recorder: CallRecorder, route: Route) -> Self {
        Self {
            registry,
            recorder,
            route,
            headers: Mutex::new(Headers::new()),
        }
    }

    /// The route this binding registers rules for.
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn method(&self) -> Method {
        self.route.method
    }

    /// Replace the header template used for subsequently registered
    /// resolve/fail rules.
    pub fn with_headers(&self, headers: Headers) -> &Self {
        *self.headers.lock().unwrap_or_else(|e| e.into_inner()) = headers;
        self
    }

    /// Every matching call resolves with this body and a 200 status.
    pub fn will_resolve(&self, body: impl Into<Body>) -> &Self {
        self.register_resolve(false, Some(body.into()), 200)
    }

    /// Every matching call resolves with this body and status.
    pub fn will_resolve_with(&self, body: impl Into<Body>, status: u16) -> &Self {
        self.register_resolve(false, Some(body.into()), status)
    }

    /// The next matching call resolves with this body and a 200 status.
    pub fn will_resolve_once(&self, body: impl Into<Body>) -> &Self {
        self.register_resolve(true, Some(body.into()), 200)
    }

    /// The next matching call resolves with this body and status.
    pub fn will_resolve_once_with(&self, body: impl Into<Body>, status: u16) -> &Self {
        self.register_resolve(true, Some(body.into()), status)
    }

    /// Every matching call resolves with a failing 500 response carrying
    /// this body. This is a delivered response, not an error.
    pub fn will_fail(&self, body: impl Into<Body>) -> &Self {
        self.register_fail(false, Some(body.into()), 500, None)
    }

    /// Every matching call resolves with a failing response.
    pub fn will_fail_with(
        &self,
        body: impl Into<Body>,
        status: u16,
        status_text: Option<&str>,
    ) -> &Self {
        self.register_fail(false, Some(body.into()), status, status_text)
    }

    /// The next matching call resolves with a failing 500 response.
    pub fn will_fail_once(&self, body: impl Into<Body>) -> &Self {
        self.register_fail(true, Some(body.into()), 500, None)
    }

    /// The next matching call resolves with a failing response.
    pub fn will_fail_once_with(
        &self,
        body: impl Into<Body>,
        status: u16,
        status_text: Option<&str>,
    ) -> &Self {
        self.register_fail(true, Some(body.into()), status, status_text)
    }

    /// Every matching call returns this error. A plain string is wrapped
    /// into a generic thrown error.
    pub fn will_throw(&self, error: impl Into<FetchError>) -> &Self {
        self.register(false, Outcome::Throw(error.into()))
    }

    /// The next matching call returns this error.
    pub fn will_throw_once(&self, error: impl Into<FetchError>) -> &Self {
        self.register(true, Outcome::Throw(error.into()))
    }

    /// Every matching call invokes the callback with the parsed URL and the
    /// original arguments; the returned partial response is merged over the
    /// resolve defaults. Always standing.
    pub fn will_do<F, Fut>(&self, f: F) -> &Self
    where
        F: Fn(ParsedUrl, FetchInput, FetchInit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseStub> + Send + 'static,
    {
        let headers = self.template();
        self.register(false, Outcome::compute(f, headers))
    }

    /// Remove every rule, standing and once, registered for this route.
    pub fn clear(&self) -> &Self {
        self.registry.clear(self.route.method, &self.route.path);
        self
    }

    /// Recorded calls whose target matches this binding, in call order.
    pub fn calls(&self) -> Vec<(FetchInput, FetchInit)> {
        self.recorder
            .calls()
            .into_iter()
            .filter(|call| self.is_route(&call.input, &call.init))
            .map(|call| (call.input, call.init))
            .collect()
    }

    /// Recorded responses correlated to this binding's calls, in call
    /// order. Calls that produced an error carry no response and are
    /// skipped.
    pub fn responses(&self) -> Vec<ResponseMock> {
        self.recorder
            .calls()
            .into_iter()
            .filter(|call| self.is_route(&call.input, &call.init))
            .filter_map(|call| match call.outcome {
                CallOutcome::Response(response) => Some(response),
                CallOutcome::Error(_) => None,
            })
            .collect()
    }

    /// Body values of this binding's recorded responses.
    pub fn results(&self) -> Vec<Body> {
        self.responses()
            .iter()
            .map(|response| response.value().clone())
            .collect()
    }

    fn template(&self) -> Headers {
        self.headers.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn stub_headers(&self) -> Option<Headers> {
        let template = self.template();
        (!template.is_empty()).then_some(template)
    }

    fn register(&self, once: bool, outcome: Outcome) -> &Self {
        self.registry
            .register(Rule::new(self.route.clone(), once, outcome));
        self
    }

    fn register_resolve(&self, once: bool, body: Option<Body>, status: u16) -> &Self {
        let stub = ResponseStub {
            body,
            status: Some(status),
            status_text: None,
            headers: self.stub_headers(),
        };
        self.register(once, Outcome::Resolve(stub))
    }

    fn register_fail(
        &self,
        once: bool,
        body: Option<Body>,
        status: u16,
        status_text: Option<&str>,
    ) -> &Self {
        let stub = ResponseStub {
            body,
            status: Some(status),
            status_text: status_text.map(str::to_string),
            headers: self.stub_headers(),
        };
        self.register(once, Outcome::Fail(stub))
    }

    /// Whether a recorded call targeted this binding's route.
    fn is_route(&self, input: &FetchInput, init: &FetchInit) -> bool {
        self.route.matches(call_method(input, init), input.url())
    }
}

/// Create a binding from its parts, prefixing string paths with the base
/// url. Pattern paths are never prefixed.
pub(crate) fn bind(
    registry: Arc<RuleRegistry>,
    recorder: CallRecorder,
    method: Method,
    path: PathPattern,
    include_query: bool,
    base_url: &str,
) -> FetchMock {
    let path = match path {
        PathPattern::Exact(path) if !base_url.is_empty() => {
            PathPattern::Exact(format!("{base_url}{path}"))
        }
        other => other,
    };
    FetchMock::new(registry, recorder, Route::new(method, path, include_query))
}
