//! Interception shim.
//!
//! Replaces the fetch primitive held in a named slot with a wrapper that
//! consults the rule registry and synthesizes outcomes, falling back to the
//! captured original when no rule matches.

use crate::error::FetchError;
use crate::headers::Headers;
use crate::matcher::Method;
use crate::outcome::Body;
use crate::registry::RuleRegistry;
use crate::response::ResponseMock;
use crate::spy::{CallOutcome, CallRecorder};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Slot name the convenience API installs into.
pub const DEFAULT_SLOT: &str = "fetch";

/// A request-shaped input carrying its own URL and method.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<Body>,
}

impl MockRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Headers::new(),
            body: None,
        }
    }
}

/// First argument of the intercepted primitive: a URL or a request value.
#[derive(Debug, Clone)]
pub enum FetchInput {
    Url(String),
    Request(MockRequest),
}

impl FetchInput {
    /// Target URL of the call.
    pub fn url(&self) -> &str {
        match self {
            FetchInput::Url(url) => url,
            FetchInput::Request(request) => &request.url,
        }
    }

    /// Method carried by the input itself, if any. A request value's own
    /// method wins over the init options.
    pub fn method(&self) -> Option<Method> {
        match self {
            FetchInput::Url(_) => None,
            FetchInput::Request(request) => Some(request.method),
        }
    }
}

impl From<&str> for FetchInput {
    fn from(url: &str) -> Self {
        FetchInput::Url(url.to_string())
    }
}

impl From<String> for FetchInput {
    fn from(url: String) -> Self {
        FetchInput::Url(url)
    }
}

impl From<MockRequest> for FetchInput {
    fn from(request: MockRequest) -> Self {
        FetchInput::Request(request)
    }
}

/// Second argument of the intercepted primitive: optional call options.
#[derive(Debug, Clone, Default)]
pub struct FetchInit {
    pub method: Option<Method>,
    pub headers: Option<Headers>,
    pub body: Option<Body>,
}

impl FetchInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Verb a call resolves to: the request value's own method, else the init
/// method, else GET.
pub fn call_method(input: &FetchInput, init: &FetchInit) -> Method {
    input.method().or(init.method).unwrap_or(Method::Get)
}

/// The intercepted primitive contract: `(input, init) -> awaitable response`.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, input: FetchInput, init: FetchInit)
        -> Result<ResponseMock, FetchError>;
}

/// Placeholder installed when a slot held nothing: every call fails loudly,
/// naming the attempted target.
struct NotDefinedFetch;

#[async_trait]
impl Fetch for NotDefinedFetch {
    async fn fetch(
        &self,
        input: FetchInput,
        _init: FetchInit,
    ) -> Result<ResponseMock, FetchError> {
        Err(FetchError::NotDefined {
            url: input.url().to_string(),
        })
    }
}

/// The wrapper installed in place of the real primitive.
struct InterceptedFetch {
    registry: Arc<RuleRegistry>,
    recorder: CallRecorder,
    original: Arc<dyn Fetch>,
}

#[async_trait]
impl Fetch for InterceptedFetch {
    async fn fetch(&self, input: FetchInput, init: FetchInit) -> Result<ResponseMock, FetchError> {
        let url = input.url().to_string();
        let method = call_method(&input, &init);

        // Rule matching and once-queue consumption happen here, before any
        // suspension point, so overlapping calls consume once rules in
        // initiation order.
        let outcome = self.registry.resolve(method, &url);

        let result = match outcome {
            Some(outcome) => outcome.synthesize(&url, &input, &init).await,
            None => {
                debug!(method = %method, url = %url, "no rule matched, falling back");
                self.original.fetch(input.clone(), init.clone()).await
            }
        };

        let recorded = match &result {
            Ok(response) => CallOutcome::Response(response.clone()),
            Err(err) => CallOutcome::Error(err.clone()),
        };
        self.recorder.record(input, init, recorded);

        result
    }
}

/// The caller-supplied target object: named slots holding fetch handlers.
///
/// Installation captures whatever the slot held so `uninstall` can put it
/// back; an empty slot is captured as the not-defined placeholder.
#[derive(Default)]
pub struct SlotTable {
    slots: Mutex<HashMap<String, Arc<dyn Fetch>>>,
    captured: Mutex<HashMap<String, Option<Arc<dyn Fetch>>>>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a handler into a slot, as a host would define its real primitive.
    pub fn set(&self, slot: &str, handler: Arc<dyn Fetch>) {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slot.to_string(), handler);
    }

    /// Current handler in a slot.
    pub fn get(&self, slot: &str) -> Option<Arc<dyn Fetch>> {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(slot)
            .cloned()
    }

    /// Replace the slot's handler with the interception wrapper, capturing
    /// the previous handler as the fallback for unmatched calls.
    pub fn install(&self, slot: &str, registry: Arc<RuleRegistry>, recorder: CallRecorder) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let previous = slots.get(slot).cloned();
        let original = previous
            .clone()
            .unwrap_or_else(|| Arc::new(NotDefinedFetch) as Arc<dyn Fetch>);

        self.captured
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slot.to_string(), previous);

        info!(slot, "installing fetch interception");
        slots.insert(
            slot.to_string(),
            Arc::new(InterceptedFetch {
                registry,
                recorder,
                original,
            }),
        );
    }

    /// Restore the handler captured at install time. A slot that held
    /// nothing before install goes back to holding nothing.
    pub fn uninstall(&self, slot: &str) {
        let captured = self
            .captured
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(slot);
        let Some(previous) = captured else {
            return;
        };

        info!(slot, "removing fetch interception");
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match previous {
            Some(handler) => {
                slots.insert(slot.to_string(), handler);
            }
            None => {
                slots.remove(slot);
            }
        }
    }

    /// Invoke the handler currently held in a slot. An empty slot fails
    /// with the not-defined diagnostic rather than a missing-handler panic.
    pub async fn fetch(
        &self,
        slot: &str,
        input: impl Into<FetchInput>,
        init: FetchInit,
    ) -> Result<ResponseMock, FetchError> {
        let input = input.into();
        let Some(handler) = self.get(slot) else {
            return Err(FetchError::NotDefined {
                url: input.url().to_string(),
            });
        };
        handler.fetch(input, init).await
    }
}

static GLOBAL_TARGET: Lazy<SlotTable> = Lazy::new(SlotTable::new);

/// Process-wide default target used by the convenience API.
pub fn global_target() -> &'static SlotTable {
    &GLOBAL_TARGET
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Route;
    use crate::outcome::{Outcome, ResponseStub};
    use crate::registry::Rule;
    use serde_json::json;

    fn installed() -> (SlotTable, Arc<RuleRegistry>, CallRecorder) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let target = SlotTable::new();
        let registry = Arc::new(RuleRegistry::new());
        let recorder = CallRecorder::new();
        target.install(DEFAULT_SLOT, registry.clone(), recorder.clone());
        (target, registry, recorder)
    }

    #[tokio::test]
    async fn test_match_synthesizes_a_response() {
        let (target, registry, recorder) = installed();
        registry.register(Rule::new(
            Route::new(Method::Get, "/apples", true),
            false,
            Outcome::Resolve(ResponseStub::new().body(json!({"apples": 33}))),
        ));

        let response = target
            .fetch(DEFAULT_SLOT, "/apples", FetchInit::new())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.json().unwrap(), json!({"apples": 33}));
        assert_eq!(recorder.len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_call_reaches_the_placeholder() {
        let (target, _registry, recorder) = installed();

        let err = target
            .fetch(DEFAULT_SLOT, "/missing", FetchInit::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::NotDefined {
                url: "/missing".to_string()
            }
        );
        // fallback failures are recorded too
        assert_eq!(recorder.len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_call_falls_back_to_the_original() {
        struct RealFetch;

        #[async_trait]
        impl Fetch for RealFetch {
            async fn fetch(
                &self,
                input: FetchInput,
                _init: FetchInit,
            ) -> Result<ResponseMock, FetchError> {
                Ok(ResponseMock::new(
                    input.url(),
                    Body::Text("from the network".into()),
                    200,
                    "OK",
                    Headers::new(),
                ))
            }
        }

        let target = SlotTable::new();
        target.set(DEFAULT_SLOT, Arc::new(RealFetch));
        let registry = Arc::new(RuleRegistry::new());
        target.install(DEFAULT_SLOT, registry, CallRecorder::new());

        let response = target
            .fetch(DEFAULT_SLOT, "/anything", FetchInit::new())
            .await
            .unwrap();
        assert_eq!(response.text().unwrap(), "from the network");
    }

    #[tokio::test]
    async fn test_uninstall_restores_the_original() {
        struct RealFetch;

        #[async_trait]
        impl Fetch for RealFetch {
            async fn fetch(
                &self,
                input: FetchInput,
                _init: FetchInit,
            ) -> Result<ResponseMock, FetchError> {
                Ok(ResponseMock::new(
                    input.url(),
                    Body::Text("real".into()),
                    200,
                    "OK",
                    Headers::new(),
                ))
            }
        }

        let target = SlotTable::new();
        target.set(DEFAULT_SLOT, Arc::new(RealFetch));
        let registry = Arc::new(RuleRegistry::new());
        registry.register(Rule::new(
            Route::new(Method::Get, "/apples", true),
            false,
            Outcome::Resolve(ResponseStub::new().body(json!(1))),
        ));
        target.install(DEFAULT_SLOT, registry, CallRecorder::new());

        let mocked = target
            .fetch(DEFAULT_SLOT, "/apples", FetchInit::new())
            .await
            .unwrap();
        assert_eq!(mocked.json().unwrap(), json!(1));

        target.uninstall(DEFAULT_SLOT);
        let real = target
            .fetch(DEFAULT_SLOT, "/apples", FetchInit::new())
            .await
            .unwrap();
        assert_eq!(real.text().unwrap(), "real");
    }

    #[tokio::test]
    async fn test_uninstall_of_empty_slot_removes_the_wrapper() {
        let (target, _registry, _recorder) = installed();
        target.uninstall(DEFAULT_SLOT);
        assert!(target.get(DEFAULT_SLOT).is_none());
    }

    #[test]
    fn test_call_method_precedence() {
        let request = FetchInput::Request(MockRequest::new(Method::Put, "/a"));
        let init = FetchInit::new().method(Method::Post);
        assert_eq!(call_method(&request, &init), Method::Put);

        let url = FetchInput::Url("/a".into());
        assert_eq!(call_method(&url, &init), Method::Post);
        assert_eq!(call_method(&url, &FetchInit::new()), Method::Get);
    }

    #[tokio::test]
    async fn test_once_consumption_is_ordered_by_initiation() {
        let (target, registry, _recorder) = installed();
        registry.register(Rule::new(
            Route::new(Method::Get, "/apples", true),
            true,
            Outcome::Resolve(ResponseStub::new().body(json!(1))),
        ));
        registry.register(Rule::new(
            Route::new(Method::Get, "/apples", true),
            true,
            Outcome::Resolve(ResponseStub::new().body(json!(2))),
        ));

        // initiate both calls before awaiting either
        let first = target.fetch(DEFAULT_SLOT, "/apples", FetchInit::new());
        let second = target.fetch(DEFAULT_SLOT, "/apples", FetchInit::new());
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().json().unwrap(), json!(1));
        assert_eq!(second.unwrap().json().unwrap(), json!(2));
    }
}
