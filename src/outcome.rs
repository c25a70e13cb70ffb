//! Outcome values and response synthesis.
//!
//! An [`Outcome`] describes what a matched call should produce. Synthesis
//! merges the registered partial value over defaults and builds the concrete
//! [`ResponseMock`] handed back to the caller.

use crate::error::FetchError;
use crate::form::FormData;
use crate::headers::Headers;
use crate::matcher::ParsedUrl;
use crate::response::ResponseMock;
use crate::shim::{FetchInit, FetchInput};
use crate::statuses::status_text;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A binary blob carrying its own declared content type.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// A stubbed body value.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A JSON value.
    Json(Value),
    /// A plain string.
    Text(String),
    /// A raw byte buffer.
    Bytes(Vec<u8>),
    /// A blob with its own content type.
    Blob(Blob),
    /// A multipart form.
    Form(FormData),
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Blob> for Body {
    fn from(blob: Blob) -> Self {
        Body::Blob(blob)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::Form(form)
    }
}

/// Infer a Content-Type for a candidate body.
///
/// Strings that parse as JSON count as JSON; blobs carry their own type;
/// an absent body defaults to JSON, matching the default `{}` body.
pub fn guess_content_type(body: Option<&Body>) -> String {
    match body {
        Some(Body::Text(text)) => {
            if serde_json::from_str::<Value>(text).is_ok() {
                "application/json".to_string()
            } else {
                "text/plain".to_string()
            }
        }
        Some(Body::Json(_)) | None => "application/json".to_string(),
        Some(Body::Form(_)) => "multipart/form-data".to_string(),
        Some(Body::Bytes(_)) => "application/octet-stream".to_string(),
        Some(Body::Blob(blob)) => blob.content_type.clone(),
    }
}

/// A partial response description, merged over defaults at synthesis time.
///
/// Fields left unset fall back to `{ body: {}, status: 200 (or the fail
/// default), status_text: looked up from the status, headers:
/// [[content-type, application/json]] }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseStub {
    pub body: Option<Body>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub headers: Option<Headers>,
}

impl ResponseStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Boxed future returned by compute callbacks.
pub type ComputeFuture = Pin<Box<dyn Future<Output = ResponseStub> + Send>>;

/// A per-call callback producing a partial response from the parsed URL and
/// the original call arguments.
pub type ComputeFn = Arc<dyn Fn(ParsedUrl, FetchInput, FetchInit) -> ComputeFuture + Send + Sync>;

/// What a matched call should produce.
#[derive(Clone)]
pub enum Outcome {
    /// Synthesize a successful response (status defaults to 200).
    Resolve(ResponseStub),
    /// Synthesize a response with a failing status (defaults to 500).
    /// This is a normally delivered response, not an error.
    Fail(ResponseStub),
    /// The intercepted call returns this error.
    Throw(FetchError),
    /// Invoke a callback per call; its partial result is merged over the
    /// resolve defaults. The header template captured at registration is
    /// used when the callback result carries no headers of its own.
    Compute { f: ComputeFn, headers: Headers },
}

impl Outcome {
    /// Wrap a callback into a compute outcome.
    pub fn compute<F, Fut>(f: F, headers: Headers) -> Self
    where
        F: Fn(ParsedUrl, FetchInput, FetchInit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseStub> + Send + 'static,
    {
        Outcome::Compute {
            f: Arc::new(move |url, input, init| Box::pin(f(url, input, init))),
            headers,
        }
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Resolve(_) => "resolve",
            Outcome::Fail(_) => "fail",
            Outcome::Throw(_) => "throw",
            Outcome::Compute { .. } => "compute",
        }
    }

    /// Produce the concrete result for a matched call.
    ///
    /// This is the only suspension point of the pipeline: the compute
    /// callback's future is awaited here, after the registry lock has been
    /// released.
    pub async fn synthesize(
        self,
        url: &str,
        input: &FetchInput,
        init: &FetchInit,
    ) -> Result<ResponseMock, FetchError> {
        match self {
            Outcome::Throw(err) => Err(err),
            Outcome::Resolve(stub) => Ok(build_response(url, stub, 200)),
            Outcome::Fail(stub) => Ok(build_response(url, stub, 500)),
            Outcome::Compute { f, headers } => {
                let mut stub = f(ParsedUrl::parse(url), input.clone(), init.clone()).await;
                if stub.headers.is_none() && !headers.is_empty() {
                    stub.headers = Some(headers);
                }
                Ok(build_response(url, stub, 200))
            }
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Resolve(stub) => f.debug_tuple("Resolve").field(stub).finish(),
            Outcome::Fail(stub) => f.debug_tuple("Fail").field(stub).finish(),
            Outcome::Throw(err) => f.debug_tuple("Throw").field(err).finish(),
            Outcome::Compute { headers, .. } => f
                .debug_struct("Compute")
                .field("headers", headers)
                .finish_non_exhaustive(),
        }
    }
}

/// Merge a partial stub over the defaults into a concrete response.
fn build_response(url: &str, stub: ResponseStub, default_status: u16) -> ResponseMock {
    let status = stub.status.unwrap_or(default_status);
    let reason = stub
        .status_text
        .unwrap_or_else(|| status_text(status).to_string());
    let mut headers = stub.headers.unwrap_or_default();
    if !headers.has("content-type") {
        // Inferred type can never be an invalid header name.
        let _ = headers.set("content-type", guess_content_type(stub.body.as_ref()));
    }
    let body = stub
        .body
        .unwrap_or_else(|| Body::Json(Value::Object(Default::default())));

    ResponseMock::new(url, body, status, reason, headers)
}
