//! Synthesized response object.
//!
//! Implements the standard body-consumption contract: each body accessor may
//! run at most once per instance, and type-specific accessors check the
//! stored value's actual shape.

use crate::error::FetchError;
use crate::form::FormData;
use crate::headers::Headers;
use crate::outcome::{Blob, Body};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// The response handed back for a matched call.
#[derive(Debug)]
pub struct ResponseMock {
    url: String,
    body: Body,
    status: u16,
    status_text: String,
    headers: Headers,
    body_used: AtomicBool,
}

impl ResponseMock {
    pub(crate) fn new(
        url: impl Into<String>,
        body: Body,
        status: u16,
        status_text: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self {
            url: url.into(),
            body,
            status,
            status_text: status_text.into(),
            headers,
            body_used: AtomicBool::new(false),
        }
    }

    /// Mark the body consumed, failing if it already was.
    fn consume(&self) -> Result<(), FetchError> {
        if self.body_used.swap(true, Ordering::SeqCst) {
            return Err(FetchError::BodyAlreadyUsed);
        }
        Ok(())
    }

    /// Read the body as JSON. Text bodies are parsed; a body of any other
    /// shape is a type mismatch.
    pub fn json(&self) -> Result<Value, FetchError> {
        self.consume()?;
        match &self.body {
            Body::Json(value) => Ok(value.clone()),
            Body::Text(text) => serde_json::from_str(text)
                .map_err(|_| FetchError::BodyTypeMismatch { expected: "json" }),
            _ => Err(FetchError::BodyTypeMismatch { expected: "json" }),
        }
    }

    /// Read the body as text. JSON bodies are serialized.
    pub fn text(&self) -> Result<String, FetchError> {
        self.consume()?;
        match &self.body {
            Body::Text(text) => Ok(text.clone()),
            Body::Json(value) => serde_json::to_string(value)
                .map_err(|_| FetchError::BodyTypeMismatch { expected: "text" }),
            _ => Err(FetchError::BodyTypeMismatch { expected: "text" }),
        }
    }

    /// Read the body as a raw byte buffer.
    pub fn bytes(&self) -> Result<Vec<u8>, FetchError> {
        self.consume()?;
        match &self.body {
            Body::Bytes(bytes) => Ok(bytes.clone()),
            _ => Err(FetchError::BodyTypeMismatch { expected: "bytes" }),
        }
    }

    /// Read the body as a blob.
    pub fn blob(&self) -> Result<Blob, FetchError> {
        self.consume()?;
        match &self.body {
            Body::Blob(blob) => Ok(blob.clone()),
            _ => Err(FetchError::BodyTypeMismatch { expected: "a blob" }),
        }
    }

    /// Read the body as a multipart form.
    pub fn form_data(&self) -> Result<FormData, FetchError> {
        self.consume()?;
        match &self.body {
            Body::Form(form) => Ok(form.clone()),
            _ => Err(FetchError::BodyTypeMismatch {
                expected: "form data",
            }),
        }
    }

    /// Peek at the stored body without consuming it. Used by call
    /// introspection; test assertions should go through the accessors.
    pub fn value(&self) -> &Body {
        &self.body
    }

    /// Whether a body accessor has already run.
    pub fn body_used(&self) -> bool {
        self.body_used.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Whether the status is in the non-error range.
    pub fn ok(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Synthesized responses never model redirects.
    pub fn redirected(&self) -> bool {
        false
    }
}

impl Clone for ResponseMock {
    /// A clone starts with a fresh, unconsumed body.
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            body: self.body.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body_used: AtomicBool::new(false),
        }
    }
}
