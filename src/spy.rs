//! Call recorder.
//!
//! Records every invocation of the intercepted primitive, arguments and
//! outcome, in call-initiation order. Route bindings filter this log for
//! their introspection surface.

use crate::error::FetchError;
use crate::response::ResponseMock;
use crate::shim::{FetchInit, FetchInput};
use std::sync::{Arc, Mutex};

/// What a recorded call produced.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// A response, synthesized or passed through from the real primitive.
    Response(ResponseMock),
    /// The call returned an error.
    Error(FetchError),
}

/// One recorded invocation of the intercepted primitive.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub input: FetchInput,
    pub init: FetchInit,
    pub outcome: CallOutcome,
}

/// Shared, insertion-ordered log of intercepted calls.
///
/// Clones share the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, input: FetchInput, init: FetchInit, outcome: CallOutcome) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                input,
                init,
                outcome,
            });
    }

    /// Snapshot of all recorded calls, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded calls.
    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
