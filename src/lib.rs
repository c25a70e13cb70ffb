//! mock-fetch
//!
//! Intercepts a fetch-shaped network primitive during tests and resolves
//! calls from registered route rules instead of the network. Unmatched
//! calls fall back to the real primitive.
//!
//! # Features
//!
//! - **Route Rules**: match calls by method and exact path or regex pattern
//! - **Canned Outcomes**: resolve, fail with a bad status, or throw
//! - **Once Rules**: single-use expectations consumed in FIFO order
//! - **Dynamic Outcomes**: per-call callbacks keyed off the parsed URL
//! - **Call Inspection**: per-route views over recorded calls and responses
//! - **Fixtures**: declarative YAML stub files
//!
//! # Example
//!
//! ```no_run
//! use mock_fetch::{global_target, prepare_fetch, mock_get, FetchInit, DEFAULT_SLOT};
//! use serde_json::json;
//!
//! # async fn example() {
//! prepare_fetch();
//!
//! mock_get("/apples").will_resolve(json!({ "apples": 33 }));
//!
//! let response = global_target()
//!     .fetch(DEFAULT_SLOT, "/apples", FetchInit::new())
//!     .await
//!     .unwrap();
//! assert_eq!(response.json().unwrap(), json!({ "apples": 33 }));
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod form;
pub mod headers;
pub mod matcher;
pub mod mock;
pub mod outcome;
pub mod pairs;
pub mod registry;
pub mod response;
pub mod shim;
pub mod spy;
pub mod statuses;

pub use api::{
    clear_all, default_mock, mock_delete, mock_fetch, mock_get, mock_patch, mock_post, mock_put,
    prepare_fetch, MockFetch, MockOptions,
};
pub use config::StubFile;
pub use error::FetchError;
pub use form::FormData;
pub use headers::Headers;
pub use matcher::{Method, ParsedUrl, PathPattern, Route};
pub use mock::FetchMock;
pub use outcome::{Blob, Body, Outcome, ResponseStub};
pub use registry::{Rule, RuleRegistry};
pub use response::ResponseMock;
pub use shim::{call_method, global_target, Fetch, FetchInit, FetchInput, MockRequest, SlotTable, DEFAULT_SLOT};
pub use spy::{CallOutcome, CallRecorder, RecordedCall};
pub use statuses::status_text;
