//! Mock factory and convenience entry points.
//!
//! A [`MockFetch`] owns an isolated registry, recorder, and options; tests
//! needing isolation construct their own and install it wherever they like.
//! A process-wide default instance backs the free functions for the common
//! one-global-fetch case.

use crate::matcher::{Method, PathPattern};
use crate::mock::{bind, FetchMock};
use crate::registry::RuleRegistry;
use crate::shim::{global_target, SlotTable, DEFAULT_SLOT};
use crate::spy::CallRecorder;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

/// Options recognized by a mock factory.
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Prefix prepended to string route paths registered through this
    /// factory. Never applied to pattern routes.
    pub base_url: String,
}

/// An isolated mock-fetch engine: rule registry + call recorder + options.
pub struct MockFetch {
    registry: Arc<RuleRegistry>,
    recorder: CallRecorder,
    options: Mutex<MockOptions>,
}

impl Default for MockFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetch {
    pub fn new() -> Self {
        Self::with_options(MockOptions::default())
    }

    pub fn with_options(options: MockOptions) -> Self {
        Self {
            registry: Arc::new(RuleRegistry::new()),
            recorder: CallRecorder::new(),
            options: Mutex::new(options),
        }
    }

    /// Replace the factory options. Affects bindings created afterwards.
    pub fn set_options(&self, options: MockOptions) {
        *self.options.lock().unwrap_or_else(|e| e.into_inner()) = options;
    }

    /// The configured base url.
    pub fn base_url(&self) -> String {
        self.options
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .base_url
            .clone()
    }

    /// Create a route binding with full control over the route triple.
    pub fn mock(
        &self,
        method: Method,
        path: impl Into<PathPattern>,
        include_query: bool,
    ) -> FetchMock {
        bind(
            self.registry.clone(),
            self.recorder.clone(),
            method,
            path.into(),
            include_query,
            &self.base_url(),
        )
    }

    pub fn get(&self, path: impl Into<PathPattern>) -> FetchMock {
        self.mock(Method::Get, path, true)
    }

    pub fn post(&self, path: impl Into<PathPattern>) -> FetchMock {
        self.mock(Method::Post, path, true)
    }

    pub fn patch(&self, path: impl Into<PathPattern>) -> FetchMock {
        self.mock(Method::Patch, path, true)
    }

    pub fn put(&self, path: impl Into<PathPattern>) -> FetchMock {
        self.mock(Method::Put, path, true)
    }

    pub fn delete(&self, path: impl Into<PathPattern>) -> FetchMock {
        self.mock(Method::Delete, path, true)
    }

    /// Remove every registered rule.
    pub fn clear_all(&self) {
        self.registry.clear_all();
    }

    /// The shared call recorder.
    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    /// The shared rule registry.
    pub fn registry(&self) -> Arc<RuleRegistry> {
        self.registry.clone()
    }

    /// Install this engine's interception wrapper into a slot on the given
    /// target, capturing whatever the slot held as the fallback.
    pub fn install(&self, target: &SlotTable, slot: &str) {
        target.install(slot, self.registry.clone(), self.recorder.clone());
    }

    /// Install into the process-wide default target under the conventional
    /// slot name.
    pub fn prepare(&self) {
        self.install(global_target(), DEFAULT_SLOT);
    }
}

static DEFAULT_MOCK: Lazy<MockFetch> = Lazy::new(MockFetch::new);

/// The default engine behind the free functions.
pub fn default_mock() -> &'static MockFetch {
    &DEFAULT_MOCK
}

/// Install the default engine into the process-wide target. Call once in
/// test setup before anything fetches.
pub fn prepare_fetch() {
    default_mock().prepare();
}

/// Route binding on the default engine with full control.
pub fn mock_fetch(method: Method, path: impl Into<PathPattern>, include_query: bool) -> FetchMock {
    default_mock().mock(method, path, include_query)
}

pub fn mock_get(path: impl Into<PathPattern>) -> FetchMock {
    default_mock().get(path)
}

pub fn mock_post(path: impl Into<PathPattern>) -> FetchMock {
    default_mock().post(path)
}

pub fn mock_patch(path: impl Into<PathPattern>) -> FetchMock {
    default_mock().patch(path)
}

pub fn mock_put(path: impl Into<PathPattern>) -> FetchMock {
    default_mock().put(path)
}

pub fn mock_delete(path: impl Into<PathPattern>) -> FetchMock {
    default_mock().delete(path)
}

/// Clear every rule on the default engine. Tests are responsible for
/// calling this between cases; nothing resets automatically.
pub fn clear_all() {
    default_mock().clear_all();
}
