//! Rule registry.
//!
//! Owns every registered expectation. Standing rules are keyed by
//! (method, path pattern) with at most one per key; once rules live in an
//! insertion-ordered queue and are consumed FIFO, one per matching call.

use crate::matcher::{Method, PathPattern, Route};
use crate::outcome::Outcome;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// One registered expectation.
#[derive(Debug, Clone)]
pub struct Rule {
    pub route: Route,
    pub once: bool,
    pub outcome: Outcome,
}

impl Rule {
    pub fn new(route: Route, once: bool, outcome: Outcome) -> Self {
        Self {
            route,
            once,
            outcome,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    standing: Vec<Rule>,
    once: VecDeque<Rule>,
}

/// In-memory rule store shared between route bindings and the shim.
///
/// All operations take the lock for a synchronous scan only; nothing is held
/// across an await, so once-queue consumption is ordered by call initiation.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    state: Mutex<State>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rule.
    ///
    /// A standing rule atomically replaces any standing rule with the same
    /// (method, path pattern) key; pending once rules for the route are left
    /// untouched. A once rule is appended to the queue without affecting
    /// anything else.
    pub fn register(&self, rule: Rule) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!(
            method = %rule.route.method,
            path = rule.route.path.key(),
            once = rule.once,
            outcome = rule.outcome.kind(),
            "registering rule"
        );
        if rule.once {
            state.once.push_back(rule);
        } else {
            let method = rule.route.method;
            state
                .standing
                .retain(|existing| !existing.route.same_key(method, &rule.route.path));
            state.standing.push(rule);
        }
    }

    /// Find the outcome for a call, consuming a once rule if one matches.
    ///
    /// The once queue is scanned first, in insertion order; the first match
    /// is removed and returned. Standing rules are scanned next and returned
    /// without removal. `None` tells the shim to fall back to the real
    /// primitive.
    pub fn resolve(&self, method: Method, url: &str) -> Option<Outcome> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(index) = state
            .once
            .iter()
            .position(|rule| rule.route.matches(method, url))
        {
            // position() guarantees the index is present
            let rule = state.once.remove(index)?;
            debug!(method = %method, url, outcome = rule.outcome.kind(), "once rule consumed");
            return Some(rule.outcome);
        }

        let outcome = state
            .standing
            .iter()
            .find(|rule| rule.route.matches(method, url))
            .map(|rule| rule.outcome.clone());

        match &outcome {
            Some(outcome) => {
                debug!(method = %method, url, outcome = outcome.kind(), "standing rule matched")
            }
            None => debug!(method = %method, url, "no rule matched"),
        }

        outcome
    }

    /// Remove every rule, standing and once, registered under the given
    /// (method, path pattern) key.
    pub fn clear(&self, method: Method, path: &PathPattern) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .standing
            .retain(|rule| !rule.route.same_key(method, path));
        state.once.retain(|rule| !rule.route.same_key(method, path));
    }

    /// Remove all rules unconditionally.
    pub fn clear_all(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.standing.clear();
        state.once.clear();
    }

    /// Number of standing rules currently stored.
    pub fn standing_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .standing
            .len()
    }

    /// Number of pending once rules.
    pub fn once_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .once
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ResponseStub;
    use serde_json::json;

    fn route(path: &str) -> Route {
        Route::new(Method::Get, path, true)
    }

    fn resolve_with(value: serde_json::Value) -> Outcome {
        Outcome::Resolve(ResponseStub::new().body(value))
    }

    fn body_of(outcome: Outcome) -> serde_json::Value {
        match outcome {
            Outcome::Resolve(stub) | Outcome::Fail(stub) => match stub.body {
                Some(crate::outcome::Body::Json(value)) => value,
                other => panic!("unexpected body: {other:?}"),
            },
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_standing_rule_is_reusable() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/apples"), false, resolve_with(json!(33))));

        for _ in 0..3 {
            let outcome = registry.resolve(Method::Get, "/apples").unwrap();
            assert_eq!(body_of(outcome), json!(33));
        }
        assert_eq!(registry.standing_len(), 1);
    }

    #[test]
    fn test_standing_registration_replaces_same_key() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/path"), false, resolve_with(json!({"data": 1}))));
        registry.register(Rule::new(route("/path"), false, resolve_with(json!({"data": 2}))));

        assert_eq!(registry.standing_len(), 1);
        let outcome = registry.resolve(Method::Get, "/path").unwrap();
        assert_eq!(body_of(outcome), json!({"data": 2}));
    }

    #[test]
    fn test_once_rules_are_consumed_fifo() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/apples"), true, resolve_with(json!(1))));
        registry.register(Rule::new(route("/apples"), true, resolve_with(json!(2))));

        assert_eq!(body_of(registry.resolve(Method::Get, "/apples").unwrap()), json!(1));
        assert_eq!(body_of(registry.resolve(Method::Get, "/apples").unwrap()), json!(2));
        assert!(registry.resolve(Method::Get, "/apples").is_none());
    }

    #[test]
    fn test_once_rule_takes_precedence_over_standing() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/apples"), false, resolve_with(json!("standing"))));
        registry.register(Rule::new(route("/apples"), true, resolve_with(json!("once"))));

        assert_eq!(
            body_of(registry.resolve(Method::Get, "/apples").unwrap()),
            json!("once")
        );
        assert_eq!(
            body_of(registry.resolve(Method::Get, "/apples").unwrap()),
            json!("standing")
        );
    }

    #[test]
    fn test_standing_replacement_leaves_once_queue_alone() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/path"), true, resolve_with(json!("pending"))));
        registry.register(Rule::new(route("/path"), false, resolve_with(json!("old"))));
        registry.register(Rule::new(route("/path"), false, resolve_with(json!("new"))));

        assert_eq!(registry.once_len(), 1);
        assert_eq!(
            body_of(registry.resolve(Method::Get, "/path").unwrap()),
            json!("pending")
        );
        assert_eq!(
            body_of(registry.resolve(Method::Get, "/path").unwrap()),
            json!("new")
        );
    }

    #[test]
    fn test_standing_throw_fires_on_every_call() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(
            route("/broken"),
            false,
            Outcome::Throw(crate::error::FetchError::thrown("boom")),
        ));

        for _ in 0..2 {
            match registry.resolve(Method::Get, "/broken").unwrap() {
                Outcome::Throw(err) => assert_eq!(err.to_string(), "boom"),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn test_clear_removes_both_kinds_for_the_key_only() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/a"), false, resolve_with(json!(1))));
        registry.register(Rule::new(route("/a"), true, resolve_with(json!(2))));
        registry.register(Rule::new(route("/b"), false, resolve_with(json!(3))));

        registry.clear(Method::Get, &PathPattern::Exact("/a".to_string()));

        assert!(registry.resolve(Method::Get, "/a").is_none());
        assert_eq!(body_of(registry.resolve(Method::Get, "/b").unwrap()), json!(3));
    }

    #[test]
    fn test_clear_all_empties_everything() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/a"), false, resolve_with(json!(1))));
        registry.register(Rule::new(route("/b"), true, resolve_with(json!(2))));

        registry.clear_all();

        assert_eq!(registry.standing_len(), 0);
        assert_eq!(registry.once_len(), 0);
    }

    #[test]
    fn test_method_distinguishes_keys() {
        let registry = RuleRegistry::new();
        registry.register(Rule::new(route("/a"), false, resolve_with(json!(1))));
        registry.register(Rule::new(
            Route::new(Method::Post, "/a", true),
            false,
            resolve_with(json!(2)),
        ));

        assert_eq!(registry.standing_len(), 2);
        assert_eq!(body_of(registry.resolve(Method::Post, "/a").unwrap()), json!(2));
    }
}
