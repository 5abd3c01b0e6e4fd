//! Rule lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled rules in configured order
//! - Look up the matching rule for a request
//! - Return matched rule or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in list order; no reordering by specificity
//! - Explicit NoMatch rather than silent default

use crate::config::schema::RuleConfig;
use crate::http::request::InboundRequest;
use crate::routing::matcher::{AndMatcher, Matcher};

/// A rule together with its compiled match condition.
#[derive(Debug)]
pub struct CompiledRule {
    pub config: RuleConfig,
    matcher: AndMatcher,
}

impl CompiledRule {
    pub fn new(config: RuleConfig) -> Self {
        let matcher = AndMatcher::from_condition(&config.match_condition);
        Self { config, matcher }
    }

    pub fn matches(&self, req: &InboundRequest) -> bool {
        self.matcher.matches(req)
    }
}

/// Ordered, immutable rule table.
#[derive(Debug, Default)]
pub struct Router {
    rules: Vec<CompiledRule>,
}

impl Router {
    /// Compile rules, preserving configured order exactly.
    pub fn from_config(rules: Vec<RuleConfig>) -> Self {
        Self {
            rules: rules.into_iter().map(CompiledRule::new).collect(),
        }
    }

    /// First rule whose every configured dimension holds, if any.
    pub fn match_request(&self, req: &InboundRequest) -> Option<&RuleConfig> {
        self.rules
            .iter()
            .find(|rule| rule.matches(req))
            .map(|rule| &rule.config)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
