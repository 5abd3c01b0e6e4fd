//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, headers, query, body)
//!     → router.rs (rule lookup in configured order)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Rule or NoMatch
//!
//! Rule Compilation (per config snapshot):
//!     RuleConfig[]
//!     → Compile matchers, skipping empty dimensions
//!     → Freeze as immutable Router inside the snapshot
//! ```
//!
//! # Design Decisions
//! - Rules compiled once per snapshot, immutable at runtime
//! - No regex in hot path (prefix and exact matching only)
//! - Deterministic: same input always matches same rule
//! - First match wins (configured order, never specificity)

pub mod matcher;
pub mod router;

pub use router::Router;
