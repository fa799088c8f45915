//! Inbound filter rules.
//!
//! A rule names up to four criteria (sender, recipient, subject and body
//! phrases). Every criterion that is set must hold; a rule with none set
//! matches nothing. [`FilterMatcher::find_match`] returns the first matching
//! rule of an ordered list, and the caller applies its [`FilterAction`].
//!
//! # Example
//!
//! ```ignore
//! use mailroom_core::filter::{FilterAction, FilterMatcher, FilterRule};
//!
//! let rules = vec![FilterRule::new()
//!     .with_from("*@newsletter.example.com")
//!     .with_action(FilterAction::Skip)];
//!
//! if let Some(rule) = FilterMatcher.find_match(&incoming, &rules, false) {
//!     // apply rule.action
//! }
//! ```

mod matcher;
mod model;

pub use matcher::{FilterMatcher, wildcard_match};
pub use model::{FilterAction, FilterRule};
