//! Pattern matching for resources, actions and roles
//!
//! Rule fields are globs compiled once at load time into a closed
//! [`Matcher`] union. Matching never allocates and has no side effects,
//! so compiled values can be shared freely between threads.
//!
//! # Example
//!
//! ```rust
//! use htrbac::pattern::{Action, Resource};
//!
//! let rule_resource = Resource::parse("/docs/**", false).unwrap();
//! assert!(rule_resource.matches(&Resource::new("/docs/a/b.txt")));
//! assert!(!rule_resource.matches(&Resource::new("/docs/.git")));
//!
//! let any_action = Action::parse("*", true).unwrap();
//! assert!(any_action.matches(&Action::new("DELETE")));
//! ```

pub mod glob;
pub mod matcher;

pub use glob::{glob_to_regex, CompiledPattern};
pub use matcher::{Action, Matchable, Matcher, Resource, Role};
