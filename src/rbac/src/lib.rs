//! # htrbac
//!
//! Role based access control over a directory tree, configured with
//! plain text files in the spirit of `.htaccess`.
//!
//! ## Features
//!
//! - **Cascading rule files**: one `.rbac.txt` per directory, nearest first
//! - **First match wins**: the earliest matching rule decides
//! - **Fail closed**: unknown users and unmatched requests are denied
//! - **Glob patterns** for actions, roles and resources, compiled at load time
//! - **Stateless sessions** via AES-256-GCM tokens in a cookie or Bearer header
//!
//! ## Example
//!
//! ```rust,no_run
//! use htrbac::{App, RbacConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::new(RbacConfig::new("/srv/www", "/etc/htrbac"))?;
//!
//!     if let Some(cookie) = app.login("bob", "b0b3r7")? {
//!         let (allowed, decision) =
//!             app.check_access("GET", "/docs/index.html", None, Some(&cookie.value))?;
//!         println!("{allowed}: {}", serde_json::to_string(&decision)?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod loader;
pub mod path;
pub mod pattern;
pub mod rule;

// Re-export commonly used types
pub use app::{App, Decision, DecisionRule};
pub use auth::{Authenticator, Cipher};
pub use cache::{FileStamp, RuleCacheStats, RuleFileCache};
pub use config::{RbacConfig, UnmatchedLines};
pub use domain::{Domain, IdentityDomain, PasswordDomain, RoleDomain, RuleDomain, Solver};
pub use error::{RbacError, Result};
pub use identity::{Cookie, Group, Identity, Password, User, UserPass};
pub use loader::{DomainFileLoader, FileSystemLoader, RuleFileSource, TextLoader};
pub use pattern::{Action, Matchable, Matcher, Resource, Role};
pub use rule::{Membership, Permission, Request, Rule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
