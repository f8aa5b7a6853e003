//! Loading users, memberships, passwords and rules from text files

pub mod files;
pub mod text;
pub mod walker;

pub use files::DomainFileLoader;
pub use text::{TextLoader, UnmatchedLines};
pub use walker::{FileSystemLoader, FsRuleFileSource, RuleFileSource};
