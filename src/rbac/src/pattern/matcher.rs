//! Named, pattern-bearing values and the matchers behind them

use super::glob::{glob_to_regex, CompiledPattern};
use crate::error::Result;
use std::fmt;
use std::ops::Deref;

/// How a [`Matchable`] decides whether a candidate name satisfies it
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Candidate name equals the matchable's own name
    Exact,
    /// Candidate name matches a compiled glob
    Regex(CompiledPattern),
    /// Inverts the inner matcher
    Negated(Box<Matcher>),
    /// Matches everything
    AlwaysTrue,
}

impl Matcher {
    /// Evaluate against `candidate`; `own_name` is used by [`Matcher::Exact`].
    pub fn matches(&self, own_name: &str, candidate: &str) -> bool {
        match self {
            Matcher::Exact => own_name == candidate,
            Matcher::Regex(pattern) => pattern.is_match(candidate),
            Matcher::Negated(inner) => !inner.matches(own_name, candidate),
            Matcher::AlwaysTrue => true,
        }
    }

    pub fn negate(self) -> Self {
        Matcher::Negated(Box::new(self))
    }

    /// The compiled pattern, looking through negation
    pub fn regex(&self) -> Option<&CompiledPattern> {
        match self {
            Matcher::Regex(pattern) => Some(pattern),
            Matcher::Negated(inner) => inner.regex(),
            Matcher::Exact | Matcher::AlwaysTrue => None,
        }
    }
}

/// A name, a description and a matcher
///
/// Plain names built with [`Matchable::new`] match by equality. Patterns
/// built with [`Matchable::parse`] compile their glob once, up front.
#[derive(Debug, Clone)]
pub struct Matchable {
    pub name: String,
    pub description: String,
    pub matcher: Matcher,
}

impl Matchable {
    /// An exact-name matchable
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            matcher: Matcher::Exact,
        }
    }

    /// Parse a pattern spec.
    ///
    /// A leading `!` negates the result. With `star_always_matches`, a bare
    /// `*` becomes [`Matcher::AlwaysTrue`]; otherwise the glob is compiled.
    pub fn parse(spec: &str, star_always_matches: bool) -> Result<Self> {
        let (negate, glob) = match spec.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };

        let (mut matcher, mut description) = if star_always_matches && glob == "*" {
            (Matcher::AlwaysTrue, glob.to_string())
        } else {
            let pattern = glob_to_regex(glob)?;
            let description = pattern.as_str().to_string();
            (Matcher::Regex(pattern), description)
        };

        if negate {
            matcher = matcher.negate();
            description = format!("!{description}");
        }

        Ok(Self {
            name: spec.to_string(),
            description,
            matcher,
        })
    }

    pub fn matches(&self, other: &Matchable) -> bool {
        self.matches_name(&other.name)
    }

    pub fn matches_name(&self, candidate: &str) -> bool {
        self.matcher.matches(&self.name, candidate)
    }

    pub fn regex(&self) -> Option<&CompiledPattern> {
        self.matcher.regex()
    }
}

impl fmt::Display for Matchable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

macro_rules! matchable_kind {
    ($(#[$meta:meta])* $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $kind(pub Matchable);

        impl $kind {
            /// Exact-name value, as used in requests and memberships
            pub fn new(name: impl Into<String>) -> Self {
                Self(Matchable::new(name))
            }

            /// Compiled pattern, as used in rules
            pub fn parse(spec: &str, star_always_matches: bool) -> Result<Self> {
                Matchable::parse(spec, star_always_matches).map(Self)
            }

            pub fn matches(&self, other: &$kind) -> bool {
                self.0.matches(&other.0)
            }
        }

        impl Deref for $kind {
            type Target = Matchable;

            fn deref(&self) -> &Matchable {
                &self.0
            }
        }

        impl From<Matchable> for $kind {
            fn from(matchable: Matchable) -> Self {
                Self(matchable)
            }
        }

        impl fmt::Display for $kind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

matchable_kind!(
    /// A resource path, or a resource path pattern
    Resource
);
matchable_kind!(
    /// An action name such as `GET`, or an action pattern
    Action
);
matchable_kind!(
    /// A role name, or a role pattern
    Role
);
