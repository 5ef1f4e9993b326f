//! Trigger references and gating rules

use anyhow::{bail, Result};
use regex::Regex;
use std::fmt;

/// A source-control reference that triggered a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerRef {
    /// A branch push (`refs/heads/<name>`)
    Branch(String),
    /// A tag push (`refs/tags/<name>`)
    Tag(String),
}

impl TriggerRef {
    /// Parse a fully-qualified ref string
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(name) = raw.strip_prefix("refs/heads/") {
            if name.is_empty() {
                bail!("Empty branch name in ref '{}'", raw);
            }
            return Ok(TriggerRef::Branch(name.to_string()));
        }
        if let Some(name) = raw.strip_prefix("refs/tags/") {
            if name.is_empty() {
                bail!("Empty tag name in ref '{}'", raw);
            }
            return Ok(TriggerRef::Tag(name.to_string()));
        }
        bail!("Unrecognized ref '{}': expected refs/heads/* or refs/tags/*", raw);
    }

    /// The short name (branch or tag) without the refs/ prefix
    pub fn name(&self) -> &str {
        match self {
            TriggerRef::Branch(name) | TriggerRef::Tag(name) => name,
        }
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, TriggerRef::Tag(_))
    }
}

impl fmt::Display for TriggerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerRef::Branch(name) => write!(f, "refs/heads/{}", name),
            TriggerRef::Tag(name) => write!(f, "refs/tags/{}", name),
        }
    }
}

/// A branch/tag name pattern with `*` wildcards (e.g. `v*`, `release/*`)
#[derive(Debug, Clone)]
pub struct RefPattern {
    raw: String,
    regex: Regex,
}

impl RefPattern {
    /// Compile a wildcard pattern into an anchored matcher
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            bail!("Ref pattern must not be empty");
        }

        let mut regex_src = String::from("^");
        for ch in pattern.chars() {
            match ch {
                '*' => regex_src.push_str(".*"),
                c => regex_src.push_str(&regex::escape(&c.to_string())),
            }
        }
        regex_src.push('$');

        let regex = Regex::new(&regex_src)?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Check whether a branch/tag short name matches this pattern
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Gating rules derived from the trigger section of the configuration
///
/// Branch patterns gate whether a build runs at all; the release-tag
/// pattern additionally gates the publish stage.
#[derive(Debug, Clone)]
pub struct TriggerRules {
    branches: Vec<RefPattern>,
    release_tags: Option<RefPattern>,
}

impl TriggerRules {
    pub fn new(branches: Vec<RefPattern>, release_tags: Option<RefPattern>) -> Self {
        Self {
            branches,
            release_tags,
        }
    }

    /// Whether the build stage should run for this ref
    ///
    /// Branch pushes must match the inclusion list; tag pushes must match
    /// the release pattern (a tag that cannot publish has nothing to build).
    pub fn allows_build(&self, git_ref: &TriggerRef) -> bool {
        match git_ref {
            TriggerRef::Branch(name) => self.branches.iter().any(|p| p.matches(name)),
            TriggerRef::Tag(name) => self
                .release_tags
                .as_ref()
                .is_some_and(|p| p.matches(name)),
        }
    }

    /// Whether this ref is a release tag (publish gate, build-success aside)
    pub fn is_release_tag(&self, git_ref: &TriggerRef) -> bool {
        match git_ref {
            TriggerRef::Tag(name) => self
                .release_tags
                .as_ref()
                .is_some_and(|p| p.matches(name)),
            TriggerRef::Branch(_) => false,
        }
    }
}
