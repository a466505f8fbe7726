//! Repository references (`owner/repo`) parsed from user input.

use std::{fmt, str::FromStr};

use regex::Regex;

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

/// Error returned for input that is not a GitHub repository reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a valid GitHub repository url: {0}")]
pub struct InvalidRepoRef(pub String);

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a repository reference.
    ///
    /// Accepts `https://github.com/owner/repo(.git)`, `git@github.com:owner/repo.git`,
    /// `github.com/owner/repo`, and the bare `owner/repo` shorthand.
    pub fn parse(input: &str) -> Result<Self, InvalidRepoRef> {
        let re = Regex::new(
            r"^(?:(?:https?://(?:[^@/]+@)?|ssh://git@|git@)?github\.com[:/])?([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$",
        )
        .map_err(|_| InvalidRepoRef(input.to_string()))?;

        let trimmed = input.trim();
        let caps = re
            .captures(trimmed)
            .ok_or_else(|| InvalidRepoRef(input.to_string()))?;

        let owner = &caps[1];
        let name = &caps[2];
        if owner.starts_with('.') || owner == "github.com" || name == "." || name == ".." {
            return Err(InvalidRepoRef(input.to_string()));
        }

        Ok(Self::new(owner, name))
    }

    /// `owner/repo` path segment used by the REST API.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = InvalidRepoRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
