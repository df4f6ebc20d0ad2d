use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator used when a path is rendered for storage or logs.
pub const PATH_SEPARATOR: &str = "->";

/// Closed set of branch tokens. A decision path is an ordered token sequence
/// compared by last-token equality, never by substring containment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchToken {
    // branch-entry tokens
    NotEmptyNameFilter,
    NotEnoughPrimaryAndSomeSecondaryAndSomeExpert,
    AllPrimaryAndSomeSecondaryAndSomeExpert,
    NotEnoughPrimaryAndNoSecondaryAndSomeExpert,
    AlmostAllPrimaryAndNoExpert,
    NotEnoughPrimaryAndNoExpert,
    AllPrimary,
    // step and terminal tokens
    PromptPrimary,
    PromptSecondary,
    PromptRandomSecondary,
    Rand,
    Recommend,
}

impl BranchToken {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotEmptyNameFilter => "notEmptyNameFilter",
            Self::NotEnoughPrimaryAndSomeSecondaryAndSomeExpert => {
                "notEnoughPrimaryFiltersAndSomeSecondaryAndSomeExpert"
            }
            Self::AllPrimaryAndSomeSecondaryAndSomeExpert => {
                "allPrimaryFiltersAndSomeSecondaryAndSomeExpert"
            }
            Self::NotEnoughPrimaryAndNoSecondaryAndSomeExpert => {
                "notEnoughPrimaryFiltersAndNoSecondaryAndSomeExpert"
            }
            Self::AlmostAllPrimaryAndNoExpert => "almostAllPrimaryFiltersAndNoExpert",
            Self::NotEnoughPrimaryAndNoExpert => "notEnoughPrimaryFiltersAndNoExpert",
            Self::AllPrimary => "allPrimaryFilters",
            Self::PromptPrimary => "promptPrimary",
            Self::PromptSecondary => "promptSecondary",
            Self::PromptRandomSecondary => "promptRandomSecondary",
            Self::Rand => "rand",
            Self::Recommend => "recommend",
        }
    }

    const ALL: [BranchToken; 12] = [
        Self::NotEmptyNameFilter,
        Self::NotEnoughPrimaryAndSomeSecondaryAndSomeExpert,
        Self::AllPrimaryAndSomeSecondaryAndSomeExpert,
        Self::NotEnoughPrimaryAndNoSecondaryAndSomeExpert,
        Self::AlmostAllPrimaryAndNoExpert,
        Self::NotEnoughPrimaryAndNoExpert,
        Self::AllPrimary,
        Self::PromptPrimary,
        Self::PromptSecondary,
        Self::PromptRandomSecondary,
        Self::Rand,
        Self::Recommend,
    ];
}

impl fmt::Display for BranchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathParseError {
    #[error("unknown branch token `{0}`")]
    UnknownToken(String),
}

impl FromStr for BranchToken {
    type Err = PathParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|token| token.as_str() == value)
            .ok_or_else(|| PathParseError::UnknownToken(value.to_string()))
    }
}

/// Ordered trace of the branch tokens one engine invocation walked through.
/// A path describes a single turn only; it is never accumulated across turns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPath(Vec<BranchToken>);

impl BranchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: BranchToken) {
        self.0.push(token);
    }

    pub fn first(&self) -> Option<BranchToken> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<BranchToken> {
        self.0.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A terminated path ended in a recommendation; the branch cannot be
    /// re-entered on the next turn.
    pub fn is_terminated(&self) -> bool {
        self.last() == Some(BranchToken::Recommend)
    }

    pub fn tokens(&self) -> &[BranchToken] {
        &self.0
    }
}

impl From<Vec<BranchToken>> for BranchPath {
    fn from(tokens: Vec<BranchToken>) -> Self {
        Self(tokens)
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, token) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(PATH_SEPARATOR)?;
            }
            f.write_str(token.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for BranchPath {
    type Err = PathParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Ok(Self::new());
        }
        let tokens = value
            .split(PATH_SEPARATOR)
            .map(BranchToken::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(tokens))
    }
}
