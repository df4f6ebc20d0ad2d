use serde::{Deserialize, Serialize};

use crate::decision::path::{BranchPath, BranchToken};
use crate::domain::filter::FilterAttribute;

/// Named states of the branch cascade. Each state owns one branch-entry
/// token; re-entry on the next turn is keyed by that token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionState {
    NameOverride,
    NeedsPrimaryWithSecondaryExpert,
    CompletePrimaryWithSecondaryExpert,
    PartialPrimaryNoSecondaryExpert,
    AlmostAllPrimaryNoExpert,
    PartialPrimaryNoExpert,
    CompletePrimaryOther,
}

impl DecisionState {
    pub fn entry_token(self) -> BranchToken {
        match self {
            Self::NameOverride => BranchToken::NotEmptyNameFilter,
            Self::NeedsPrimaryWithSecondaryExpert => {
                BranchToken::NotEnoughPrimaryAndSomeSecondaryAndSomeExpert
            }
            Self::CompletePrimaryWithSecondaryExpert => {
                BranchToken::AllPrimaryAndSomeSecondaryAndSomeExpert
            }
            Self::PartialPrimaryNoSecondaryExpert => {
                BranchToken::NotEnoughPrimaryAndNoSecondaryAndSomeExpert
            }
            Self::AlmostAllPrimaryNoExpert => BranchToken::AlmostAllPrimaryAndNoExpert,
            Self::PartialPrimaryNoExpert => BranchToken::NotEnoughPrimaryAndNoExpert,
            Self::CompletePrimaryOther => BranchToken::AllPrimary,
        }
    }

    /// Maps a stored branch-entry token back to its state. Step and terminal
    /// tokens return `None`; they never open a path.
    pub fn for_entry_token(token: BranchToken) -> Option<Self> {
        match token {
            BranchToken::NotEmptyNameFilter => Some(Self::NameOverride),
            BranchToken::NotEnoughPrimaryAndSomeSecondaryAndSomeExpert => {
                Some(Self::NeedsPrimaryWithSecondaryExpert)
            }
            BranchToken::AllPrimaryAndSomeSecondaryAndSomeExpert => {
                Some(Self::CompletePrimaryWithSecondaryExpert)
            }
            BranchToken::NotEnoughPrimaryAndNoSecondaryAndSomeExpert => {
                Some(Self::PartialPrimaryNoSecondaryExpert)
            }
            BranchToken::AlmostAllPrimaryAndNoExpert => Some(Self::AlmostAllPrimaryNoExpert),
            BranchToken::NotEnoughPrimaryAndNoExpert => Some(Self::PartialPrimaryNoExpert),
            BranchToken::AllPrimary => Some(Self::CompletePrimaryOther),
            BranchToken::PromptPrimary
            | BranchToken::PromptSecondary
            | BranchToken::PromptRandomSecondary
            | BranchToken::Rand
            | BranchToken::Recommend => None,
        }
    }
}

/// The engine's output for one turn. Constructed fresh per turn, no
/// persistent identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextAction {
    /// Ask the user for the named attributes before recommending.
    FilterPrompt { filters: Vec<FilterAttribute> },
    /// Enough is known; trigger a recommendation downstream.
    Recommendation,
}

impl NextAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FilterPrompt { .. } => "filter_prompt",
            Self::Recommendation => "recommendation",
        }
    }
}

/// Outcome of one evaluation of the decision table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub action: NextAction,
    pub path: BranchPath,
}

/// Tunable engine parameters.
///
/// `near_complete_margin` controls when a no-expert filter is treated as
/// "almost all primary": `filled + margin >= TOTAL_PRIMARY`. The upstream
/// product behavior is margin 1 (exactly one primary attribute missing).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSettings {
    pub history_window_mins: i64,
    pub near_complete_margin: usize,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self { history_window_mins: 30, near_complete_margin: 1 }
    }
}
