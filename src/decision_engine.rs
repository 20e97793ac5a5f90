//! Decision Engine
//!
//! Turns a call, its normalized number and the reputation lookup into the
//! single outcome that drives both the hangup and the notifications.

use crate::call::CallContext;
use crate::reputation::LookupResult;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    NoCalleridOrNotInbound,
    LookupFailed,
    Blocked,
    AllowedListed,
    AllowedNotListed,
    Error,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::NoCalleridOrNotInbound => "no_callerid_or_not_inbound",
            CallState::LookupFailed => "lookup_failed",
            CallState::Blocked => "blocked",
            CallState::AllowedListed => "allowed_listed",
            CallState::AllowedNotListed => "allowed_not_listed",
            CallState::Error => "error",
        }
    }

    /// Only a block ends the call, everything else lets routing continue.
    pub fn terminates_call(&self) -> bool {
        matches!(self, CallState::Blocked)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision record for one call, also the source of every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub state: CallState,
    pub number: String,
    pub votes: u32,
    pub rating: String,
    pub did: String,
}

impl Outcome {
    fn without_rating(state: CallState, number: &str, did: &str) -> Self {
        Self {
            state,
            number: number.to_string(),
            votes: 0,
            rating: String::new(),
            did: did.to_string(),
        }
    }

    /// Outcome for an internal fault. Carries no call data.
    pub fn error() -> Self {
        Self::without_rating(CallState::Error, "", "")
    }
}

/// Rating codes that count against a number, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct NegativeRatings {
    codes: HashSet<String>,
}

impl NegativeRatings {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, rating: &str) -> bool {
        !rating.is_empty() && self.codes.contains(&rating.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn sorted(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.codes.iter().cloned().collect();
        codes.sort();
        codes
    }
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    min_votes: u32,
    negative_ratings: NegativeRatings,
}

impl DecisionEngine {
    pub fn new(min_votes: u32, negative_ratings: NegativeRatings) -> Self {
        Self {
            min_votes,
            negative_ratings,
        }
    }

    pub fn min_votes(&self) -> u32 {
        self.min_votes
    }

    pub fn negative_ratings(&self) -> &NegativeRatings {
        &self.negative_ratings
    }

    pub fn decide(&self, call: &CallContext, normalized: &str, lookup: &LookupResult) -> Outcome {
        let did = call.called_number.as_str();

        if !call.is_inbound || normalized.trim().is_empty() {
            return Outcome::without_rating(CallState::NoCalleridOrNotInbound, normalized, did);
        }

        if !lookup.succeeded {
            return Outcome::without_rating(CallState::LookupFailed, normalized, did);
        }

        let state = if lookup.votes >= self.min_votes
            && self.negative_ratings.contains(&lookup.rating)
        {
            CallState::Blocked
        } else if lookup.votes > 0 {
            CallState::AllowedListed
        } else {
            CallState::AllowedNotListed
        };

        Outcome {
            state,
            number: normalized.to_string(),
            votes: lookup.votes,
            rating: lookup.rating.clone(),
            did: did.to_string(),
        }
    }
}
