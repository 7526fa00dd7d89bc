// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::policy::PolicyError;

/// Audience classification of a status, ordered from widest to narrowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible to everyone, shown on public timelines.
    Public,
    /// Visible to everyone, kept off public timelines.
    Unlocked,
    /// Visible to the author's followers.
    FollowersOnly,
    /// Visible to accounts the author mutually follows.
    MutualsOnly,
    /// Visible only to mentioned accounts.
    Direct,
}

impl Visibility {
    pub const ALL: [Visibility; 5] = [
        Visibility::Public,
        Visibility::Unlocked,
        Visibility::FollowersOnly,
        Visibility::MutualsOnly,
        Visibility::Direct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlocked => "unlocked",
            Visibility::FollowersOnly => "followers_only",
            Visibility::MutualsOnly => "mutuals_only",
            Visibility::Direct => "direct",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "unlocked" => Ok(Visibility::Unlocked),
            "followers_only" => Ok(Visibility::FollowersOnly),
            "mutuals_only" => Ok(Visibility::MutualsOnly),
            "direct" => Ok(Visibility::Direct),
            other => Err(PolicyError::UnrecognizedVisibility(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for visibility in Visibility::ALL {
            assert_eq!(visibility.as_str().parse::<Visibility>().unwrap(), visibility);
        }
    }

    #[test]
    fn test_unrecognized_visibility_rejected() {
        let err = "friends_of_friends".parse::<Visibility>().unwrap_err();
        assert!(matches!(err, PolicyError::UnrecognizedVisibility(v) if v == "friends_of_friends"));
    }

    #[test]
    fn test_ordering_widest_first() {
        assert!(Visibility::Public < Visibility::Unlocked);
        assert!(Visibility::FollowersOnly < Visibility::Direct);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Visibility::FollowersOnly).unwrap();
        assert_eq!(json, "\"followers_only\"");
    }
}
