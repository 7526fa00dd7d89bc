// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Interaction Policy Domain Model
//!
//! An [`InteractionPolicy`] is attached to every status and decides who may
//! Like, Reply to, or Announce it. Each interaction kind carries a
//! [`PolicyRules`] pair: values in `always` are permitted outright, values in
//! `with_approval` are permitted pending approval by the status author.
//!
//! A [`PolicyValue`] is stored either as one of the symbolic placeholders
//! (`public`, `followers`, `following`, `mutuals`, `mentioned`, `author`) or
//! as a literal ActivityPub URI. Placeholders are translated to the author's
//! concrete URIs when federated out and back again when received, see
//! `crate::application::policy_mapper`.
//!
//! Statuses without an explicit policy use [`InteractionPolicy::default_for`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::domain::visibility::Visibility;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Policy value must not be empty")]
    EmptyValue,

    #[error("Policy value '{0}' is neither a placeholder nor an absolute URI")]
    InvalidUri(String),

    #[error("Visibility '{0}' not recognized")]
    UnrecognizedVisibility(String),

    #[error("Interaction kind '{0}' not recognized")]
    UnrecognizedInteraction(String),
}

/// One actor or collection of actors referenced by a policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolicyValue {
    /// The ActivityPub public collection, matches every requester.
    Public,
    /// Followers collection of the status author.
    Followers,
    /// Following collection of the status author.
    Following,
    /// Mutuals of the status author.
    ///
    /// Reserved: never matches until mutual-follow semantics are settled.
    Mutuals,
    /// Actors mentioned in the status.
    Mentioned,
    /// The status author.
    Author,
    /// A specific actor or collection URI with no symbolic stand-in.
    ///
    /// Always an absolute URI, which keeps it disjoint from the placeholder
    /// names. Build it through [`PolicyValue::uri`] or `FromStr`.
    Uri(String),
}

impl PolicyValue {
    pub const SYMBOLIC: [PolicyValue; 6] = [
        PolicyValue::Public,
        PolicyValue::Followers,
        PolicyValue::Following,
        PolicyValue::Mutuals,
        PolicyValue::Mentioned,
        PolicyValue::Author,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PolicyValue::Public => "public",
            PolicyValue::Followers => "followers",
            PolicyValue::Following => "following",
            PolicyValue::Mutuals => "mutuals",
            PolicyValue::Mentioned => "mentioned",
            PolicyValue::Author => "author",
            PolicyValue::Uri(uri) => uri,
        }
    }

    /// Literal value for an absolute actor or collection URI.
    pub fn uri(uri: impl Into<String>) -> Result<Self, PolicyError> {
        let uri = uri.into();
        let trimmed = uri.trim();
        match Url::parse(trimmed) {
            Ok(_) => Ok(PolicyValue::Uri(trimmed.to_string())),
            Err(_) => Err(PolicyError::InvalidUri(trimmed.to_string())),
        }
    }

    pub fn is_symbolic(&self) -> bool {
        !matches!(self, PolicyValue::Uri(_))
    }

    /// Whether this value could sensibly appear in a policy for a status
    /// with the given visibility.
    ///
    /// Advisory only. Remote software may attach infeasible combinations
    /// and evaluation still has to cope with them; visibility filtering
    /// keeps requesters who cannot see the status from interacting anyway.
    pub fn feasible_for_visibility(&self, visibility: Visibility) -> bool {
        match self {
            PolicyValue::Author | PolicyValue::Mentioned => true,

            PolicyValue::Followers | PolicyValue::Following => matches!(
                visibility,
                Visibility::FollowersOnly | Visibility::Public | Visibility::Unlocked
            ),

            PolicyValue::Public => {
                matches!(visibility, Visibility::Unlocked | Visibility::Public)
            }

            // Any other combo is probably fine.
            PolicyValue::Mutuals | PolicyValue::Uri(_) => true,
        }
    }
}

impl fmt::Display for PolicyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyValue {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value = match s {
            "" => return Err(PolicyError::EmptyValue),
            "public" => PolicyValue::Public,
            "followers" => PolicyValue::Followers,
            "following" => PolicyValue::Following,
            "mutuals" => PolicyValue::Mutuals,
            "mentioned" => PolicyValue::Mentioned,
            "author" => PolicyValue::Author,
            uri => return PolicyValue::uri(uri),
        };
        Ok(value)
    }
}

impl TryFrom<String> for PolicyValue {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PolicyValue> for String {
    fn from(value: PolicyValue) -> Self {
        match value {
            PolicyValue::Uri(uri) => uri,
            symbolic => symbolic.as_str().to_string(),
        }
    }
}

/// Outcome of checking a requester against a policy, ordered by
/// permissiveness so that the most permissive match wins under `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyResult {
    Forbidden,
    WithApproval,
    Permitted,
}

impl PolicyResult {
    /// Most permissive result of the given matches, `Forbidden` when empty.
    pub fn most_permissive(results: impl IntoIterator<Item = PolicyResult>) -> PolicyResult {
        results.into_iter().fold(PolicyResult::Forbidden, PolicyResult::max)
    }

    pub fn is_permitted(&self) -> bool {
        *self == PolicyResult::Permitted
    }

    pub fn is_forbidden(&self) -> bool {
        *self == PolicyResult::Forbidden
    }

    pub fn requires_approval(&self) -> bool {
        *self == PolicyResult::WithApproval
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyResult::Forbidden => "forbidden",
            PolicyResult::WithApproval => "with_approval",
            PolicyResult::Permitted => "permitted",
        }
    }
}

impl fmt::Display for PolicyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Reply,
    Announce,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [
        InteractionKind::Like,
        InteractionKind::Reply,
        InteractionKind::Announce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Reply => "reply",
            InteractionKind::Announce => "announce",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "like" | "favourite" => Ok(InteractionKind::Like),
            "reply" => Ok(InteractionKind::Reply),
            "announce" | "boost" | "reblog" => Ok(InteractionKind::Announce),
            other => Err(PolicyError::UnrecognizedInteraction(other.to_string())),
        }
    }
}

/// Rules for one interaction kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRules {
    /// Permitted without approval.
    #[serde(default)]
    pub always: Vec<PolicyValue>,
    /// Permitted pending approval by the status author.
    #[serde(default)]
    pub with_approval: Vec<PolicyValue>,
}

impl PolicyRules {
    pub fn new(always: Vec<PolicyValue>, with_approval: Vec<PolicyValue>) -> Self {
        Self {
            always,
            with_approval,
        }
    }

    pub fn always(values: impl IntoIterator<Item = PolicyValue>) -> Self {
        Self::new(values.into_iter().collect(), Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.always.is_empty() && self.with_approval.is_empty()
    }

    /// Values grouped by the result they grant, most permissive tier first.
    ///
    /// Each value appears once. A value listed in both sets only appears in
    /// the `Permitted` tier.
    pub fn tiers(&self) -> [(PolicyResult, Vec<&PolicyValue>); 2] {
        let mut always: Vec<&PolicyValue> = Vec::with_capacity(self.always.len());
        for value in &self.always {
            if !always.contains(&value) {
                always.push(value);
            }
        }

        let mut approval: Vec<&PolicyValue> = Vec::with_capacity(self.with_approval.len());
        for value in &self.with_approval {
            if !always.contains(&value) && !approval.contains(&value) {
                approval.push(value);
            }
        }

        [
            (PolicyResult::Permitted, always),
            (PolicyResult::WithApproval, approval),
        ]
    }

    /// Copy with duplicates dropped and `always` taking precedence.
    pub fn normalized(&self) -> Self {
        let [(_, always), (_, approval)] = self.tiers();
        Self {
            always: always.into_iter().cloned().collect(),
            with_approval: approval.into_iter().cloned().collect(),
        }
    }
}

/// Which interactions a status accepts, and from whom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPolicy {
    #[serde(default)]
    pub can_like: PolicyRules,
    #[serde(default)]
    pub can_reply: PolicyRules,
    #[serde(default)]
    pub can_announce: PolicyRules,
}

impl InteractionPolicy {
    pub fn rules_for(&self, kind: InteractionKind) -> &PolicyRules {
        match kind {
            InteractionKind::Like => &self.can_like,
            InteractionKind::Reply => &self.can_reply,
            InteractionKind::Announce => &self.can_announce,
        }
    }

    pub fn rules_for_mut(&mut self, kind: InteractionKind) -> &mut PolicyRules {
        match kind {
            InteractionKind::Like => &mut self.can_like,
            InteractionKind::Reply => &mut self.can_reply,
            InteractionKind::Announce => &mut self.can_announce,
        }
    }

    pub fn normalized(&self) -> Self {
        Self {
            can_like: self.can_like.normalized(),
            can_reply: self.can_reply.normalized(),
            can_announce: self.can_announce.normalized(),
        }
    }

    /// Values in this policy that are not feasible for `visibility`.
    pub fn infeasible_values(&self, visibility: Visibility) -> Vec<(InteractionKind, PolicyValue)> {
        let mut infeasible = Vec::new();
        for kind in InteractionKind::ALL {
            let rules = self.rules_for(kind);
            for value in rules.always.iter().chain(rules.with_approval.iter()) {
                if !value.feasible_for_visibility(visibility) {
                    infeasible.push((kind, value.clone()));
                }
            }
        }
        infeasible
    }

    /// Default policy for a status with the given visibility.
    pub fn default_for(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => Self::default_public(),
            Visibility::Unlocked => Self::default_unlocked(),
            Visibility::FollowersOnly | Visibility::MutualsOnly => Self::default_followers_only(),
            Visibility::Direct => Self::default_direct(),
        }
    }

    /// Anyone can like, reply and announce.
    pub fn default_public() -> Self {
        Self {
            can_like: PolicyRules::always([PolicyValue::Public]),
            can_reply: PolicyRules::always([PolicyValue::Public]),
            can_announce: PolicyRules::always([PolicyValue::Public]),
        }
    }

    /// Same as public (for now).
    pub fn default_unlocked() -> Self {
        Self::default_public()
    }

    /// Author, followers and mentioned can like and reply, only the author
    /// can announce.
    pub fn default_followers_only() -> Self {
        let audience = [
            PolicyValue::Author,
            PolicyValue::Followers,
            PolicyValue::Mentioned,
        ];
        Self {
            can_like: PolicyRules::always(audience.clone()),
            can_reply: PolicyRules::always(audience),
            can_announce: PolicyRules::always([PolicyValue::Author]),
        }
    }

    /// Author and mentioned can like and reply, only the author can announce.
    pub fn default_direct() -> Self {
        let audience = [PolicyValue::Author, PolicyValue::Mentioned];
        Self {
            can_like: PolicyRules::always(audience.clone()),
            can_reply: PolicyRules::always(audience),
            can_announce: PolicyRules::always([PolicyValue::Author]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feasibility_table() {
        use PolicyValue::*;
        use Visibility::*;

        let table: [(PolicyValue, [bool; 5]); 6] = [
            // Public, Unlocked, FollowersOnly, MutualsOnly, Direct
            (Author, [true, true, true, true, true]),
            (Mentioned, [true, true, true, true, true]),
            (Mutuals, [true, true, true, true, true]),
            (Followers, [true, true, true, false, false]),
            (Following, [true, true, true, false, false]),
            (PolicyValue::Public, [true, true, false, false, false]),
        ];

        for (value, expected) in table {
            for (visibility, feasible) in [Visibility::Public, Unlocked, FollowersOnly, MutualsOnly, Direct]
                .into_iter()
                .zip(expected)
            {
                assert_eq!(
                    value.feasible_for_visibility(visibility),
                    feasible,
                    "{} at {}",
                    value,
                    visibility
                );
            }
        }
    }

    #[test]
    fn test_defaults_are_feasible_and_deterministic() {
        for visibility in Visibility::ALL {
            let policy = InteractionPolicy::default_for(visibility);
            assert!(
                policy.infeasible_values(visibility).is_empty(),
                "default for {} violates feasibility",
                visibility
            );
            assert_eq!(policy, InteractionPolicy::default_for(visibility));
        }
    }

    #[test]
    fn test_default_followers_only_shape() {
        let policy = InteractionPolicy::default_for(Visibility::MutualsOnly);
        assert_eq!(
            policy.can_reply.always,
            vec![PolicyValue::Author, PolicyValue::Followers, PolicyValue::Mentioned]
        );
        assert_eq!(policy.can_announce.always, vec![PolicyValue::Author]);
        for kind in InteractionKind::ALL {
            assert!(policy.rules_for(kind).with_approval.is_empty());
        }
    }

    #[test]
    fn test_default_direct_excludes_followers() {
        let policy = InteractionPolicy::default_for(Visibility::Direct);
        assert_eq!(policy.can_like.always, vec![PolicyValue::Author, PolicyValue::Mentioned]);
        assert!(!policy.can_reply.always.contains(&PolicyValue::Followers));
        assert_eq!(policy.can_announce.always, vec![PolicyValue::Author]);
    }

    #[test]
    fn test_unlocked_matches_public() {
        assert_eq!(
            InteractionPolicy::default_for(Visibility::Unlocked),
            InteractionPolicy::default_for(Visibility::Public)
        );
    }

    #[test]
    fn test_result_ordering() {
        assert!(PolicyResult::Forbidden < PolicyResult::WithApproval);
        assert!(PolicyResult::WithApproval < PolicyResult::Permitted);
        assert_eq!(
            PolicyResult::most_permissive([PolicyResult::WithApproval, PolicyResult::Permitted]),
            PolicyResult::Permitted
        );
        assert_eq!(PolicyResult::most_permissive([]), PolicyResult::Forbidden);
    }

    #[test]
    fn test_tiers_always_wins_and_dedupes() {
        let rules = PolicyRules::new(
            vec![PolicyValue::Author, PolicyValue::Mentioned, PolicyValue::Author],
            vec![PolicyValue::Mentioned, PolicyValue::Public, PolicyValue::Public],
        );

        let [(top, always), (lower, approval)] = rules.tiers();
        assert_eq!(top, PolicyResult::Permitted);
        assert_eq!(always, vec![&PolicyValue::Author, &PolicyValue::Mentioned]);
        assert_eq!(lower, PolicyResult::WithApproval);
        assert_eq!(approval, vec![&PolicyValue::Public]);

        let normalized = rules.normalized();
        assert_eq!(normalized.with_approval, vec![PolicyValue::Public]);
    }

    #[test]
    fn test_value_parsing() {
        assert_eq!("followers".parse::<PolicyValue>().unwrap(), PolicyValue::Followers);
        assert_eq!(
            "https://remote.social/users/bob".parse::<PolicyValue>().unwrap(),
            PolicyValue::Uri("https://remote.social/users/bob".to_string())
        );
        assert_eq!("  ".parse::<PolicyValue>(), Err(PolicyError::EmptyValue));
        assert!(matches!(
            "friends".parse::<PolicyValue>(),
            Err(PolicyError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_literal_cannot_shadow_placeholder() {
        for name in ["public", "followers", "following", "mutuals", "mentioned", "author"] {
            assert!(PolicyValue::uri(name).is_err(), "{} accepted as a literal", name);
        }

        let literal = PolicyValue::uri("https://remote.example/users/public").unwrap();
        let rules = PolicyRules::always([literal.clone()]);
        let back: PolicyRules = serde_json::from_value(serde_json::to_value(&rules).unwrap()).unwrap();
        assert_eq!(back.always, vec![literal]);
        assert!(!back.always[0].is_symbolic());
    }

    #[test]
    fn test_value_serde_as_plain_string() {
        let rules = PolicyRules::new(
            vec![PolicyValue::Author, PolicyValue::Uri("https://x.org/users/a".to_string())],
            vec![],
        );
        let json = serde_json::to_value(&rules).unwrap();
        assert_eq!(json["always"][0], "author");
        assert_eq!(json["always"][1], "https://x.org/users/a");

        let back: PolicyRules = serde_json::from_value(json).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn test_interaction_kind_aliases() {
        assert_eq!("boost".parse::<InteractionKind>().unwrap(), InteractionKind::Announce);
        assert_eq!("Like".parse::<InteractionKind>().unwrap(), InteractionKind::Like);
        assert!("quote".parse::<InteractionKind>().is_err());
    }
}
