// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Interaction Policy Mapper
//!
//! Anti-Corruption Layer between the compact internal policy form and the
//! URI-based form exchanged with other ActivityPub servers.
//!
//! # Architectural Role
//!
//! - **Domain Layer**: symbolic placeholders (`followers`, `author`, ...)
//!   meaningful only relative to one status and its author
//! - **Federation boundary**: fully qualified actor and collection URIs,
//!   the only identifiers remote servers share with us
//!
//! Outbound, every placeholder is expanded against the status author and
//! the mentioned accounts. Inbound, each received URI is compared with the
//! author's known URIs and folded back into a placeholder when it matches
//! one; anything else is kept as a literal URI, so nothing is lost.
//!
//! Mention URIs fold into `Mentioned` only as a set: when a received list
//! names every mentioned account. A list naming some of them keeps each as
//! a literal, since `Mentioned` would grant the others too.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::account::Account;
use crate::domain::policy::{InteractionKind, InteractionPolicy, PolicyRules, PolicyValue};

/// The ActivityStreams public collection.
pub const ACTIVITY_STREAMS_PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Forms of the public collection seen in the wild.
const PUBLIC_ALIASES: [&str; 3] = [ACTIVITY_STREAMS_PUBLIC, "as:Public", "Public"];

/// The author and resolved mentions of the status a policy belongs to.
#[derive(Debug, Clone, Copy)]
pub struct PolicyUriContext<'a> {
    pub author: &'a Account,
    pub mentions: &'a [Account],
}

impl<'a> PolicyUriContext<'a> {
    pub fn new(author: &'a Account, mentions: &'a [Account]) -> Self {
        Self { author, mentions }
    }
}

/// Wire form of the rules for one interaction kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePolicyRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub always: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approval_required: Vec<String>,
}

/// Wire form of a whole interaction policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInteractionPolicy {
    #[serde(default)]
    pub can_like: WirePolicyRules,
    #[serde(default)]
    pub can_reply: WirePolicyRules,
    #[serde(default)]
    pub can_announce: WirePolicyRules,
}

impl WireInteractionPolicy {
    fn rules_for(&self, kind: InteractionKind) -> &WirePolicyRules {
        match kind {
            InteractionKind::Like => &self.can_like,
            InteractionKind::Reply => &self.can_reply,
            InteractionKind::Announce => &self.can_announce,
        }
    }

    fn rules_for_mut(&mut self, kind: InteractionKind) -> &mut WirePolicyRules {
        match kind {
            InteractionKind::Like => &mut self.can_like,
            InteractionKind::Reply => &mut self.can_reply,
            InteractionKind::Announce => &mut self.can_announce,
        }
    }
}

/// Expand a policy value into the URIs it stands for.
///
/// `Mentioned` fans out into one URI per mention (none when the status
/// mentions nobody). `Mutuals` has no collection on the wire and expands to
/// nothing.
pub fn canonicalize(value: &PolicyValue, ctx: &PolicyUriContext<'_>) -> Vec<String> {
    match value {
        PolicyValue::Public => vec![ACTIVITY_STREAMS_PUBLIC.to_string()],
        PolicyValue::Author => vec![ctx.author.uri.clone()],
        PolicyValue::Followers => vec![ctx.author.followers_uri.clone()],
        PolicyValue::Following => vec![ctx.author.following_uri.clone()],
        PolicyValue::Mentioned => ctx.mentions.iter().map(|a| a.uri.clone()).collect(),
        PolicyValue::Mutuals => Vec::new(),
        PolicyValue::Uri(uri) => vec![uri.clone()],
    }
}

/// Fold a single received URI back into a placeholder where it names one
/// of the author's known collections; keep it as a literal otherwise.
///
/// Same as [`internalize_all`] on a one-element list. `None` when the value
/// is not an absolute URI.
pub fn internalize(uri: &str, ctx: &PolicyUriContext<'_>) -> Option<PolicyValue> {
    internalize_all(&[uri.to_string()], ctx).into_iter().next()
}

/// Internalize a received list of URIs, dropping duplicates and values
/// that are not absolute URIs.
pub fn internalize_all(uris: &[String], ctx: &PolicyUriContext<'_>) -> Vec<PolicyValue> {
    let received: Vec<&str> = uris.iter().map(|u| u.trim()).filter(|u| !u.is_empty()).collect();
    let all_mentioned =
        !ctx.mentions.is_empty() && ctx.mentions.iter().all(|a| received.contains(&a.uri.as_str()));

    let mut values: Vec<PolicyValue> = Vec::new();
    for uri in received {
        let value = if PUBLIC_ALIASES.contains(&uri) {
            PolicyValue::Public
        } else if uri == ctx.author.uri {
            PolicyValue::Author
        } else if uri == ctx.author.followers_uri {
            PolicyValue::Followers
        } else if uri == ctx.author.following_uri {
            PolicyValue::Following
        } else if all_mentioned && ctx.mentions.iter().any(|a| a.uri == uri) {
            PolicyValue::Mentioned
        } else {
            match PolicyValue::uri(uri) {
                Ok(literal) => literal,
                Err(err) => {
                    debug!(error = %err, "Dropping received policy value");
                    continue;
                }
            }
        };
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

fn canonicalize_values(values: &[PolicyValue], ctx: &PolicyUriContext<'_>) -> Vec<String> {
    let mut uris: Vec<String> = Vec::new();
    for uri in values.iter().flat_map(|v| canonicalize(v, ctx)) {
        if !uris.contains(&uri) {
            uris.push(uri);
        }
    }
    uris
}

/// Outbound: the policy as it is sent to other servers.
pub fn canonicalize_policy(policy: &InteractionPolicy, ctx: &PolicyUriContext<'_>) -> WireInteractionPolicy {
    let policy = policy.normalized();
    let mut wire = WireInteractionPolicy::default();
    for kind in InteractionKind::ALL {
        let rules = policy.rules_for(kind);
        let always = canonicalize_values(&rules.always, ctx);
        // A URI already granted outright is not repeated as approval-only
        let approval_required = canonicalize_values(&rules.with_approval, ctx)
            .into_iter()
            .filter(|uri| !always.contains(uri))
            .collect();
        *wire.rules_for_mut(kind) = WirePolicyRules {
            always,
            approval_required,
        };
    }
    wire
}

/// Inbound: a policy received from another server, in internal form.
pub fn internalize_policy(wire: &WireInteractionPolicy, ctx: &PolicyUriContext<'_>) -> InteractionPolicy {
    let mut policy = InteractionPolicy::default();
    for kind in InteractionKind::ALL {
        let rules = wire.rules_for(kind);
        *policy.rules_for_mut(kind) = PolicyRules::new(
            internalize_all(&rules.always, ctx),
            internalize_all(&rules.approval_required, ctx),
        );
    }
    policy.normalized()
}
