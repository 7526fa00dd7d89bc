// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod interaction_policy;
pub mod policy_mapper;
pub mod policy_resolver;
pub mod relationship;
pub mod repository_factory;

// Re-export services for convenience
pub use interaction_policy::{
    InteractionError, InteractionPermissions, InteractionPolicyService, StandardInteractionPolicyService,
};
pub use policy_mapper::{PolicyUriContext, WireInteractionPolicy, ACTIVITY_STREAMS_PUBLIC};
pub use policy_resolver::{PolicyValueResolver, Requester};
pub use relationship::{FollowOutcome, RelationshipError, RelationshipService};
