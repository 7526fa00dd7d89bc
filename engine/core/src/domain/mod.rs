// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: accounts, statuses, the social graph, interaction policies
//! and the collaborator contracts the engine depends on.

pub mod account;
pub mod engine_config;
pub mod events;
pub mod policy;
pub mod relationship;
pub mod repository;
pub mod status;
pub mod visibility;
