// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! # fedipol
//!
//! Interaction policy and relationship resolution engine for federated
//! statuses. Decides whether a Like, Reply or Announce by a requesting actor
//! is forbidden, permitted pending approval, or permitted outright.
//!
//! # Architecture
//!
//! - **domain** - policy model, social graph types, collaborator traits
//! - **application** - policy value resolution, evaluation, URI translation,
//!   relationship mutations
//! - **infrastructure** - in-memory and PostgreSQL stores, event bus

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
