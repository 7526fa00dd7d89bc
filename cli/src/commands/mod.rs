// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the fedipol CLI

pub mod config;
pub mod evaluate;
pub mod policy;

pub use self::config::ConfigCommand;
pub use self::evaluate::EvaluateArgs;
pub use self::policy::PolicyCommand;
