// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod event_bus;
pub mod repositories;

pub use event_bus::{DomainEvent, EventBus, EventBusError};
