// SPDX-License-Identifier: AGPL-3.0-or-later

//! Form lifecycle orchestration.
//!
//! Turns human-language form definitions into metadata rows plus
//! materialized tables. Identifier resolution happens once when an entity
//! is created, afterwards only the stored identifiers are used.
mod errors;
mod service;

pub use errors::FormError;
pub use service::FormService;
