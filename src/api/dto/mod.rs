//! Data Transfer Objects for REST request/response serialization.
//!
//! External JSON uses camelCase field names, the wire convention claim
//! clients already speak.

pub mod claim_dto;
pub mod giveaway_dto;

pub use claim_dto::*;
pub use giveaway_dto::*;
