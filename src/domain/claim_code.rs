//! Scannable claim-code artifact returned at pool creation.
//!
//! The ledger only produces an opaque token encoding the pool id;
//! rendering it as a QR image (or anything else scannable) is an
//! external concern.

use std::fmt;

use serde::Serialize;

use super::PoolId;

/// Opaque claim token for a pool, e.g. `giveaway://claim/<pool-uuid>`.
///
/// Clients scan or follow the token, extract the pool id, and submit a
/// claim against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct ClaimCode(String);

impl ClaimCode {
    /// URI scheme prefix of every claim code.
    pub const PREFIX: &'static str = "giveaway://claim/";

    /// Builds the claim code for a pool.
    #[must_use]
    pub fn for_pool(pool_id: PoolId) -> Self {
        Self(format!("{}{pool_id}", Self::PREFIX))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn code_embeds_pool_id() {
        let pool_id = PoolId::new();
        let code = ClaimCode::for_pool(pool_id);
        assert!(code.as_str().starts_with(ClaimCode::PREFIX));
        assert!(code.as_str().ends_with(&pool_id.to_string()));
    }

    #[test]
    fn serializes_as_plain_string() {
        let code = ClaimCode::for_pool(PoolId::new());
        let json = serde_json::to_string(&code).unwrap_or_default();
        assert!(json.starts_with("\"giveaway://claim/"));
    }
}
