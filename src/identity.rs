//! Credential verification at connection establishment
//!
//! Issuing credentials is handled elsewhere; the relay only needs to turn a
//! presented token into a participant identity.

use crate::error::IdentityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Who is on the other end of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub participant_id: String,
    pub display_name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, IdentityError>;
}

/// Identity provider backed by a fixed token table
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenIdentity {
    pub fn new(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn verify(&self, credential: &str) -> Result<Identity, IdentityError> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or(IdentityError::Unauthenticated)
    }
}
