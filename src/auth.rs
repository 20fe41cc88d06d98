//! Delegated authority over positions.
//!
//! Authorization is a plain relation: `(owner, actor) -> bool`. An owner may
//! let an actor withdraw, borrow or pull collateral on their behalf. Acting on
//! your own position never needs a grant.

use crate::types::AccountId;
use std::collections::HashSet;

pub trait Authorizer {
    fn is_authorized(&self, owner: AccountId, actor: AccountId) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationRegistry {
    grants: HashSet<(AccountId, AccountId)>,
}

impl AuthorizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants or revokes. Returns whether the relation changed.
    pub fn set(&mut self, owner: AccountId, actor: AccountId, authorized: bool) -> bool {
        if authorized {
            self.grants.insert((owner, actor))
        } else {
            self.grants.remove(&(owner, actor))
        }
    }
}

impl Authorizer for AuthorizationRegistry {
    fn is_authorized(&self, owner: AccountId, actor: AccountId) -> bool {
        owner == actor || self.grants.contains(&(owner, actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_action_needs_no_grant() {
        let registry = AuthorizationRegistry::new();
        assert!(registry.is_authorized(AccountId(1), AccountId(1)));
        assert!(!registry.is_authorized(AccountId(1), AccountId(2)));
    }

    #[test]
    fn grant_is_directional_and_revocable() {
        let mut registry = AuthorizationRegistry::new();
        assert!(registry.set(AccountId(1), AccountId(2), true));
        assert!(!registry.set(AccountId(1), AccountId(2), true));

        assert!(registry.is_authorized(AccountId(1), AccountId(2)));
        assert!(!registry.is_authorized(AccountId(2), AccountId(1)));

        assert!(registry.set(AccountId(1), AccountId(2), false));
        assert!(!registry.is_authorized(AccountId(1), AccountId(2)));
    }
}
