//! The fixed set of roles taking part in a debate.

use std::collections::HashSet;

use crate::error::DebateError;
use crate::participant::{Role, Stance};

/// Read-only mapping from stance to the roles that may speak with it.
#[derive(Debug, Clone)]
pub struct SpeakerRegistry {
    roles: Vec<Role>,
}

impl SpeakerRegistry {
    /// Build a registry; role names must be unique and there must be at
    /// least one role.
    pub fn new(roles: Vec<Role>) -> Result<Self, DebateError> {
        if roles.is_empty() {
            return Err(DebateError::EmptyRegistry);
        }

        let mut names = HashSet::new();
        for role in &roles {
            if !names.insert(role.name.as_str()) {
                return Err(DebateError::DuplicateRole(role.name.clone()));
            }
        }

        Ok(Self { roles })
    }

    /// Every registered role, in registration order.
    pub fn all_roles(&self) -> &[Role] {
        &self.roles
    }

    /// All roles with `stance`. Errors when there are none.
    pub fn roles_for_stance(&self, stance: Stance) -> Result<Vec<&Role>, DebateError> {
        let roles = self.pool(&[stance]);
        if roles.is_empty() {
            return Err(DebateError::MissingStance(stance));
        }
        Ok(roles)
    }

    /// Roles whose stance is any of `stances`. May be empty.
    pub fn pool(&self, stances: &[Stance]) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|r| stances.contains(&r.stance))
            .collect()
    }
}
