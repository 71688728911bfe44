//! Ownership checks shared by the APIs. Authentication and role assignment happen upstream: by the time an
//! [`Actor`] reaches the engine, its id and role are trusted.
use crate::{
    db_types::{Actor, Mission, Role},
    traits::DispatchError,
};

pub fn require_admin(actor: &Actor) -> Result<(), DispatchError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DispatchError::forbidden(format!("{actor} is not an admin.")))
    }
}

/// Admins, the owning client, and the operator holding the mission.
pub fn require_participant(actor: &Actor, mission: &Mission) -> Result<(), DispatchError> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::Client => mission.client_id == actor.id,
        Role::Operator => mission.is_assigned_to(actor.id),
    };
    if allowed {
        Ok(())
    } else {
        Err(DispatchError::forbidden(format!("{actor} is not a party to mission {}.", mission.id)))
    }
}

pub fn require_self_or_admin(actor: &Actor, role: Role, id: i64) -> Result<(), DispatchError> {
    if actor.is_admin() || (actor.role == role && actor.id == id) {
        Ok(())
    } else {
        Err(DispatchError::forbidden(format!("{actor} cannot act for {role} {id}.")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookups_are_limited_to_self_or_admin() {
        assert!(require_self_or_admin(&Actor::client(4), Role::Client, 4).is_ok());
        assert!(require_self_or_admin(&Actor::client(4), Role::Client, 5).is_err());
        assert!(require_self_or_admin(&Actor::operator(4), Role::Client, 4).is_err());
        assert!(require_self_or_admin(&Actor::admin(9), Role::Operator, 4).is_ok());
        assert!(require_admin(&Actor::operator(9)).is_err());
    }
}
