use uuid::Uuid;

use crate::Actor;

/// Which user records an actor may enumerate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    All,
    Only(Uuid),
}

impl Scope {
    pub fn resolve(actor: &Actor) -> Self {
        if actor.is_admin() {
            Scope::All
        } else {
            Scope::Only(actor.id)
        }
    }

    pub fn permits(&self, id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Only(own) => *own == id,
        }
    }

    /// Filter records already loaded in memory.
    pub fn filter<T, I, F>(&self, records: I, id_of: F) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> Uuid,
    {
        records
            .into_iter()
            .filter(|record| self.permits(id_of(record)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserRecord;

    fn records() -> Vec<UserRecord> {
        (1..=4)
            .map(|n| UserRecord::new(Uuid::from_u128(n), n == 1))
            .collect()
    }

    #[test]
    fn admin_sees_everything() {
        let actor = Actor::new(Uuid::from_u128(1), true);
        let scope = Scope::resolve(&actor);
        assert_eq!(scope, Scope::All);
        assert_eq!(scope.filter(records(), |r| r.id).len(), 4);
    }

    #[test]
    fn member_sees_exactly_itself() {
        let actor = Actor::new(Uuid::from_u128(3), false);
        let scope = Scope::resolve(&actor);
        assert_eq!(scope, Scope::Only(actor.id));
        let visible = scope.filter(records(), |r| r.id);
        assert_eq!(visible, vec![UserRecord::new(Uuid::from_u128(3), false)]);
    }

    #[test]
    fn member_without_row_sees_nothing() {
        let actor = Actor::new(Uuid::from_u128(9), false);
        assert!(Scope::resolve(&actor).filter(records(), |r| r.id).is_empty());
    }
}
