//! Named compare-and-set over status columns.
//!
//! Both the redemption registry and the withdrawal processor serialize
//! their hot transitions the same way: an `UPDATE ... WHERE status = <expected>`
//! whose affected-row count tells the caller whether it won. Keeping that in
//! one place makes the contention boundary explicit instead of burying it in
//! ad-hoc `update_many` calls.

use sea_orm::{
    ConnectionTrait, EntityTrait, QueryFilter,
    sea_query::{Condition, IntoCondition},
};

/// Outcome of a guarded transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// This caller's update applied to `rows` rows (at least one).
    Won { rows: u64 },
    /// Another writer got there first; nothing was changed.
    Lost,
}

impl Transition {
    pub fn won(&self) -> bool {
        matches!(self, Transition::Won { .. })
    }
}

/// Applies `set` to the rows matching `guard`, reporting whether any row
/// was actually updated. The guard must include the expected current
/// status, which is what makes the update a compare-and-set.
pub async fn transition<E, C>(
    conn: &C,
    set: E::ActiveModel,
    guard: impl IntoCondition,
) -> Result<Transition, sea_orm::DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let guard: Condition = guard.into_condition();
    let result = E::update_many().set(set).filter(guard).exec(conn).await?;
    if result.rows_affected == 0 {
        Ok(Transition::Lost)
    } else {
        Ok(Transition::Won {
            rows: result.rows_affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_won_carries_row_count() {
        let t = Transition::Won { rows: 3 };
        assert!(t.won());
        assert!(!Transition::Lost.won());
    }
}
