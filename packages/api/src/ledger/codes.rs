//! Redemption code registry: batch generation and single-use claims.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Condition,
};

use crate::{
    cas,
    entity::{
        redemption_code,
        sea_orm_active_enums::{CodeStatus, EntryType},
    },
    ledger::error::LedgerError,
};

/// Code alphabet with the visually ambiguous characters (0/O, 1/I/L)
/// removed, so codes survive being read over the phone or off a screenshot.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Random portion of every code; ~40 bits of entropy over the alphabet.
pub const CODE_SUFFIX_LENGTH: usize = 8;

/// How many regeneration rounds a batch may take before we declare the code
/// space exhausted for this size.
const MAX_GENERATION_ROUNDS: usize = 16;

/// Parameters for one administrative generation batch. Codes are always
/// generated for a concrete owning partner, since every claim must resolve
/// the partner who earns the referral.
#[derive(Debug, Clone)]
pub struct GenerateBatch {
    pub batch_name: String,
    pub partner_id: String,
    pub count: usize,
    /// Optional human-readable prefix, e.g. `BLOOM` gives `BLOOM-7Q3K9F2M`.
    pub prefix: Option<String>,
    pub source_channel: Option<String>,
    pub expires_at: Option<chrono::NaiveDateTime>,
    pub entry_type: EntryType,
    pub quota_amount: i32,
    pub entry_price: Decimal,
}

fn random_code(rng: &mut impl Rng, prefix: Option<&str>) -> String {
    let mut code = String::with_capacity(CODE_SUFFIX_LENGTH + 8);
    if let Some(prefix) = prefix {
        code.push_str(prefix);
        code.push('-');
    }
    for _ in 0..CODE_SUFFIX_LENGTH {
        let idx = rng.random_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}

/// Generates `req.count` globally unique codes and inserts them in one
/// batch. Candidates are probed against the existing code set in bulk;
/// collisions are regenerated for a bounded number of rounds before the
/// batch fails with a generation error.
pub async fn generate_batch<C: ConnectionTrait>(
    db: &C,
    req: GenerateBatch,
) -> Result<Vec<redemption_code::Model>, LedgerError> {
    if req.count == 0 {
        return Ok(Vec::new());
    }

    let prefix = req.prefix.as_deref();
    let mut accepted: BTreeSet<String> = BTreeSet::new();
    let mut rounds = 0usize;

    while accepted.len() < req.count {
        rounds += 1;
        if rounds > MAX_GENERATION_ROUNDS {
            return Err(LedgerError::Generation(MAX_GENERATION_ROUNDS));
        }

        let mut candidates: Vec<String> = Vec::with_capacity(req.count - accepted.len());
        {
            // ThreadRng is not Send; keep it scoped so it is dropped before
            // the query await below.
            let mut rng = rand::rng();
            while candidates.len() < req.count - accepted.len() {
                let code = random_code(&mut rng, prefix);
                if !accepted.contains(&code) && !candidates.contains(&code) {
                    candidates.push(code);
                }
            }
        }

        let taken: HashSet<String> = redemption_code::Entity::find()
            .filter(redemption_code::Column::Code.is_in(candidates.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|m| m.code)
            .collect();

        for candidate in candidates {
            if !taken.contains(&candidate) {
                accepted.insert(candidate);
            }
        }
    }

    let now = Utc::now().naive_utc();
    let models: Vec<redemption_code::Model> = accepted
        .into_iter()
        .map(|code| redemption_code::Model {
            code,
            batch_name: req.batch_name.clone(),
            partner_id: req.partner_id.clone(),
            entry_type: req.entry_type,
            quota_amount: req.quota_amount,
            entry_price: req.entry_price,
            source_channel: req.source_channel.clone(),
            status: CodeStatus::Available,
            expires_at: req.expires_at,
            redeemed_by: None,
            redeemed_at: None,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let active: Vec<redemption_code::ActiveModel> = models
        .iter()
        .cloned()
        .map(redemption_code::ActiveModel::from)
        .collect();

    redemption_code::Entity::insert_many(active)
        .exec(db)
        .await
        .map_err(|err| {
            let err = LedgerError::from(err);
            // A concurrent batch beat us to one of the probed codes.
            if err.is_unique_violation() {
                LedgerError::Conflict
            } else {
                err
            }
        })?;

    tracing::info!(
        batch = %req.batch_name,
        partner_id = %req.partner_id,
        count = models.len(),
        rounds,
        "Generated redemption code batch"
    );

    Ok(models)
}

/// Pure claim precondition, split from the guarded update so it can be
/// reasoned about (and tested) without a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimCheck {
    Claimable,
    AlreadyRedeemed,
    Expired,
}

pub fn evaluate_claim(code: &redemption_code::Model, now: chrono::NaiveDateTime) -> ClaimCheck {
    match code.status {
        CodeStatus::Redeemed => ClaimCheck::AlreadyRedeemed,
        CodeStatus::Expired => ClaimCheck::Expired,
        CodeStatus::Available => match code.expires_at {
            Some(expires_at) if expires_at <= now => ClaimCheck::Expired,
            _ => ClaimCheck::Claimable,
        },
    }
}

/// Claims a code for `user_id`.
///
/// The write is a compare-and-set guarded on `status = Available` (and the
/// expiry deadline), so exactly one claimant wins under concurrency; every
/// loser gets a deterministic business error.
///
/// Claiming an expired code only returns `Expired` here; the persisted
/// `Available -> Expired` transition is the caller's follow-up via
/// [`mark_expired`]. A claim usually runs inside a larger redemption
/// transaction, and a write issued on that transaction would be rolled
/// back along with the failure it accompanies.
pub async fn claim<C: ConnectionTrait>(
    db: &C,
    code: &str,
    user_id: &str,
) -> Result<redemption_code::Model, LedgerError> {
    let now = Utc::now().naive_utc();

    let set = redemption_code::ActiveModel {
        status: Set(CodeStatus::Redeemed),
        redeemed_by: Set(Some(user_id.to_string())),
        redeemed_at: Set(Some(now)),
        updated_at: Set(now),
        ..Default::default()
    };
    let guard = Condition::all()
        .add(redemption_code::Column::Code.eq(code))
        .add(redemption_code::Column::Status.eq(CodeStatus::Available))
        .add(
            Condition::any()
                .add(redemption_code::Column::ExpiresAt.is_null())
                .add(redemption_code::Column::ExpiresAt.gt(now)),
        );

    if cas::transition::<redemption_code::Entity, _>(db, set, guard)
        .await?
        .won()
    {
        return redemption_code::Entity::find_by_id(code)
            .one(db)
            .await?
            .ok_or(LedgerError::NotFound("redemption code"));
    }

    // Lost the update; disambiguate from the row as it stands now.
    let Some(row) = redemption_code::Entity::find_by_id(code).one(db).await? else {
        return Err(LedgerError::NotFound("redemption code"));
    };

    match evaluate_claim(&row, now) {
        ClaimCheck::AlreadyRedeemed => Err(LedgerError::AlreadyRedeemed),
        ClaimCheck::Expired => Err(LedgerError::Expired),
        // Row reads as claimable but the guarded update missed it: a racing
        // writer is in flight. Treat as an ordinary lost race.
        ClaimCheck::Claimable => Err(LedgerError::Conflict),
    }
}

/// Which failed claims leave a follow-up write behind. Only expiry does:
/// the terminal `Expired` status must survive the rollback of the
/// transaction the claim failed in.
pub fn requires_expiry_mark(err: &LedgerError) -> bool {
    matches!(err, LedgerError::Expired)
}

/// `Available -> Expired`, guarded the same way as a claim so it can never
/// clobber a concurrent successful redemption. Run on the pool, not on a
/// transaction that is about to abort.
pub async fn mark_expired<C: ConnectionTrait>(db: &C, code: &str) -> Result<(), LedgerError> {
    let now = Utc::now().naive_utc();
    let set = redemption_code::ActiveModel {
        status: Set(CodeStatus::Expired),
        updated_at: Set(now),
        ..Default::default()
    };
    let guard = Condition::all()
        .add(redemption_code::Column::Code.eq(code))
        .add(redemption_code::Column::Status.eq(CodeStatus::Available));
    cas::transition::<redemption_code::Entity, _>(db, set, guard).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code_fixture(status: CodeStatus, expires_at: Option<chrono::NaiveDateTime>) -> redemption_code::Model {
        let now = Utc::now().naive_utc();
        redemption_code::Model {
            code: "BLOOM-7Q3K9F2M".into(),
            batch_name: "launch".into(),
            partner_id: "partner_1".into(),
            entry_type: EntryType::Free,
            quota_amount: 10,
            entry_price: Decimal::ZERO,
            source_channel: None,
            status,
            expires_at,
            redeemed_by: None,
            redeemed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_alphabet_excludes_ambiguous_characters() {
        for forbidden in [b'0', b'O', b'1', b'I', b'L'] {
            assert!(
                !CODE_ALPHABET.contains(&forbidden),
                "alphabet must not contain {}",
                forbidden as char
            );
        }
    }

    #[test]
    fn test_random_code_shape() {
        let mut rng = rand::rng();
        let bare = random_code(&mut rng, None);
        assert_eq!(bare.len(), CODE_SUFFIX_LENGTH);
        assert!(bare.bytes().all(|b| CODE_ALPHABET.contains(&b)));

        let prefixed = random_code(&mut rng, Some("BLOOM"));
        assert!(prefixed.starts_with("BLOOM-"));
        assert_eq!(prefixed.len(), "BLOOM-".len() + CODE_SUFFIX_LENGTH);
    }

    #[test]
    fn test_available_code_is_claimable() {
        let now = Utc::now().naive_utc();
        let code = code_fixture(CodeStatus::Available, Some(now + Duration::days(1)));
        assert_eq!(evaluate_claim(&code, now), ClaimCheck::Claimable);
    }

    #[test]
    fn test_available_code_without_deadline_is_claimable() {
        let now = Utc::now().naive_utc();
        let code = code_fixture(CodeStatus::Available, None);
        assert_eq!(evaluate_claim(&code, now), ClaimCheck::Claimable);
    }

    #[test]
    fn test_past_deadline_reads_as_expired() {
        let now = Utc::now().naive_utc();
        let code = code_fixture(CodeStatus::Available, Some(now - Duration::minutes(1)));
        assert_eq!(evaluate_claim(&code, now), ClaimCheck::Expired);
    }

    #[test]
    fn test_only_expiry_needs_a_follow_up_write() {
        assert!(requires_expiry_mark(&LedgerError::Expired));
        assert!(!requires_expiry_mark(&LedgerError::AlreadyRedeemed));
        assert!(!requires_expiry_mark(&LedgerError::AlreadyReferred));
        assert!(!requires_expiry_mark(&LedgerError::Conflict));
        assert!(!requires_expiry_mark(&LedgerError::NotFound("redemption code")));
    }

    #[test]
    fn test_redeemed_and_expired_are_terminal() {
        let now = Utc::now().naive_utc();
        let redeemed = code_fixture(CodeStatus::Redeemed, None);
        assert_eq!(evaluate_claim(&redeemed, now), ClaimCheck::AlreadyRedeemed);

        let expired = code_fixture(CodeStatus::Expired, None);
        assert_eq!(evaluate_claim(&expired, now), ClaimCheck::Expired);
    }
}
