// Move selection: pick up to N moves per creature, same-type first, with a
// bounded number of provider lookups per synchronization.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::db::{CatalogStore, MoveRecord};
use crate::error::StoreError;
use crate::provider::{MoveRef, ProviderClient};

pub const DEFAULT_MAX_MOVES: usize = 4;
pub const DEFAULT_FETCH_BUDGET: usize = 8;

/// How the candidate listing is permuted before scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidateOrder {
    #[default]
    Shuffled,
    /// Deterministic shuffle; the same seed yields the same order every time.
    Seeded(u64),
    /// Scan in provider order.
    AsListed,
}

impl CandidateOrder {
    pub fn permute<T>(&self, items: &mut [T]) {
        match self {
            CandidateOrder::Shuffled => items.shuffle(&mut rand::thread_rng()),
            CandidateOrder::Seeded(seed) => items.shuffle(&mut StdRng::seed_from_u64(*seed)),
            CandidateOrder::AsListed => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSettings {
    /// Cap on selected moves, and on each bucket while scanning. Values
    /// above [`DEFAULT_MAX_MOVES`] are treated as [`DEFAULT_MAX_MOVES`].
    pub max_moves: usize,
    /// Provider move lookups allowed per synchronization.
    pub fetch_budget: usize,
    pub order: CandidateOrder,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            max_moves: DEFAULT_MAX_MOVES,
            fetch_budget: DEFAULT_FETCH_BUDGET,
            order: CandidateOrder::default(),
        }
    }
}

/// A usable move found while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCandidate {
    pub move_id: i64,
    pub same_type: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Same-type moves first, then the rest.
    pub move_ids: Vec<i64>,
    /// Provider move lookups issued, failed ones included.
    pub provider_calls: usize,
}

pub struct MoveSelector<'a> {
    store: &'a dyn CatalogStore,
    provider: &'a dyn ProviderClient,
    settings: SelectionSettings,
}

impl<'a> MoveSelector<'a> {
    pub fn new(
        store: &'a dyn CatalogStore,
        provider: &'a dyn ProviderClient,
        settings: SelectionSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Choose moves for a creature of the given (lowercase) types.
    ///
    /// Moves already in the store are classified without contacting the
    /// provider. Unknown moves are fetched until the budget runs out; the
    /// qualifying ones are persisted on the way. Storage errors abort the
    /// selection, provider errors only discard that candidate.
    pub async fn select(
        &self,
        types: &[&str],
        candidates: &[MoveRef],
    ) -> Result<Selection, StoreError> {
        let cap = self.settings.max_moves.min(DEFAULT_MAX_MOVES);
        let mut order: Vec<&MoveRef> = candidates.iter().collect();
        self.settings.order.permute(&mut order);

        let mut same_type: Vec<i64> = Vec::with_capacity(cap);
        let mut other: Vec<i64> = Vec::with_capacity(cap);
        let mut seen = HashSet::new();
        let mut provider_calls = 0;

        for candidate in order {
            if same_type.len() >= cap {
                break;
            }
            let Some(move_id) = candidate.move_id() else {
                debug!(url = %candidate.url, "skipping malformed move reference");
                continue;
            };
            if !seen.insert(move_id) {
                continue;
            }

            let usable = match self.store.move_by_id(move_id).await? {
                Some(stored) => classify_stored(&stored, types),
                None => {
                    if provider_calls >= self.settings.fetch_budget {
                        debug!(move_id, "move fetch budget spent, skipping");
                        continue;
                    }
                    provider_calls += 1;
                    self.fetch_and_store(move_id, types).await?
                }
            };

            match usable {
                Some(c) if c.same_type => push_capped(&mut same_type, c.move_id, cap),
                Some(c) => push_capped(&mut other, c.move_id, cap),
                None => {}
            }
        }

        let mut move_ids = same_type;
        move_ids.extend(other);
        move_ids.truncate(cap);

        Ok(Selection {
            move_ids,
            provider_calls,
        })
    }

    async fn fetch_and_store(
        &self,
        move_id: i64,
        types: &[&str],
    ) -> Result<Option<MoveCandidate>, StoreError> {
        let payload = match self.provider.fetch_move(move_id).await {
            Ok(p) => p,
            Err(e) => {
                debug!(move_id, "discarding move: {e}");
                return Ok(None);
            }
        };
        if !payload.qualifies() {
            debug!(move_id, name = %payload.name, "discarding non-damaging move");
            return Ok(None);
        }

        let record = MoveRecord {
            id: payload.id,
            name: payload.name,
            power: payload.power.unwrap_or_default(),
            move_type: payload.move_type,
            description: payload.description,
        };
        match self.store.insert_move(&record).await {
            Ok(_) | Err(StoreError::Conflict) => {}
            Err(e) => return Err(e),
        }

        Ok(Some(MoveCandidate {
            move_id: record.id,
            same_type: matches_type(&record.move_type, types),
        }))
    }
}

fn classify_stored(stored: &MoveRecord, types: &[&str]) -> Option<MoveCandidate> {
    if stored.power <= 0 {
        return None;
    }
    Some(MoveCandidate {
        move_id: stored.id,
        same_type: matches_type(&stored.move_type, types),
    })
}

fn matches_type(move_type: &str, types: &[&str]) -> bool {
    types.iter().any(|t| t.eq_ignore_ascii_case(move_type))
}

fn push_capped(bucket: &mut Vec<i64>, id: i64, cap: usize) {
    if bucket.len() < cap {
        bucket.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_listed_keeps_order() {
        let mut items = vec![1, 2, 3, 4, 5];
        CandidateOrder::AsListed.permute(&mut items);
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_seeded_order_is_repeatable() {
        let mut a: Vec<i32> = (0..30).collect();
        let mut b: Vec<i32> = (0..30).collect();
        CandidateOrder::Seeded(7).permute(&mut a);
        CandidateOrder::Seeded(7).permute(&mut b);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffled_is_a_permutation() {
        let mut items: Vec<i32> = (0..10).collect();
        CandidateOrder::Shuffled.permute(&mut items);
        items.sort();
        assert_eq!(items, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_type_match_ignores_case() {
        assert!(matches_type("Fire", &["fire", "flying"]));
        assert!(!matches_type("water", &["fire", "flying"]));
        assert!(!matches_type("fire", &[]));
    }

    #[test]
    fn test_stored_zero_power_is_unusable() {
        let mut mv = MoveRecord {
            id: 45,
            name: "growl".into(),
            power: 0,
            move_type: "normal".into(),
            description: None,
        };
        assert_eq!(classify_stored(&mv, &["normal"]), None);

        mv.power = 40;
        assert_eq!(
            classify_stored(&mv, &["normal"]),
            Some(MoveCandidate {
                move_id: 45,
                same_type: true
            })
        );
    }

    #[test]
    fn test_default_settings() {
        let s = SelectionSettings::default();
        assert_eq!(s.max_moves, 4);
        assert_eq!(s.fetch_budget, 8);
        assert_eq!(s.order, CandidateOrder::Shuffled);
    }
}
