// Catalog synchronization: storage is an authoritative cache in front of the
// provider. A miss triggers fetch → validate → select moves → insert the
// creature with its links, then the stored record is read back and returned.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::db::{CatalogStore, CreatureRecord, MoveRecord};
use crate::error::{StoreError, SyncError};
use crate::metrics;
use crate::provider::ProviderClient;
use crate::selector::{MoveSelector, SelectionSettings};
use crate::stats::{self, ValidatedCreature};

/// A creature identifier as given by a caller: numeric id or name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Id(i64),
    /// Lowercased.
    Name(String),
}

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SyncError::InvalidIdentifier(raw.to_string()));
        }
        Ok(match trimmed.parse::<i64>() {
            Ok(id) => Identifier::Id(id),
            Err(_) => Identifier::Name(trimmed.to_lowercase()),
        })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{id}"),
            Identifier::Name(name) => write!(f, "{name}"),
        }
    }
}

pub struct Synchronizer {
    store: Arc<dyn CatalogStore>,
    provider: Arc<dyn ProviderClient>,
    settings: SelectionSettings,
}

impl Synchronizer {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        provider: Arc<dyn ProviderClient>,
        settings: SelectionSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Return the stored creature, synchronizing it from the provider on a miss.
    pub async fn resolve(&self, identifier: &str) -> Result<CreatureRecord, SyncError> {
        let ident = Identifier::parse(identifier)?;

        if let Some(record) = self.lookup(&ident).await? {
            metrics::CATALOG_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
            debug!(%ident, "catalog hit");
            return Ok(record);
        }
        metrics::CATALOG_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();

        let timer = metrics::SYNC_DURATION_SECONDS.start_timer();
        let result = self.synchronize(&ident).await;
        timer.observe_duration();

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::SYNC_TOTAL.with_label_values(&[outcome]).inc();
        result
    }

    /// Like [`resolve`](Self::resolve), but gives up after `limit`. The
    /// in-flight provider and storage calls are dropped with the future.
    pub async fn resolve_with_timeout(
        &self,
        identifier: &str,
        limit: Duration,
    ) -> Result<CreatureRecord, SyncError> {
        with_deadline(identifier, limit, self.resolve(identifier)).await
    }

    /// Resolve a creature and return it together with its linked moves.
    pub async fn moves_for(
        &self,
        identifier: &str,
    ) -> Result<(CreatureRecord, Vec<MoveRecord>), SyncError> {
        let creature = self.resolve(identifier).await?;
        let moves = self.store.moves_for_creature(creature.id).await?;
        Ok((creature, moves))
    }

    /// [`moves_for`](Self::moves_for) bounded by `limit`.
    pub async fn moves_for_with_timeout(
        &self,
        identifier: &str,
        limit: Duration,
    ) -> Result<(CreatureRecord, Vec<MoveRecord>), SyncError> {
        with_deadline(identifier, limit, self.moves_for(identifier)).await
    }

    /// Resolve each identifier in turn, logging failures. Returns how many resolved.
    pub async fn prefetch(&self, identifiers: &[String]) -> usize {
        let mut resolved = 0;
        for identifier in identifiers {
            match self.resolve(identifier).await {
                Ok(record) => {
                    info!(id = record.id, name = %record.name, "prefetched pokemon");
                    resolved += 1;
                }
                Err(e) => warn!("prefetch of {identifier:?} failed: {e}"),
            }
        }
        resolved
    }

    async fn lookup(&self, ident: &Identifier) -> Result<Option<CreatureRecord>, StoreError> {
        match ident {
            Identifier::Id(id) => self.store.creature_by_id(*id).await,
            Identifier::Name(name) => self.store.creature_by_name(name).await,
        }
    }

    async fn synchronize(&self, ident: &Identifier) -> Result<CreatureRecord, SyncError> {
        let payload = self.provider.fetch_creature(&ident.to_string()).await?;
        let validated = stats::validate(payload)?;
        let id = validated.record.id;

        // Selected moves may outlive a failed sync; the creature row never
        // exists without its links.
        let move_ids = self.select_moves(&validated).await?;
        let inserted = match self
            .store
            .insert_creature_with_links(&validated.record, &move_ids)
            .await
        {
            Ok(inserted) => inserted,
            Err(StoreError::Conflict) => false,
            Err(e) => return Err(e.into()),
        };

        if inserted {
            info!(id, name = %validated.record.name, moves = move_ids.len(), "synchronized pokemon");
        } else {
            // Whoever inserted the row first owns the move set.
            debug!(id, "pokemon already in catalog, keeping its moves");
        }

        self.store
            .creature_by_id(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(ident.to_string()))
    }

    async fn select_moves(&self, creature: &ValidatedCreature) -> Result<Vec<i64>, SyncError> {
        let types = creature.record.types();
        let selector = MoveSelector::new(&*self.store, &*self.provider, self.settings);
        let selection = selector.select(&types, &creature.moves).await?;
        debug!(
            id = creature.record.id,
            candidates = creature.moves.len(),
            provider_calls = selection.provider_calls,
            "selected moves {:?}",
            selection.move_ids
        );
        Ok(selection.move_ids)
    }
}

async fn with_deadline<T>(
    identifier: &str,
    limit: Duration,
    work: impl Future<Output = Result<T, SyncError>>,
) -> Result<T, SyncError> {
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => {
            metrics::SYNC_TOTAL.with_label_values(&["timeout"]).inc();
            Err(SyncError::TimedOut(identifier.trim().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_parse() {
        assert_eq!(Identifier::parse("25").unwrap(), Identifier::Id(25));
        assert_eq!(Identifier::parse(" 135 ").unwrap(), Identifier::Id(135));
        assert_eq!(
            Identifier::parse("Jolteon").unwrap(),
            Identifier::Name("jolteon".into())
        );
        assert_eq!(
            Identifier::parse("mr-mime").unwrap(),
            Identifier::Name("mr-mime".into())
        );
    }

    #[test]
    fn test_identifier_rejects_blank() {
        assert!(matches!(
            Identifier::parse("   "),
            Err(SyncError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Identifier::parse(""),
            Err(SyncError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(Identifier::Id(7).to_string(), "7");
        assert_eq!(Identifier::Name("squirtle".into()).to_string(), "squirtle");
    }
}
