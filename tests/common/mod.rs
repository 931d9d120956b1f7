// Shared fixtures: an in-process provider with scripted data and call counters.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use pokedex_backend::db::{CatalogStore, Database};
use pokedex_backend::error::ProviderError;
use pokedex_backend::provider::{CreaturePayload, MovePayload, MoveRef, ProviderClient};
use pokedex_backend::selector::{CandidateOrder, SelectionSettings};
use pokedex_backend::sync::Synchronizer;

#[derive(Default)]
pub struct FakeProvider {
    creatures: HashMap<String, CreaturePayload>,
    moves: HashMap<i64, MovePayload>,
    delay: Option<Duration>,
    move_delay: Option<Duration>,
    pub creature_calls: AtomicUsize,
    pub move_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a creature under both its id and its name.
    pub fn with_creature(mut self, payload: CreaturePayload) -> Self {
        self.creatures.insert(payload.id.to_string(), payload.clone());
        self.creatures.insert(payload.name.clone(), payload);
        self
    }

    pub fn with_move(mut self, payload: MovePayload) -> Self {
        self.moves.insert(payload.id, payload);
        self
    }

    pub fn with_moves(self, payloads: impl IntoIterator<Item = MovePayload>) -> Self {
        payloads.into_iter().fold(self, |p, m| p.with_move(m))
    }

    /// Sleep before answering a creature request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep before answering a move request.
    pub fn with_move_delay(mut self, delay: Duration) -> Self {
        self.move_delay = Some(delay);
        self
    }

    pub fn creature_calls(&self) -> usize {
        self.creature_calls.load(Ordering::SeqCst)
    }

    pub fn move_calls(&self) -> usize {
        self.move_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn fetch_creature(&self, identifier: &str) -> Result<CreaturePayload, ProviderError> {
        self.creature_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.creatures
            .get(identifier)
            .cloned()
            .ok_or_else(|| ProviderError::FetchFailed {
                url: format!("fake://pokemon/{identifier}"),
                reason: "status 404 Not Found".into(),
            })
    }

    async fn fetch_move(&self, id: i64) -> Result<MovePayload, ProviderError> {
        self.move_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.move_delay {
            tokio::time::sleep(delay).await;
        }
        self.moves
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::FetchFailed {
                url: format!("fake://move/{id}/"),
                reason: "status 404 Not Found".into(),
            })
    }
}

pub fn full_stats() -> Vec<(String, i32)> {
    vec![
        ("hp".into(), 78),
        ("attack".into(), 84),
        ("defense".into(), 78),
        ("special-attack".into(), 109),
        ("special-defense".into(), 85),
        ("speed".into(), 100),
    ]
}

pub fn move_ref(id: i64) -> MoveRef {
    MoveRef::new(format!("move-{id}"), format!("https://pokeapi.co/api/v2/move/{id}/"))
}

pub fn creature(id: i64, name: &str, types: &[&str], move_ids: &[i64]) -> CreaturePayload {
    CreaturePayload {
        id,
        name: name.to_string(),
        types: types.iter().map(|t| t.to_string()).collect(),
        stats: full_stats(),
        moves: move_ids.iter().map(|id| move_ref(*id)).collect(),
        artwork_url: Some(format!("https://img.example/{id}.png")),
    }
}

pub fn damaging(id: i64, move_type: &str, power: i32) -> MovePayload {
    MovePayload {
        id,
        name: format!("move-{id}"),
        power: Some(power),
        damage_class: "physical".into(),
        move_type: move_type.into(),
        description: Some(format!("Move {id} hits hard.")),
    }
}

pub fn status_move(id: i64, move_type: &str) -> MovePayload {
    MovePayload {
        id,
        name: format!("status-{id}"),
        power: None,
        damage_class: "status".into(),
        move_type: move_type.into(),
        description: None,
    }
}

pub fn powerless(id: i64, move_type: &str) -> MovePayload {
    MovePayload {
        power: None,
        damage_class: "special".into(),
        ..status_move(id, move_type)
    }
}

pub async fn memory_db() -> Arc<Database> {
    Arc::new(Database::new("sqlite::memory:").await.unwrap())
}

pub fn settings(order: CandidateOrder) -> SelectionSettings {
    SelectionSettings {
        order,
        ..SelectionSettings::default()
    }
}

pub fn synchronizer(
    db: Arc<Database>,
    provider: Arc<FakeProvider>,
    settings: SelectionSettings,
) -> Synchronizer {
    let store: Arc<dyn CatalogStore> = db;
    let provider: Arc<dyn ProviderClient> = provider;
    Synchronizer::new(store, provider, settings)
}
