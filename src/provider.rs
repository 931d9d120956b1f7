// Read-only client for the external creature/move provider (PokeAPI-shaped JSON).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::metrics;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct PokemonResponse {
    id: i64,
    name: String,
    #[serde(default)]
    types: Vec<PokemonTypeSlot>,
    #[serde(default)]
    stats: Vec<PokemonStatSlot>,
    #[serde(default)]
    moves: Vec<PokemonMoveSlot>,
    #[serde(default)]
    sprites: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PokemonTypeSlot {
    #[serde(default)]
    slot: u8,
    #[serde(rename = "type")]
    type_info: NamedResource,
}

#[derive(Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: i32,
    stat: NamedResource,
}

#[derive(Debug, Deserialize)]
struct PokemonMoveSlot {
    #[serde(rename = "move")]
    move_info: NamedResource,
}

#[derive(Debug, Deserialize)]
struct MoveResponse {
    id: i64,
    name: String,
    power: Option<i32>,
    damage_class: Option<NamedResource>,
    #[serde(rename = "type")]
    type_info: NamedResource,
    #[serde(default)]
    flavor_text_entries: Vec<FlavorTextEntry>,
}

#[derive(Debug, Deserialize)]
struct FlavorTextEntry {
    flavor_text: String,
    language: NamedResource,
}

// ── Decoded payloads ─────────────────────────────────────────────────

/// A provider move reference. The id lives in the final path segment of `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRef {
    pub name: String,
    pub url: String,
}

impl MoveRef {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Parse the move id out of a URL like `.../move/85/`. `None` if malformed.
    pub fn move_id(&self) -> Option<i64> {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse::<i64>().ok())
            .filter(|id| *id > 0)
    }
}

/// Creature data as decoded from the provider. Stats and types may be
/// incomplete; `stats::validate` decides whether it can be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CreaturePayload {
    pub id: i64,
    pub name: String,
    /// Lowercase, ordered by provider slot.
    pub types: Vec<String>,
    /// (stat name, base value) in whatever order the provider sent them.
    pub stats: Vec<(String, i32)>,
    pub moves: Vec<MoveRef>,
    pub artwork_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovePayload {
    pub id: i64,
    pub name: String,
    pub power: Option<i32>,
    pub damage_class: String,
    pub move_type: String,
    pub description: Option<String>,
}

impl MovePayload {
    /// Damaging moves only: positive power and not a status move.
    pub fn qualifies(&self) -> bool {
        self.power.map(|p| p > 0).unwrap_or(false) && self.damage_class != "status"
    }
}

impl From<PokemonResponse> for CreaturePayload {
    fn from(resp: PokemonResponse) -> Self {
        let mut slots = resp.types;
        slots.sort_by_key(|t| t.slot);
        let artwork_url = artwork_from_sprites(&resp.sprites);
        CreaturePayload {
            id: resp.id,
            name: resp.name.to_lowercase(),
            types: slots
                .into_iter()
                .map(|t| t.type_info.name.to_lowercase())
                .collect(),
            stats: resp
                .stats
                .into_iter()
                .map(|s| (s.stat.name, s.base_stat))
                .collect(),
            moves: resp
                .moves
                .into_iter()
                .map(|m| MoveRef::new(m.move_info.name, m.move_info.url))
                .collect(),
            artwork_url,
        }
    }
}

impl From<MoveResponse> for MovePayload {
    fn from(resp: MoveResponse) -> Self {
        let description = latest_english_flavor_text(&resp.flavor_text_entries);
        MovePayload {
            id: resp.id,
            name: resp.name,
            power: resp.power,
            damage_class: resp
                .damage_class
                .map(|d| d.name.to_lowercase())
                .unwrap_or_default(),
            move_type: resp.type_info.name.to_lowercase(),
            description,
        }
    }
}

/// Official artwork if present, otherwise the default front sprite.
fn artwork_from_sprites(sprites: &serde_json::Value) -> Option<String> {
    sprites
        .pointer("/other/official-artwork/front_default")
        .and_then(|v| v.as_str())
        .or_else(|| sprites.get("front_default").and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Last English entry wins; entries are listed oldest game first.
fn latest_english_flavor_text(entries: &[FlavorTextEntry]) -> Option<String> {
    entries
        .iter()
        .rev()
        .find(|e| e.language.name == "en")
        .map(|e| e.flavor_text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

// ── Client ───────────────────────────────────────────────────────────

/// Source of creature and move definitions. Has no knowledge of storage.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn fetch_creature(&self, identifier: &str) -> Result<CreaturePayload, ProviderError>;

    async fn fetch_move(&self, id: i64) -> Result<MovePayload, ProviderError>;
}

/// HTTP implementation backed by reqwest.
pub struct HttpProvider {
    client: Client,
    base_url: Url,
}

impl HttpProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::Config(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Config(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each percent-encoded as one segment.
    fn endpoint_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<T, ProviderError> {
        debug!(%url, "provider request");
        let result = self.send(url).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::PROVIDER_REQUESTS_TOTAL
            .with_label_values(&[endpoint, outcome])
            .inc();
        result
    }

    async fn send<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        let failed = |reason: String| ProviderError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                failed("request timed out".to_string())
            } else {
                failed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("status {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| failed(format!("decode error: {e}")))
    }
}

#[async_trait]
impl ProviderClient for HttpProvider {
    async fn fetch_creature(&self, identifier: &str) -> Result<CreaturePayload, ProviderError> {
        let name = identifier.trim().to_lowercase();
        let url = self.endpoint_url(&["pokemon", &name]);
        if matches!(name.as_str(), "" | "." | "..") {
            return Err(ProviderError::FetchFailed {
                url: url.to_string(),
                reason: format!("invalid identifier {name:?}"),
            });
        }
        let resp: PokemonResponse = self.get_json("pokemon", url).await?;
        Ok(resp.into())
    }

    async fn fetch_move(&self, id: i64) -> Result<MovePayload, ProviderError> {
        let id = id.to_string();
        let url = self.endpoint_url(&["move", &id, ""]);
        let resp: MoveResponse = self.get_json("move", url).await?;
        Ok(resp.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(base: &str) -> HttpProvider {
        HttpProvider::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let p = provider("https://pokeapi.co/api/v2");
        assert_eq!(
            p.endpoint_url(&["pokemon", "mr-mime"]).as_str(),
            "https://pokeapi.co/api/v2/pokemon/mr-mime"
        );
        assert_eq!(
            p.endpoint_url(&["move", "85", ""]).as_str(),
            "https://pokeapi.co/api/v2/move/85/"
        );

        let trailing = provider("https://pokeapi.co/api/v2/");
        assert_eq!(
            trailing.endpoint_url(&["pokemon", "25"]).as_str(),
            "https://pokeapi.co/api/v2/pokemon/25"
        );
    }

    #[test]
    fn test_identifier_stays_one_path_segment() {
        let p = provider("https://pokeapi.co/api/v2");
        let url = p.endpoint_url(&["pokemon", "a/../move/1"]);
        assert_eq!(url.as_str(), "https://pokeapi.co/api/v2/pokemon/a%2F..%2Fmove%2F1");
        assert_eq!(url.path_segments().map(|s| s.count()), Some(4));
    }

    #[test]
    fn test_bad_base_url_is_rejected() {
        for base in ["not a url", "mailto:ash@example.com"] {
            assert!(matches!(
                HttpProvider::new(base, Duration::from_secs(1)),
                Err(ProviderError::Config(_))
            ));
        }
    }

    #[test]
    fn test_move_id_from_url() {
        let m = MoveRef::new("thunderbolt", "https://pokeapi.co/api/v2/move/85/");
        assert_eq!(m.move_id(), Some(85));

        let m = MoveRef::new("thunderbolt", "https://pokeapi.co/api/v2/move/85");
        assert_eq!(m.move_id(), Some(85));

        assert_eq!(MoveRef::new("x", "https://pokeapi.co/api/v2/move/").move_id(), None);
        assert_eq!(MoveRef::new("x", "https://pokeapi.co/api/v2/move/abc/").move_id(), None);
        assert_eq!(MoveRef::new("x", "").move_id(), None);
    }

    #[test]
    fn test_decode_pokemon_orders_types_by_slot() {
        let raw = json!({
            "id": 6,
            "name": "Charizard",
            "types": [
                { "slot": 2, "type": { "name": "Flying", "url": "" } },
                { "slot": 1, "type": { "name": "fire", "url": "" } }
            ],
            "stats": [
                { "base_stat": 100, "stat": { "name": "speed" } },
                { "base_stat": 78, "stat": { "name": "hp" } }
            ],
            "moves": [
                { "move": { "name": "ember", "url": "https://pokeapi.co/api/v2/move/52/" } }
            ],
            "sprites": {
                "front_default": "front.png",
                "other": { "official-artwork": { "front_default": "art.png" } }
            }
        });
        let resp: PokemonResponse = serde_json::from_value(raw).unwrap();
        let payload = CreaturePayload::from(resp);

        assert_eq!(payload.name, "charizard");
        assert_eq!(payload.types, vec!["fire", "flying"]);
        assert_eq!(payload.stats[0], ("speed".to_string(), 100));
        assert_eq!(payload.moves[0].move_id(), Some(52));
        assert_eq!(payload.artwork_url.as_deref(), Some("art.png"));
    }

    #[test]
    fn test_artwork_falls_back_to_front_sprite() {
        let sprites = json!({ "front_default": "front.png", "other": {} });
        assert_eq!(artwork_from_sprites(&sprites).as_deref(), Some("front.png"));
        assert_eq!(artwork_from_sprites(&serde_json::Value::Null), None);
    }

    #[test]
    fn test_decode_move_picks_last_english_flavor_text() {
        let raw = json!({
            "id": 85,
            "name": "thunderbolt",
            "power": 90,
            "damage_class": { "name": "special" },
            "type": { "name": "electric" },
            "flavor_text_entries": [
                { "flavor_text": "Old text.", "language": { "name": "en" } },
                { "flavor_text": "Neuer Text.", "language": { "name": "de" } },
                { "flavor_text": "A strong\nelectric\u{c}blast.", "language": { "name": "en" } },
                { "flavor_text": "Texte.", "language": { "name": "fr" } }
            ]
        });
        let resp: MoveResponse = serde_json::from_value(raw).unwrap();
        let payload = MovePayload::from(resp);

        assert_eq!(payload.description.as_deref(), Some("A strong electric blast."));
        assert!(payload.qualifies());
    }

    #[test]
    fn test_status_and_powerless_moves_do_not_qualify() {
        let base = MovePayload {
            id: 1,
            name: "growl".into(),
            power: None,
            damage_class: "status".into(),
            move_type: "normal".into(),
            description: None,
        };
        assert!(!base.qualifies());

        let powered_status = MovePayload {
            power: Some(40),
            ..base.clone()
        };
        assert!(!powered_status.qualifies());

        let zero_power = MovePayload {
            power: Some(0),
            damage_class: "physical".into(),
            ..base.clone()
        };
        assert!(!zero_power.qualifies());

        let physical = MovePayload {
            power: Some(40),
            damage_class: "physical".into(),
            ..base
        };
        assert!(physical.qualifies());
    }
}
