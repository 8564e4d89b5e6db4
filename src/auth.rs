use crate::core::{Actor, ActorId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Supplies the authenticated actor behind a lock operation.
///
/// Returning `None` makes every lock operation fail with `NotAuthenticated`.
pub trait ActorResolver: Send + Sync {
    fn current_actor(&self) -> Option<ActorId>;
}

/// Resolved caller identity for one request or one client session
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    actor: Option<Actor>,
}

impl AuthContext {
    pub fn authenticated(actor: Actor) -> Self {
        Self { actor: Some(actor) }
    }

    pub fn anonymous() -> Self {
        Self { actor: None }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }
}

impl ActorResolver for AuthContext {
    fn current_actor(&self) -> Option<ActorId> {
        self.actor.as_ref().map(|actor| actor.id.clone())
    }
}

/// Registry of known actors and their display identities
///
/// Token issuance happens elsewhere; this only maps an already trusted id to
/// the identity shown in "locked by" labels.
pub struct ActorDirectory {
    actors: RwLock<HashMap<ActorId, Actor>>,
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_actors(actors: impl IntoIterator<Item = Actor>) -> Self {
        let map = actors
            .into_iter()
            .map(|actor| (actor.id.clone(), actor))
            .collect();
        Self {
            actors: RwLock::new(map),
        }
    }

    /// Adds or replaces an actor. Returns `true` if the id was new.
    pub async fn register(&self, actor: Actor) -> bool {
        let mut actors = self.actors.write().await;
        actors.insert(actor.id.clone(), actor).is_none()
    }

    pub async fn remove(&self, id: &ActorId) -> bool {
        let mut actors = self.actors.write().await;
        actors.remove(id).is_some()
    }

    pub async fn get(&self, id: &ActorId) -> Option<Actor> {
        let actors = self.actors.read().await;
        actors.get(id).cloned()
    }

    /// Resolves a raw caller id into an auth context; unknown ids are anonymous.
    pub async fn authenticate(&self, raw_id: Option<&str>) -> AuthContext {
        let Some(raw_id) = raw_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return AuthContext::anonymous();
        };
        match self.get(&ActorId::from(raw_id)).await {
            Some(actor) => AuthContext::authenticated(actor),
            None => AuthContext::anonymous(),
        }
    }

    /// Display identity, falling back to the raw id for unknown actors.
    pub async fn display_of(&self, id: &ActorId) -> String {
        self.get(id)
            .await
            .map(|actor| actor.display)
            .unwrap_or_else(|| id.to_string())
    }

    pub async fn len(&self) -> usize {
        self.actors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actors.read().await.is_empty()
    }
}

impl Default for ActorDirectory {
    fn default() -> Self {
        Self::new()
    }
}
