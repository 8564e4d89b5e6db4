// ============================================================================
// Lock Service
// ============================================================================

use crate::auth::{ActorDirectory, ActorResolver};
use crate::config::LockConfig;
use crate::core::{
    Actor, ActorId, Clock, Lease, LeaseKey, LeaseView, LockError, LockResult, Result,
};
use crate::storage::{LeaseStore, RecordStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Grants, renews and releases edit leases.
///
/// Holds no state of its own besides its collaborators: every decision is a
/// read-evaluate-write on a single lease row performed inside
/// [`LeaseStore::transact`], so concurrent callers on the same key are applied
/// in a total order and callers on different keys never wait on each other.
pub struct LockService {
    leases: Arc<LeaseStore>,
    records: Arc<dyn RecordStore>,
    directory: Arc<ActorDirectory>,
    clock: Arc<dyn Clock>,
    config: LockConfig,
}

impl LockService {
    /// Fails with `InvError::Config` if `config` does not validate.
    pub fn new(
        leases: Arc<LeaseStore>,
        records: Arc<dyn RecordStore>,
        directory: Arc<ActorDirectory>,
        clock: Arc<dyn Clock>,
        config: LockConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            leases,
            records,
            directory,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn lease_store(&self) -> &Arc<LeaseStore> {
        &self.leases
    }

    pub fn directory(&self) -> &Arc<ActorDirectory> {
        &self.directory
    }

    /// Takes or refreshes the lease on `key` for the calling actor.
    ///
    /// Covers first acquire, renew-by-reacquire and reclaim of an expired
    /// lease. Fails with `Conflict` only while another actor's lease is active.
    pub async fn acquire(&self, auth: &dyn ActorResolver, key: &LeaseKey) -> LockResult<Lease> {
        let actor = self.authorize(auth, key).await?;
        let ttl = self.config.lease_ttl_chrono();

        let result = self
            .leases
            .transact(key, |entry| {
                let now = self.clock.now();
                if let Some(lease) = entry.get_mut() {
                    if lease.is_held_by(&actor) {
                        lease.expires_at = now + ttl;
                        return Ok((lease.clone(), false));
                    }
                    if lease.is_active(now) {
                        return Err(LockError::Conflict);
                    }
                }

                // Unlocked, or reclaim of a lapsed lease
                let lease = Lease {
                    key: key.clone(),
                    holder: actor.clone(),
                    acquired_at: now,
                    expires_at: now + ttl,
                    fencing_token: entry.issue_fencing_token(),
                };
                entry.put(lease.clone());
                Ok((lease, true))
            })
            .await;

        match &result {
            Ok((lease, true)) => info!(
                key = %key,
                actor = %actor,
                fencing_token = lease.fencing_token,
                "lease granted"
            ),
            Ok((_, false)) => debug!(key = %key, actor = %actor, "lease refreshed by reacquire"),
            Err(err) => debug!(key = %key, actor = %actor, error = %err, "acquire rejected"),
        }
        result.map(|(lease, _)| lease)
    }

    /// Deletes the caller's lease on `key`.
    pub async fn release(&self, auth: &dyn ActorResolver, key: &LeaseKey) -> LockResult<()> {
        let actor = self.authorize(auth, key).await?;

        let result = self
            .leases
            .transact(key, |entry| {
                let held = entry.get().is_some_and(|lease| lease.is_held_by(&actor));
                if !held {
                    return Err(LockError::NotHeld);
                }
                entry.delete();
                Ok(())
            })
            .await;

        match &result {
            Ok(()) => info!(key = %key, actor = %actor, "lease released"),
            Err(err) => debug!(key = %key, actor = %actor, error = %err, "release rejected"),
        }
        result
    }

    /// Pushes the expiry of the caller's lease to now + TTL.
    ///
    /// Checks ownership only: a holder whose lease lapsed but was not yet
    /// reclaimed by anyone keeps it. A reclaim replaces the holder, after which
    /// the stale holder's renewals fail with `NotHeld`.
    pub async fn renew(&self, auth: &dyn ActorResolver, key: &LeaseKey) -> LockResult<Lease> {
        let actor = self.authorize(auth, key).await?;
        let ttl = self.config.lease_ttl_chrono();

        let result = self
            .leases
            .transact(key, |entry| {
                let now = self.clock.now();
                match entry.get_mut() {
                    Some(lease) if lease.is_held_by(&actor) => {
                        lease.expires_at = now + ttl;
                        Ok(lease.clone())
                    }
                    _ => Err(LockError::NotHeld),
                }
            })
            .await;

        if let Err(err) = &result {
            debug!(key = %key, actor = %actor, error = %err, "renew rejected");
        }
        result
    }

    /// Write-path check: the caller must hold an *active* lease on `key`.
    ///
    /// This is where a lease silently lost to expiry and reclaim surfaces.
    pub async fn ensure_held(&self, auth: &dyn ActorResolver, key: &LeaseKey) -> LockResult<Lease> {
        let actor = self.authorize(auth, key).await?;
        let now = self.clock.now();

        match self.leases.get(key).await {
            Some(lease) if lease.is_held_by(&actor) && lease.is_active(now) => Ok(lease),
            _ => Err(LockError::NotHeld),
        }
    }

    /// Active leases with holder display identities, as embedded in snapshots.
    pub async fn active_leases(&self) -> Vec<LeaseView> {
        let now = self.clock.now();
        let mut views = Vec::new();
        for lease in self.leases.active(now).await {
            let display = self.directory.display_of(&lease.holder).await;
            views.push(LeaseView {
                holder: Actor {
                    id: lease.holder,
                    display,
                },
                key: lease.key,
                expires_at: lease.expires_at,
            });
        }
        views
    }

    /// Revokes every lapsed lease. Explicit operator action, never run
    /// implicitly: a lapsed but unclaimed lease can otherwise still be renewed
    /// or released by its holder.
    pub async fn purge_expired(&self) -> usize {
        let purged = self.leases.purge_expired(self.clock.now()).await;
        if purged > 0 {
            debug!(purged, "expired lease rows purged");
        }
        purged
    }

    async fn authorize(&self, auth: &dyn ActorResolver, key: &LeaseKey) -> LockResult<ActorId> {
        let actor = auth.current_actor().ok_or(LockError::NotAuthenticated)?;

        if !self.records.record_state(key.record_id()).await.is_live() {
            return Err(LockError::NotFound);
        }
        if let Some(field_id) = key.field_id() {
            if !self.records.record_state(&field_id.as_record_id()).await.is_live() {
                return Err(LockError::NotFound);
            }
        }

        Ok(actor)
    }
}
