use anyhow::Result;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::auth::{current_timestamp, is_state_expired};

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingVerifier {
    pub verifier: String,
    pub created_at: u64,
}

impl PendingVerifier {
    pub fn new(verifier: String) -> Self {
        Self {
            verifier,
            created_at: current_timestamp(),
        }
    }
}

/// Storage helper for in-flight OAuth flows: PKCE verifiers keyed by state nonce
#[derive(Clone)]
pub struct OAuthStateStorage {
    db: Db,
}

impl OAuthStateStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn oauth_states_tree(&self) -> Result<Tree> {
        Ok(self.db.open_tree("oauth_states")?)
    }

    pub fn store(&self, nonce: &str, pending: &PendingVerifier) -> Result<()> {
        let tree = self.oauth_states_tree()?;
        let pending_json = serde_json::to_vec(pending)?;
        tree.insert(nonce, pending_json)?;
        Ok(())
    }

    /// Removes and returns the verifier for `nonce`. Each verifier is usable once.
    pub fn take(&self, nonce: &str) -> Result<Option<String>> {
        let tree = self.oauth_states_tree()?;

        match tree.remove(nonce)? {
            Some(bytes) => {
                let pending: PendingVerifier = serde_json::from_slice(&bytes)?;
                if is_state_expired(pending.created_at) {
                    return Ok(None);
                }
                Ok(Some(pending.verifier))
            }
            None => Ok(None),
        }
    }

    /// Clean up expired OAuth states
    pub fn cleanup_expired(&self) -> Result<usize> {
        let tree = self.oauth_states_tree()?;
        let mut states_to_remove = Vec::new();

        for result in tree.iter() {
            let (key, value) = result?;
            match serde_json::from_slice::<PendingVerifier>(&value) {
                Ok(pending) if !is_state_expired(pending.created_at) => {}
                _ => states_to_remove.push(key),
            }
        }

        let removed_count = states_to_remove.len();
        for key in states_to_remove {
            tree.remove(key)?;
        }

        Ok(removed_count)
    }

    /// Sweeps expired states every `period` for as long as the runtime lives.
    pub fn spawn_cleanup(&self, period: Duration) -> JoinHandle<()> {
        let storage = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match storage.cleanup_expired() {
                    Ok(0) => {}
                    Ok(removed) => debug!("Removed {} expired OAuth states", removed),
                    Err(e) => error!("Failed to clean up expired OAuth states: {}", e),
                }
            }
        })
    }
}
