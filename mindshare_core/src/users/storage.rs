use anyhow::Result;
use log::debug;
use sled::{
    transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError},
    Db, Tree,
};
use uuid::Uuid;

use super::dto::User;

/// Registered participants, keyed by lower-cased Discord username.
#[derive(Clone)]
pub struct UserStorage {
    db: Db,
}

impl UserStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn users_tree(&self) -> Result<Tree> {
        Ok(self.db.open_tree("users")?)
    }

    fn key(discord_username: &str) -> String {
        discord_username.trim().to_lowercase()
    }

    pub fn get(&self, discord_username: &str) -> Result<Option<User>> {
        let tree = self.users_tree()?;

        match tree.get(Self::key(discord_username))? {
            Some(user_bytes) => Ok(Some(serde_json::from_slice(&user_bytes)?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive.
    pub fn exists(&self, discord_username: &str) -> Result<bool> {
        let tree = self.users_tree()?;
        Ok(tree.contains_key(Self::key(discord_username))?)
    }

    /// Inserts or replaces a user. A replaced record keeps its original id.
    ///
    /// The lookup and the write run in one transaction, so concurrent upserts
    /// of the same new user agree on a single id.
    pub async fn upsert(&self, user: User) -> Result<User> {
        let key = Self::key(&user.discord_username);
        if key.is_empty() {
            return Err(anyhow::anyhow!("discordUsername must not be empty"));
        }

        let tree = self.users_tree()?;

        let stored = tree
            .transaction(|tx| -> ConflictableTransactionResult<User, serde_json::Error> {
                let mut user = user.clone();

                if let Some(existing_bytes) = tx.get(key.as_bytes())? {
                    let existing: User = serde_json::from_slice(&existing_bytes)
                        .map_err(ConflictableTransactionError::Abort)?;
                    debug!("Updating existing user {}", existing.discord_username);
                    user.id = existing.id;
                } else if user.id.trim().is_empty() {
                    user.id = Uuid::new_v4().to_string();
                }

                let user_json =
                    serde_json::to_vec(&user).map_err(ConflictableTransactionError::Abort)?;
                tx.insert(key.as_bytes(), user_json)?;
                Ok(user)
            })
            .map_err(|e: TransactionError<serde_json::Error>| {
                anyhow::anyhow!("Failed to upsert user {}: {}", key, e)
            })?;
        tree.flush_async().await?;

        Ok(stored)
    }

    /// All users in leaderboard order with ranks assigned from 1.
    pub fn list_all(&self) -> Result<Vec<User>> {
        let tree = self.users_tree()?;
        let mut users = Vec::new();

        for result in tree.iter() {
            let (_, value) = result?;
            users.push(serde_json::from_slice::<User>(&value)?);
        }

        users.sort_by(|a, b| {
            b.mindshare_score
                .cmp(&a.mindshare_score)
                .then_with(|| a.discord_username.cmp(&b.discord_username))
        });

        for (index, user) in users.iter_mut().enumerate() {
            user.rank = index as u32 + 1;
        }

        Ok(users)
    }
}
