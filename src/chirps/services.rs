use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::{profanity::clean_body, repo_types::Chirp};
use crate::{
    error::{Error, Result},
    store::Store,
};

pub const MAX_CHIRP_LENGTH: usize = 140;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone)]
pub struct ChirpService {
    store: Arc<Store>,
}

impl ChirpService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, author_id: u64, raw_body: &str) -> Result<Chirp> {
        if raw_body.chars().count() > MAX_CHIRP_LENGTH {
            return Err(Error::BodyTooLong);
        }
        let body = clean_body(raw_body);
        let chirp = self
            .store
            .mutate(move |doc| {
                let id = doc.next_chirp_id()?;
                let chirp = Chirp {
                    id,
                    author_id,
                    body,
                };
                doc.chirps.insert(id, chirp.clone());
                Ok(chirp)
            })
            .await?;
        debug!(chirp_id = chirp.id, author_id, "chirp created");
        Ok(chirp)
    }

    pub async fn list(&self, author_id: Option<u64>, order: SortOrder) -> Result<Vec<Chirp>> {
        let doc = self.store.load().await?;
        let mut chirps: Vec<Chirp> = doc
            .chirps
            .into_values()
            .filter(|c| author_id.map_or(true, |a| c.author_id == a))
            .collect();
        // BTreeMap already yields ascending ids
        if order == SortOrder::Desc {
            chirps.reverse();
        }
        Ok(chirps)
    }

    pub async fn get(&self, id: u64) -> Result<Chirp> {
        let doc = self.store.load().await?;
        doc.chirps.get(&id).cloned().ok_or(Error::NotFound)
    }

    /// Delete a chirp owned by `requester_id` and renumber the rest 1..N,
    /// keeping their relative order.
    pub async fn delete(&self, requester_id: u64, chirp_id: u64) -> Result<()> {
        self.store
            .mutate(|doc| {
                let chirp = doc.chirps.get(&chirp_id).ok_or(Error::NotFound)?;
                if chirp.author_id != requester_id {
                    return Err(Error::Forbidden);
                }
                doc.chirps.remove(&chirp_id);
                doc.chirps = std::mem::take(&mut doc.chirps)
                    .into_values()
                    .zip(1u64..)
                    .map(|(mut c, id)| {
                        c.id = id;
                        (id, c)
                    })
                    .collect();
                Ok(())
            })
            .await?;
        info!(chirp_id, requester_id, "chirp deleted");
        Ok(())
    }
}
