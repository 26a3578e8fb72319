use std::path::Path;

use rand::seq::SliceRandom;
use tokio::fs::File;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::csv_utils::read_first_column;
use crate::error::LoadError;

/// Pre-seeded user ids the load generator draws from. Never empty.
#[derive(Debug, Clone)]
pub struct UserPool {
    ids: Vec<String>,
}

impl UserPool {
    pub fn new(ids: Vec<String>) -> Result<Self, LoadError> {
        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(LoadError::EmptyPool);
        }
        Ok(Self { ids })
    }

    /// Parses an id dump: one id per line, or `uid,delta` rows.
    pub async fn from_reader<R>(reader: R) -> Result<Self, LoadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        Self::new(read_first_column(reader).await?)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let file = File::open(path).await?;
        Self::from_reader(file).await
    }

    /// A pool of `size` fresh random ids.
    pub fn generate(size: usize) -> Result<Self, LoadError> {
        Self::new((0..size).map(|_| Uuid::new_v4().to_string()).collect())
    }

    /// Uniformly random id from the pool.
    pub fn pick(&self) -> &str {
        // `new` guarantees at least one id.
        self.ids
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
