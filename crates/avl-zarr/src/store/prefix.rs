use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ZarrResult;
use crate::store::{Listing, Store, join_key};

/// View of another store rooted at a key prefix.
#[derive(Clone)]
pub struct PrefixStore {
    inner: Arc<dyn Store>,
    prefix: String,
}

impl PrefixStore {
    pub fn new(inner: Arc<dyn Store>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        Self { inner, prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl std::fmt::Debug for PrefixStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixStore")
            .field("url", &self.url())
            .finish()
    }
}

#[async_trait]
impl Store for PrefixStore {
    fn url(&self) -> String {
        join_key(&self.inner.url(), &self.prefix)
    }

    async fn get(&self, key: &str) -> ZarrResult<Option<Vec<u8>>> {
        self.inner.get(&join_key(&self.prefix, key)).await
    }

    async fn list_dir(&self, prefix: &str) -> ZarrResult<Listing> {
        self.inner.list_dir(&join_key(&self.prefix, prefix)).await
    }
}
