/// Contract of the external blob storage: clients upload bytes directly to
/// an upload URL and get back an opaque storage id, which messages persist
/// and readers resolve to a fetchable URL.
pub trait BlobStore: Send + Sync {
    /// Where a client should send the bytes of a new upload.
    fn upload_url(&self) -> String;

    /// Fetchable URL for a storage id, or `None` if the id is not valid.
    fn url(&self, storage_id: &str) -> Option<String>;
}

/// Resolves storage ids by appending them to a base URL.
pub struct PrefixBlobStore {
    base: String,
}

impl PrefixBlobStore {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl BlobStore for PrefixBlobStore {
    fn upload_url(&self) -> String {
        self.base.clone()
    }

    fn url(&self, storage_id: &str) -> Option<String> {
        if storage_id.is_empty() || storage_id.contains(['/', '?', '#']) {
            return None;
        }
        Some(format!("{}/{}", self.base, storage_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_store_joins_ids() {
        let store = PrefixBlobStore::new("http://cdn.test/files/");
        assert_eq!(store.url("abc").as_deref(), Some("http://cdn.test/files/abc"));
        assert_eq!(store.upload_url(), "http://cdn.test/files");
    }

    #[test]
    fn prefix_store_rejects_path_like_ids() {
        let store = PrefixBlobStore::new("http://cdn.test");
        assert!(store.url("../etc").is_none());
        assert!(store.url("").is_none());
    }
}
