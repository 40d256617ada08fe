//! In-memory bucket and object store backing the local endpoint

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use stowage_core::*;

use crate::{Result, ServerError};

/// Default and maximum page size of an object listing
pub const MAX_KEYS: usize = 1000;

/// An object as held by the store
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub etag: ETag,
    pub content_type: String,
    pub acl: Acl,
    pub metadata: BTreeMap<String, String>,
    pub last_modified: DateTime<Utc>,
}

impl StoredObject {
    /// Build an object, computing its ETag from the content
    pub fn new(data: Bytes, content_type: impl Into<String>, acl: Acl) -> Self {
        StoredObject {
            etag: ETag::compute(&data),
            data,
            content_type: content_type.into(),
            acl,
            metadata: BTreeMap::new(),
            last_modified: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Parameters of an object listing
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub prefix: String,
    pub marker: Option<String>,
    pub max_keys: Option<usize>,
}

/// One page of an object listing
#[derive(Debug, Clone)]
pub struct Listing {
    pub bucket: String,
    pub prefix: String,
    pub marker: Option<String>,
    pub max_keys: usize,
    pub is_truncated: bool,
    pub objects: Vec<(String, StoredObject)>,
}

#[derive(Debug)]
struct BucketState {
    created_at: DateTime<Utc>,
    objects: BTreeMap<String, StoredObject>,
}

/// Shared handle to the store; clones see the same buckets
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    buckets: Arc<RwLock<BTreeMap<String, BucketState>>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        ObjectStore::default()
    }

    /// Create a bucket; returns false when it already existed
    pub fn create_bucket(&self, name: &BucketName) -> Result<bool> {
        let mut buckets = self.write()?;
        if buckets.contains_key(name.as_str()) {
            return Ok(false);
        }
        buckets.insert(
            name.as_str().to_string(),
            BucketState {
                created_at: Utc::now(),
                objects: BTreeMap::new(),
            },
        );
        Ok(true)
    }

    pub fn bucket_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    /// Remove an empty bucket
    pub fn delete_bucket(&self, name: &str) -> Result<()> {
        let mut buckets = self.write()?;
        match buckets.get(name) {
            None => Err(ServerError::NoSuchBucket(name.to_string())),
            Some(state) if !state.objects.is_empty() => {
                Err(ServerError::BucketNotEmpty(name.to_string()))
            }
            Some(_) => {
                buckets.remove(name);
                Ok(())
            }
        }
    }

    /// Bucket names with creation times, in name order
    pub fn list_buckets(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        Ok(self
            .read()?
            .iter()
            .map(|(name, state)| (name.clone(), state.created_at))
            .collect())
    }

    /// Store or overwrite an object
    pub fn put_object(&self, bucket: &str, key: &str, object: StoredObject) -> Result<ETag> {
        let mut buckets = self.write()?;
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| ServerError::NoSuchBucket(bucket.to_string()))?;
        let etag = object.etag.clone();
        state.objects.insert(key.to_string(), object);
        Ok(etag)
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let buckets = self.read()?;
        let state = buckets
            .get(bucket)
            .ok_or_else(|| ServerError::NoSuchBucket(bucket.to_string()))?;
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| ServerError::NoSuchKey(key.to_string()))
    }

    /// Remove an object; returns whether it existed
    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<bool> {
        let mut buckets = self.write()?;
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| ServerError::NoSuchBucket(bucket.to_string()))?;
        Ok(state.objects.remove(key).is_some())
    }

    /// List objects in key order, starting after `marker`
    pub fn list_objects(&self, bucket: &str, query: &ListQuery) -> Result<Listing> {
        let buckets = self.read()?;
        let state = buckets
            .get(bucket)
            .ok_or_else(|| ServerError::NoSuchBucket(bucket.to_string()))?;

        let max_keys = query.max_keys.unwrap_or(MAX_KEYS).min(MAX_KEYS);
        let mut matching = state
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(&query.prefix))
            .filter(|(key, _)| match &query.marker {
                Some(marker) => key.as_str() > marker.as_str(),
                None => true,
            });

        let objects: Vec<(String, StoredObject)> = matching
            .by_ref()
            .take(max_keys)
            .map(|(key, object)| (key.clone(), object.clone()))
            .collect();
        let is_truncated = matching.next().is_some();

        Ok(Listing {
            bucket: bucket.to_string(),
            prefix: query.prefix.clone(),
            marker: query.marker.clone(),
            max_keys,
            is_truncated,
            objects,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, BucketState>>> {
        self.buckets
            .read()
            .map_err(|_| ServerError::Internal("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, BucketState>>> {
        self.buckets
            .write()
            .map_err(|_| ServerError::Internal("store lock poisoned".to_string()))
    }
}
