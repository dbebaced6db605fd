/// Hosted workflow registry
///
/// Lock-free set of workflow ids known to the remote hosting registry. Reads
/// never block; updates swap the whole set.

use crate::collaborators::HostedRegistry;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashSet, sync::Arc};

#[derive(Debug)]
pub struct HostedWorkflows {
    ids: ArcSwap<HashSet<String>>,
}

impl Default for HostedWorkflows {
    fn default() -> Self {
        Self::new()
    }
}

impl HostedWorkflows {
    pub fn new() -> Self {
        Self {
            ids: ArcSwap::new(Arc::new(HashSet::new())),
        }
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ArcSwap::new(Arc::new(ids.into_iter().map(Into::into).collect())),
        }
    }

    /// Build from the cached `hostWorkflows` document, an object keyed by id
    pub fn from_cached(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self::from_ids(map.keys().cloned()),
            Some(Value::Array(items)) => Self::from_ids(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string)),
            ),
            _ => Self::new(),
        }
    }

    pub fn insert(&self, workflow_id: &str) {
        self.ids.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(workflow_id.to_string());
            next
        });
    }

    pub fn remove(&self, workflow_id: &str) {
        self.ids.rcu(|current| {
            let mut next = (**current).clone();
            next.remove(workflow_id);
            next
        });
    }

    pub fn len(&self) -> usize {
        self.ids.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.load().is_empty()
    }
}

#[async_trait]
impl HostedRegistry for HostedWorkflows {
    async fn is_hosted(&self, workflow_id: &str) -> bool {
        self.ids.load().contains(workflow_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn cached_object_keys_become_hosted_ids() {
        let hosted = HostedWorkflows::from_cached(Some(json!({
            "w1": { "hostId": "h-1" },
            "w2": { "hostId": "h-2" }
        })));

        assert_eq!(hosted.len(), 2);
        assert!(hosted.is_hosted("w1").await);
        assert!(!hosted.is_hosted("w3").await);
    }

    #[tokio::test]
    async fn insert_and_remove() {
        let hosted = HostedWorkflows::new();
        assert!(hosted.is_empty());

        hosted.insert("w1");
        assert!(hosted.is_hosted("w1").await);

        hosted.remove("w1");
        assert!(!hosted.is_hosted("w1").await);
    }

    #[test]
    fn garbage_cache_value_means_nothing_hosted() {
        assert!(HostedWorkflows::from_cached(Some(json!(42))).is_empty());
        assert!(HostedWorkflows::from_cached(None).is_empty());
    }
}
