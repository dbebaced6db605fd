use crate::collaborators::{
    CollaboratorError, DurableStorage, HostedRegistry, LocalCache, RemoteBackend, SecretSource,
    TriggerManager,
};
use crate::workflow::types::Workflow;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

fn injected(what: &str) -> CollaboratorError {
    CollaboratorError::Unavailable(format!("injected {} failure", what))
}

pub struct FakeSecret {
    secret: Option<String>,
}

impl FakeSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Some(secret.to_string()),
        }
    }

    pub fn unavailable() -> Self {
        Self { secret: None }
    }
}

impl SecretSource for FakeSecret {
    fn implicit_passphrase(&self) -> Result<String, CollaboratorError> {
        self.secret.clone().ok_or_else(|| injected("secret"))
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub fail: AtomicBool,
    pub saves: Mutex<Vec<(String, Vec<Workflow>)>>,
}

impl FakeStorage {
    pub fn failing() -> Self {
        let storage = Self::default();
        storage.fail.store(true, Ordering::SeqCst);
        storage
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_saved_ids(&self) -> Vec<String> {
        let saves = self.saves.lock().unwrap();
        let mut ids: Vec<String> = saves
            .last()
            .map(|(_, records)| records.iter().map(|w| w.id.clone()).collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[async_trait]
impl DurableStorage for FakeStorage {
    async fn save(&self, collection: &str, records: &[Workflow]) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(injected("storage"));
        }
        self.saves
            .lock()
            .unwrap()
            .push((collection.to_string(), records.to_vec()));
        Ok(())
    }

    async fn load(&self, _collection: &str) -> Result<Vec<Workflow>, CollaboratorError> {
        let saves = self.saves.lock().unwrap();
        Ok(saves.last().map(|(_, records)| records.clone()).unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeTriggers {
    pub fail_install: AtomicBool,
    pub fail_uninstall: AtomicBool,
    pub installed: Mutex<Vec<String>>,
    pub uninstalled: Mutex<Vec<String>>,
}

#[async_trait]
impl TriggerManager for FakeTriggers {
    async fn install(&self, workflow: &Workflow) -> Result<(), CollaboratorError> {
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(injected("trigger install"));
        }
        self.installed.lock().unwrap().push(workflow.id.clone());
        Ok(())
    }

    async fn uninstall(&self, workflow_id: &str) -> Result<(), CollaboratorError> {
        if self.fail_uninstall.load(Ordering::SeqCst) {
            return Err(injected("trigger uninstall"));
        }
        self.uninstalled.lock().unwrap().push(workflow_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub fail: AtomicBool,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteBackend for FakeBackend {
    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), CollaboratorError> {
        self.deleted.lock().unwrap().push(workflow_id.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::RemoteStatus {
                status: 500,
                reason: "Internal Server Error".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeHosted {
    pub ids: Mutex<HashSet<String>>,
}

impl FakeHosted {
    pub fn with(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
        }
    }
}

#[async_trait]
impl HostedRegistry for FakeHosted {
    async fn is_hosted(&self, workflow_id: &str) -> bool {
        self.ids.lock().unwrap().contains(workflow_id)
    }
}

#[derive(Default)]
pub struct FakeCache {
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_remove: AtomicBool,
    pub entries: Mutex<HashMap<String, Value>>,
}

impl FakeCache {
    pub fn with(key: &str, value: Value) -> Self {
        let cache = Self::default();
        cache.entries.lock().unwrap().insert(key.to_string(), value);
        cache
    }

    pub fn entry(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: &str, value: Value) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }
}

#[async_trait]
impl LocalCache for FakeCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CollaboratorError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(injected("cache get"));
        }
        let value = self.entry(key);
        // Let concurrent tasks interleave between a read and the following write.
        tokio::task::yield_now().await;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CollaboratorError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(injected("cache set"));
        }
        self.put(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CollaboratorError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(injected("cache remove"));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
