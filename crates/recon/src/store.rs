//! Caller-owned result store, content-addressed by both input tables.
//!
//! Capacity is fixed at construction. When full, the oldest insertion is
//! evicted first. Nothing here is global; each owner decides its own sharing.

use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};

use crate::model::{ReconResult, Table, Value};

fn hash_table(hasher: &mut Sha256, table: &Table) {
    hasher.update((table.columns.len() as u64).to_le_bytes());
    for col in &table.columns {
        hasher.update((col.len() as u64).to_le_bytes());
        hasher.update(col.as_bytes());
    }
    hasher.update((table.rows.len() as u64).to_le_bytes());
    for row in &table.rows {
        for value in row {
            match value {
                Value::Null => hasher.update([0u8]),
                Value::Number(n) => {
                    hasher.update([1u8]);
                    hasher.update(n.to_bits().to_le_bytes());
                }
                Value::Text(s) => {
                    hasher.update([2u8]);
                    hasher.update((s.len() as u64).to_le_bytes());
                    hasher.update(s.as_bytes());
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct ResultStore {
    capacity: usize,
    entries: HashMap<String, ReconResult>,
    order: VecDeque<String>,
}

impl ResultStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Content address of an input pair: `"sha256:<64 hex>"`.
    pub fn key_for(internal: &Table, provider: &Table) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"internal");
        hash_table(&mut hasher, internal);
        hasher.update(b"provider");
        hash_table(&mut hasher, provider);
        format!("sha256:{:x}", hasher.finalize())
    }

    /// Store a result under its input pair's key and return the key.
    pub fn insert(&mut self, internal: &Table, provider: &Table, result: ReconResult) -> String {
        let key = Self::key_for(internal, provider);
        if self.entries.insert(key.clone(), result).is_none() {
            self.order.push_back(key.clone());
            while self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    log::debug!("evicting stored result {oldest}");
                    self.entries.remove(&oldest);
                }
            }
        }
        key
    }

    pub fn get(&self, key: &str) -> Option<&ReconResult> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
