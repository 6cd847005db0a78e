//! Id-keyed storage with a secondary tag index.
//!
//! Objects are stored by id in an ordered map. The tag index maps each tag to
//! the ids carrying it in registration order, so a tag lookup returns the
//! earliest-registered object still alive. Retagging keeps an object's place. Tags are compared in full by the hash map, so
//! `"ab"` never matches `"abc"` even when both hash to the same bucket.

use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Something stored in a [`Registry`].
pub trait Tagged {
    fn id(&self) -> i64;
    fn tag(&self) -> &str;
    fn set_tag(&mut self, tag: String);
}

#[derive(Debug, Clone)]
pub struct Registry<T, S = RandomState> {
    items: BTreeMap<i64, T>,
    by_tag: HashMap<String, Vec<i64>, S>,
    /// Registration sequence number per id.
    registered: BTreeMap<i64, u64>,
    next_seq: u64,
}

impl<T: Tagged> Registry<T> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<T: Tagged> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tagged, S: BuildHasher> Registry<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            items: BTreeMap::new(),
            by_tag: HashMap::with_hasher(hasher),
            registered: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.items.contains_key(&id)
    }

    /// First registered object with exactly this tag.
    pub fn by_tag(&self, tag: &str) -> Option<&T> {
        self.by_tag
            .get(tag)
            .and_then(|ids| ids.first())
            .and_then(|id| self.items.get(id))
    }

    /// Insert a new object. The caller checks that the id is free; an existing
    /// object with the same id is replaced and its tag unindexed.
    pub fn insert(&mut self, item: T) -> &mut T {
        let id = item.id();
        if let Some(old) = self.items.remove(&id) {
            self.unindex(id, old.tag().to_owned());
        }
        self.registered.insert(id, self.next_seq);
        self.next_seq += 1;
        self.by_tag.entry(item.tag().to_owned()).or_default().push(id);
        self.items.entry(id).or_insert(item)
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        let item = self.items.remove(&id)?;
        self.unindex(id, item.tag().to_owned());
        self.registered.remove(&id);
        Some(item)
    }

    /// Change the tag of `id`, keeping the index in step. Returns the old tag.
    pub fn retag(&mut self, id: i64, tag: String) -> Option<String> {
        let item = self.items.get_mut(&id)?;
        let old = item.tag().to_owned();
        if old == tag {
            return Some(old);
        }
        item.set_tag(tag.clone());
        self.unindex(id, old.clone());
        self.index_in_order(id, tag);
        Some(old)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.items.keys().copied()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.by_tag.clear();
        self.registered.clear();
    }

    /// Add `id` under `tag`, after every id registered before it.
    fn index_in_order(&mut self, id: i64, tag: String) {
        let seq = self.registered.get(&id).copied().unwrap_or(u64::MAX);
        let registered = &self.registered;
        let ids = self.by_tag.entry(tag).or_default();
        let at = ids.partition_point(|other| {
            registered.get(other).copied().unwrap_or(u64::MAX) < seq
        });
        ids.insert(at, id);
    }

    fn unindex(&mut self, id: i64, tag: String) {
        if let Some(ids) = self.by_tag.get_mut(&tag) {
            ids.retain(|&i| i != id);
            if ids.is_empty() {
                self.by_tag.remove(&tag);
            }
        }
    }
}
