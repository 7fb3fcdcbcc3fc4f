//! Open-addressed pools keyed by hashed identities, plus the ordered list of
//! active shaders.
//!
//! Both pools probe linearly from `hash % capacity`. A pool grows by doubling
//! until it reaches its configured limit; past that point an insert that finds
//! every slot occupied reports [`NanoError::PoolFull`] and leaves the existing
//! entries untouched.

use std::fmt;

use crate::error::NanoError;
use crate::error::NanoResult;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over raw bytes.
pub fn fnv1a(bytes: &[u8]) -> u32
{
        let mut hash = FNV_OFFSET_BASIS;

        for byte in bytes
        {
                hash ^= u32::from(*byte);
                hash = hash.wrapping_mul(FNV_PRIME);
        }

        hash
}

pub trait PoolKey: Copy + Eq + fmt::Debug
{
        fn hash_value(&self) -> u32;
}

/// Identity of a shader record, the hash of its source text or file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u32);

impl ShaderId
{
        pub fn from_source(source: &str) -> Self
        {
                Self(fnv1a(source.as_bytes()))
        }

        pub fn from_raw(raw: u32) -> Self
        {
                Self(raw)
        }

        pub fn raw(&self) -> u32
        {
                self.0
        }
}

/// Identity of a buffer record, the hash of its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl BufferId
{
        pub fn from_label(label: &str) -> Self
        {
                Self(fnv1a(label.as_bytes()))
        }

        pub fn from_raw(raw: u32) -> Self
        {
                Self(raw)
        }

        pub fn raw(&self) -> u32
        {
                self.0
        }
}

impl PoolKey for ShaderId
{
        fn hash_value(&self) -> u32
        {
                self.0
        }
}

impl PoolKey for BufferId
{
        fn hash_value(&self) -> u32
        {
                self.0
        }
}

impl fmt::Display for ShaderId
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                write!(f, "{:#010x}", self.0)
        }
}

impl fmt::Display for BufferId
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                write!(f, "{:#010x}", self.0)
        }
}

#[derive(Debug)]
pub struct Pool<K, V>
{
        name: &'static str,

        slots: Vec<Option<(K, V)>>,

        count: usize,

        limit: usize,
}

impl<K: PoolKey, V> Pool<K, V>
{
        /// Creates a pool with `capacity` slots that may grow up to `limit`.
        pub fn new(
                name: &'static str,
                capacity: usize,
                limit: usize,
        ) -> Self
        {
                let limit = limit.max(1);

                let capacity = capacity.clamp(1, limit);

                Self {
                        name,
                        slots: (0..capacity).map(|_| None).collect(),
                        count: 0,
                        limit,
                }
        }

        pub fn name(&self) -> &'static str
        {
                self.name
        }

        pub fn len(&self) -> usize
        {
                self.count
        }

        pub fn is_empty(&self) -> bool
        {
                self.count == 0
        }

        pub fn capacity(&self) -> usize
        {
                self.slots.len()
        }

        pub fn limit(&self) -> usize
        {
                self.limit
        }

        fn home(
                &self,
                key: K,
        ) -> usize
        {
                key.hash_value() as usize % self.slots.len()
        }

        /// Index of the first slot along `key`'s probe sequence that is either
        /// empty or already holds `key`.
        pub fn find_slot(
                &self,
                key: K,
        ) -> NanoResult<usize>
        {
                let capacity = self.slots.len();

                let home = self.home(key);

                for step in 0..capacity
                {
                        let index = (home + step) % capacity;

                        match &self.slots[index]
                        {
                                None => return Ok(index),
                                Some((k, _)) if *k == key => return Ok(index),
                                Some(_) =>
                                {}
                        }
                }

                Err(NanoError::PoolFull {
                        pool: self.name,
                        limit: capacity,
                })
        }

        fn position(
                &self,
                key: K,
        ) -> Option<usize>
        {
                let capacity = self.slots.len();

                let home = self.home(key);

                for step in 0..capacity
                {
                        let index = (home + step) % capacity;

                        match &self.slots[index]
                        {
                                None => return None,
                                Some((k, _)) if *k == key => return Some(index),
                                Some(_) =>
                                {}
                        }
                }

                None
        }

        /// Stores `value` under `key`, returning the value it replaced.
        pub fn insert(
                &mut self,
                key: K,
                value: V,
        ) -> NanoResult<Option<V>>
        {
                let is_new = self.position(key).is_none();

                if is_new && self.count + 1 > self.slots.len() * 3 / 4 && self.slots.len() < self.limit
                {
                        self.grow();
                }

                let index = self.find_slot(key)?;

                let previous = self.slots[index].replace((key, value)).map(|(_, v)| v);

                if previous.is_none()
                {
                        self.count += 1;
                }

                Ok(previous)
        }

        fn grow(&mut self)
        {
                let capacity = (self.slots.len() * 2).min(self.limit);

                log::debug!(
                        "{} pool growing from {} to {} slots",
                        self.name,
                        self.slots.len(),
                        capacity
                );

                let old = std::mem::replace(&mut self.slots, (0..capacity).map(|_| None).collect());

                for (key, value) in old.into_iter().flatten()
                {
                        // The new table is strictly larger, so a free slot always exists.
                        if let Ok(index) = self.find_slot(key)
                        {
                                self.slots[index] = Some((key, value));
                        }
                }
        }

        pub fn get(
                &self,
                key: K,
        ) -> Option<&V>
        {
                let index = self.position(key)?;

                self.slots[index].as_ref().map(|(_, v)| v)
        }

        pub fn get_mut(
                &mut self,
                key: K,
        ) -> Option<&mut V>
        {
                let index = self.position(key)?;

                self.slots[index].as_mut().map(|(_, v)| v)
        }

        pub fn contains(
                &self,
                key: K,
        ) -> bool
        {
                self.position(key).is_some()
        }

        /// Takes the record out of the pool. Later entries of the same probe
        /// cluster are shifted back so lookups never stop at the hole.
        pub fn remove(
                &mut self,
                key: K,
        ) -> Option<V>
        {
                let mut hole = self.position(key)?;

                let (_, value) = self.slots[hole].take()?;

                self.count -= 1;

                let capacity = self.slots.len();

                let mut next = hole;

                loop
                {
                        next = (next + 1) % capacity;

                        let home = match &self.slots[next]
                        {
                                None => break,
                                Some((k, _)) => self.home(*k),
                        };

                        let stays = if hole <= next
                        {
                                hole < home && home <= next
                        }
                        else
                        {
                                hole < home || home <= next
                        };

                        if !stays
                        {
                                self.slots[hole] = self.slots[next].take();
                                hole = next;
                        }
                }

                Some(value)
        }

        /// Walks every occupied slot. The order is the table order, not the
        /// insertion order.
        pub fn iter(&self) -> impl Iterator<Item = (K, &V)>
        {
                self.slots
                        .iter()
                        .filter_map(|slot| slot.as_ref().map(|(k, v)| (*k, v)))
        }

        pub fn keys(&self) -> Vec<K>
        {
                self.iter().map(|(k, _)| k).collect()
        }
}

/// Ordered record of enabled shaders. Iteration order is push order.
#[derive(Debug, Clone)]
pub struct ActiveList<K>
{
        items: Vec<K>,

        limit: usize,
}

impl<K: PoolKey> ActiveList<K>
{
        pub fn new(limit: usize) -> Self
        {
                Self {
                        items: Vec::new(),
                        limit,
                }
        }

        /// Appends `key`. Returns `false` when it was already present.
        pub fn push(
                &mut self,
                key: K,
        ) -> NanoResult<bool>
        {
                if self.contains(key)
                {
                        return Ok(false);
                }

                if self.items.len() >= self.limit
                {
                        return Err(NanoError::PoolFull {
                                pool: "active list",
                                limit: self.limit,
                        });
                }

                self.items.push(key);

                Ok(true)
        }

        /// Removes `key`, shifting later entries down so no gap remains.
        pub fn remove(
                &mut self,
                key: K,
        ) -> bool
        {
                match self.items.iter().position(|k| *k == key)
                {
                        Some(index) =>
                        {
                                self.items.remove(index);
                                true
                        }
                        None => false,
                }
        }

        pub fn peek(&self) -> Option<K>
        {
                self.items.last().copied()
        }

        pub fn get(
                &self,
                index: usize,
        ) -> Option<K>
        {
                self.items.get(index).copied()
        }

        pub fn contains(
                &self,
                key: K,
        ) -> bool
        {
                self.items.contains(&key)
        }

        pub fn len(&self) -> usize
        {
                self.items.len()
        }

        pub fn is_empty(&self) -> bool
        {
                self.items.is_empty()
        }

        pub fn as_slice(&self) -> &[K]
        {
                &self.items
        }

        pub fn iter(&self) -> impl Iterator<Item = K> + '_
        {
                self.items.iter().copied()
        }

        pub fn clear(&mut self)
        {
                self.items.clear();
        }
}
