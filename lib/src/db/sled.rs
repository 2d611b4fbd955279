use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{IVec, Transactional};
use uuid::Uuid;

use crate::{Error, ErrorKind, Result};

use super::{decode, encode, Collectable, Identifiable};

pub type TxResult<T> = std::result::Result<T, ConflictableTransactionError<Error>>;

#[derive(Clone, Debug)]
pub struct SledDb {
    inner: sled::Db,
}

impl SledDb {
    /// Opens (or creates) the database at the provided filesystem path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = sled::Config::default().path(path).open()?;
        Ok(Self { inner })
    }

    /// Creates a database that is removed once the last handle is dropped.
    pub fn temporary() -> Result<Self> {
        let inner = sled::Config::default().temporary(true).open()?;
        Ok(Self { inner })
    }

    pub fn get_collection<T: DeserializeOwned + Collectable>(&self) -> Result<Vec<T>> {
        self.get_collection_at(T::get_collection_name())
    }

    /// Gets a collection of entries of the same type from the collection
    /// specified by name.
    pub fn get_collection_at<T: DeserializeOwned>(&self, name: impl AsRef<[u8]>) -> Result<Vec<T>> {
        let tree = self.inner.open_tree(name)?;
        let mut out = Vec::new();
        for entry in tree.iter() {
            let (_, value_bytes) = entry?;
            out.push(decode(&value_bytes)?);
        }
        Ok(out)
    }

    /// Returns the length of the collection as defined for the specified type.
    pub fn len<T: Collectable>(&self) -> Result<usize> {
        Ok(self.inner.open_tree(T::get_collection_name())?.len())
    }

    /// Gets an item from the collection defined for the item type.
    pub fn get<T: DeserializeOwned + Collectable>(&self, id: Uuid) -> Result<T> {
        self.find(id)?.ok_or_else(|| {
            ErrorKind::not_found(T::get_collection_name().replace('_', " "), id).into()
        })
    }

    /// Same as `get` but a missing item is not an error.
    pub fn find<T: DeserializeOwned + Collectable>(&self, id: Uuid) -> Result<Option<T>> {
        let tree = self.inner.open_tree(T::get_collection_name())?;
        match tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains<T: Collectable>(&self, id: Uuid) -> Result<bool> {
        let tree = self.inner.open_tree(T::get_collection_name())?;
        Ok(tree.contains_key(id.as_bytes())?)
    }

    pub fn set<T: Serialize + Identifiable + Collectable>(&self, value: &T) -> Result<()> {
        let tree = self.inner.open_tree(T::get_collection_name())?;
        tree.insert(value.get_id().as_bytes(), encode(value)?)?;
        Ok(())
    }

    /// Reads a raw value stored under an arbitrary key, e.g. an index entry.
    pub fn get_raw_at(&self, collection: &str, key: impl AsRef<[u8]>) -> Result<Option<IVec>> {
        let tree = self.inner.open_tree(collection)?;
        Ok(tree.get(key)?)
    }

    /// Reads a counter maintained with [`Tx::add_to_counter`].
    pub fn counter_at(&self, collection: &str, key: impl AsRef<[u8]>) -> Result<u64> {
        Ok(decode_counter(self.get_raw_at(collection, key)?.as_deref()))
    }

    pub fn remove<T: Identifiable + Collectable>(&self, value: &T) -> Result<()> {
        self.remove_id::<T>(value.get_id())
    }

    pub fn remove_id<T: Collectable>(&self, id: Uuid) -> Result<()> {
        let tree = self.inner.open_tree(T::get_collection_name())?;
        tree.remove(id.as_bytes())?;
        Ok(())
    }

    /// Removes every item of `T` matching `doomed` in one transaction and
    /// returns how many went.
    pub fn remove_where<T>(&self, doomed: impl Fn(&T) -> bool) -> Result<usize>
    where
        T: DeserializeOwned + Identifiable + Collectable,
    {
        let ids = self
            .get_collection::<T>()?
            .into_iter()
            .filter(|t| doomed(t))
            .map(|t| t.get_id())
            .collect::<Vec<_>>();
        if ids.is_empty() {
            return Ok(0);
        }
        self.transaction(&[T::get_collection_name()], |tx| {
            for id in &ids {
                tx.remove::<T>(*id)?;
            }
            Ok(())
        })?;
        Ok(ids.len())
    }

    pub fn clear<T: Collectable>(&self) -> Result<()> {
        let tree = self.inner.open_tree(T::get_collection_name())?;
        tree.clear()?;
        Ok(())
    }

    pub async fn flush(&self) -> Result<()> {
        self.inner.flush_async().await?;
        Ok(())
    }

    /// Runs `f` atomically over the named collections.
    ///
    /// The closure may run more than once if it conflicts with a concurrent
    /// transaction, so it must not have side effects outside of `Tx`.
    /// Returning an error from the closure aborts the transaction and
    /// surfaces that error.
    pub fn transaction<A, F>(&self, collections: &[&str], f: F) -> Result<A>
    where
        F: Fn(&Tx) -> TxResult<A>,
    {
        let trees = collections
            .iter()
            .map(|name| self.inner.open_tree(name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let out = trees.as_slice().transaction(|views| {
            let tx = Tx {
                names: collections,
                trees: views,
            };
            f(&tx)
        })?;
        Ok(out)
    }
}

/// View over the trees participating in a transaction.
pub struct Tx<'a> {
    names: &'a [&'a str],
    trees: &'a [TransactionalTree],
}

impl<'a> Tx<'a> {
    fn tree(&self, collection: &str) -> TxResult<&TransactionalTree> {
        self.names
            .iter()
            .position(|n| *n == collection)
            .map(|i| &self.trees[i])
            .ok_or_else(|| {
                ErrorKind::DbError(format!(
                    "collection {} is not part of the transaction",
                    collection
                ))
                .into()
            })
    }

    pub fn find<T: DeserializeOwned + Collectable>(&self, id: Uuid) -> TxResult<Option<T>> {
        match self.tree(T::get_collection_name())?.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get<T: DeserializeOwned + Collectable>(&self, id: Uuid) -> TxResult<T> {
        match self.find(id)? {
            Some(t) => Ok(t),
            None => Err(ErrorKind::not_found(T::get_collection_name().replace('_', " "), id).into()),
        }
    }

    pub fn contains<T: Collectable>(&self, id: Uuid) -> TxResult<bool> {
        Ok(self
            .tree(T::get_collection_name())?
            .get(id.as_bytes())?
            .is_some())
    }

    pub fn set<T: Serialize + Identifiable + Collectable>(&self, value: &T) -> TxResult<()> {
        let encoded = encode(value)?;
        self.tree(T::get_collection_name())?
            .insert(value.get_id().as_bytes().to_vec(), encoded)?;
        Ok(())
    }

    /// Removes the item, returning whether it was present.
    pub fn remove<T: Collectable>(&self, id: Uuid) -> TxResult<bool> {
        Ok(self
            .tree(T::get_collection_name())?
            .remove(id.as_bytes().to_vec())?
            .is_some())
    }

    pub fn get_raw(&self, collection: &str, key: &[u8]) -> TxResult<Option<IVec>> {
        Ok(self.tree(collection)?.get(key)?)
    }

    pub fn set_raw(&self, collection: &str, key: &[u8], value: &[u8]) -> TxResult<()> {
        self.tree(collection)?.insert(key.to_vec(), value.to_vec())?;
        Ok(())
    }

    pub fn remove_raw(&self, collection: &str, key: &[u8]) -> TxResult<()> {
        self.tree(collection)?.remove(key.to_vec())?;
        Ok(())
    }

    /// Points `key` of an index tree at `owner`. Returns false and leaves the
    /// index untouched when the key belongs to someone else.
    pub fn claim(&self, index: &str, key: &[u8], owner: Uuid) -> TxResult<bool> {
        if let Some(holder) = self.get_raw(index, key)? {
            if holder[..] != owner.as_bytes()[..] {
                return Ok(false);
            }
        }
        self.set_raw(index, key, owner.as_bytes())?;
        Ok(true)
    }

    /// Reads a counter kept as a big endian `u64`. Missing means zero.
    pub fn counter(&self, collection: &str, key: &[u8]) -> TxResult<u64> {
        Ok(decode_counter(self.get_raw(collection, key)?.as_deref()))
    }

    /// Adds `delta` to a counter, saturating at zero. Counters that drop to
    /// zero are removed. Returns the new value.
    pub fn add_to_counter(&self, collection: &str, key: &[u8], delta: i64) -> TxResult<u64> {
        let current = self.counter(collection, key)?;
        let next = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta as u64)
        };
        if next == 0 {
            self.remove_raw(collection, key)?;
        } else {
            self.set_raw(collection, key, &next.to_be_bytes())?;
        }
        Ok(next)
    }
}

pub(crate) fn decode_counter(bytes: Option<&[u8]>) -> u64 {
    bytes
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0)
}
