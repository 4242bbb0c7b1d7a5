//! A RocksDB-backed host runtime for object classes.
//!
//! Each object is a header record plus a keyed map, both stored in one
//! database. Method invocations run against a staged transaction: reads see
//! the staged overlay over the database, and writes are collected into a
//! `WriteBatch` which commits only when the method returns a non-negative
//! status. A failed or refused invocation leaves the object untouched.

use crate::{MapContext, MapError, Registry, ResolveError, NOT_FOUND};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("object id {0:?} contains a NUL byte")]
    BadObjectId(String),
    #[error("object {0:?} already exists")]
    AlreadyExists(String),
    #[error("no such object {0:?}")]
    NoSuchObject(String),
    #[error("RocksDB error: {0}")]
    Rocks(#[from] rocksdb::Error),
}

/// Outcome of one method invocation: the class status code, and reply
/// payload bytes written by the handler.
#[derive(Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: i32,
    pub data: Vec<u8>,
}

/// Basic facts about one stored object.
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectStat {
    /// Number of keys in the object's map.
    pub entries: u64,
}

pub struct Store {
    db: rocksdb::DB,
    registry: Registry,
}

// Object header. Presence of this record is object existence.
fn header_key(oid: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + oid.len());
    key.push(b'h');
    key.extend_from_slice(oid.as_bytes());
    key
}

// Prefix under which one object's map entries live. The NUL terminator keeps
// the map key spaces of distinct objects from interleaving, and preserves
// byte-lexicographic order of keys within an object.
fn map_prefix(oid: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(2 + oid.len());
    prefix.push(b'm');
    prefix.extend_from_slice(oid.as_bytes());
    prefix.push(0x00);
    prefix
}

fn map_key(prefix: &[u8], key: &str) -> Vec<u8> {
    let mut full = Vec::with_capacity(prefix.len() + key.len());
    full.extend_from_slice(prefix);
    full.extend_from_slice(key.as_bytes());
    full
}

fn check_oid(oid: &str) -> Result<(), Error> {
    if oid.as_bytes().contains(&0x00) {
        return Err(Error::BadObjectId(oid.to_string()));
    }
    Ok(())
}

impl Store {
    /// Open (or create) a store at `path`, dispatching to `registry`.
    pub fn open<P: AsRef<Path>>(path: P, registry: Registry) -> Result<Store, Error> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);

        let db = rocksdb::DB::open(&opts, path)?;
        Ok(Store { db, registry })
    }

    /// Execute a registered class method against the named object.
    ///
    /// Read-only methods against an absent object report `NOT_FOUND` without
    /// invoking the handler. A read+write method implicitly creates its
    /// object when it commits.
    pub fn exec(
        &self,
        oid: &str,
        class: &str,
        method: &str,
        input: &[u8],
    ) -> Result<Reply, Error> {
        check_oid(oid)?;
        let entry = self.registry.resolve(class, method)?;

        let exists = self.db.get_pinned(header_key(oid))?.is_some();
        if entry.read_only && !exists {
            tracing::debug!(obj = %oid, class, method, "read of absent object");
            return Ok(Reply {
                status: NOT_FOUND,
                data: Vec::new(),
            });
        }

        let mut txn = Txn {
            db: &self.db,
            prefix: map_prefix(oid),
            staged: BTreeMap::new(),
        };
        let mut data = Vec::new();

        let status = match (entry.handler)(&mut txn, input, &mut data) {
            Ok(status) => status,
            Err(err) if err.is_fault() => {
                tracing::error!(obj = %oid, class, method, error = %err, "method failed");
                err.code()
            }
            Err(err) => {
                tracing::debug!(obj = %oid, class, method, error = %err, "method refused");
                err.code()
            }
        };

        // Registered read-only methods must not stage mutations.
        debug_assert!(!entry.read_only || txn.staged.is_empty());

        if !entry.read_only && status >= 0 {
            let mut batch = rocksdb::WriteBatch::default();
            if !exists {
                batch.put(header_key(oid), b"");
            }
            for (key, value) in txn.staged {
                batch.put(map_key(&txn.prefix, &key), value);
            }
            if !batch.is_empty() {
                self.db.write(batch)?;
            }
        }

        Ok(Reply { status, data })
    }

    /// Create an object, failing if it already exists.
    pub fn create(&self, oid: &str) -> Result<(), Error> {
        check_oid(oid)?;
        if self.db.get_pinned(header_key(oid))?.is_some() {
            return Err(Error::AlreadyExists(oid.to_string()));
        }
        self.db.put(header_key(oid), b"")?;
        Ok(())
    }

    /// Remove an object and all of its map entries.
    pub fn remove(&self, oid: &str) -> Result<(), Error> {
        check_oid(oid)?;
        if self.db.get_pinned(header_key(oid))?.is_none() {
            return Err(Error::NoSuchObject(oid.to_string()));
        }

        let mut batch = rocksdb::WriteBatch::default();
        batch.delete(header_key(oid));
        for (key, _) in self.scan(oid)? {
            batch.delete(map_key(&map_prefix(oid), &key));
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// Stat an object.
    pub fn stat(&self, oid: &str) -> Result<ObjectStat, Error> {
        check_oid(oid)?;
        if self.db.get_pinned(header_key(oid))?.is_none() {
            return Err(Error::NoSuchObject(oid.to_string()));
        }
        Ok(ObjectStat {
            entries: self.scan(oid)?.len() as u64,
        })
    }

    /// Read one raw map value, bypassing dispatch.
    pub fn get_map_value(&self, oid: &str, key: &str) -> Result<Option<Vec<u8>>, Error> {
        check_oid(oid)?;
        match self.db.get_pinned(map_key(&map_prefix(oid), key))? {
            Some(pin) => Ok(Some(pin.as_ref().to_vec())),
            None => Ok(None),
        }
    }

    /// Write one raw map value, bypassing dispatch. Creates the object if
    /// needed. This is a host-side maintenance hook; classes never see it.
    pub fn set_map_value(&self, oid: &str, key: &str, value: &[u8]) -> Result<(), Error> {
        check_oid(oid)?;
        let mut batch = rocksdb::WriteBatch::default();
        if self.db.get_pinned(header_key(oid))?.is_none() {
            batch.put(header_key(oid), b"");
        }
        batch.put(map_key(&map_prefix(oid), key), value);
        self.db.write(batch)?;
        Ok(())
    }

    /// All map entries of an object, in byte-lexicographic key order.
    /// Host-side only: classes have no scan surface.
    pub fn scan(&self, oid: &str) -> Result<Vec<(String, Vec<u8>)>, Error> {
        check_oid(oid)?;
        let prefix = map_prefix(oid);

        let mut entries = Vec::new();
        let iter = self.db.iterator(rocksdb::IteratorMode::From(
            &prefix,
            rocksdb::Direction::Forward,
        ));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let key = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            entries.push((key, value.into_vec()));
        }
        Ok(entries)
    }
}

struct Txn<'s> {
    db: &'s rocksdb::DB,
    prefix: Vec<u8>,
    staged: BTreeMap<String, Vec<u8>>,
}

impl MapContext for Txn<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MapError> {
        if let Some(value) = self.staged.get(key) {
            return Ok(Some(value.clone()));
        }
        match self.db.get_pinned(map_key(&self.prefix, key))? {
            Some(pin) => Ok(Some(pin.as_ref().to_vec())),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MapError> {
        self.staged.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{MapContext, MethodError, IO_ERROR};

    fn counter_value(value: Vec<u8>) -> Result<u64, MethodError> {
        let value: [u8; 8] = value
            .as_slice()
            .try_into()
            .map_err(|_| MethodError::Corrupt("value".to_string()))?;
        Ok(u64::from_le_bytes(value))
    }

    fn bump(
        ctx: &mut dyn MapContext,
        _input: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<i32, MethodError> {
        let next = match ctx.get("value")? {
            Some(value) => counter_value(value)? + 1,
            None => 1,
        };
        ctx.set("value", &next.to_le_bytes())?;
        out.extend_from_slice(&next.to_le_bytes());
        Ok(0)
    }

    fn get(
        ctx: &mut dyn MapContext,
        _input: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<i32, MethodError> {
        match ctx.get("value")? {
            Some(value) => {
                out.extend_from_slice(&value);
                Ok(0)
            }
            None => Err(MethodError::NotFound("value")),
        }
    }

    // Stages a write, then fails. The write must not survive.
    fn poison(
        ctx: &mut dyn MapContext,
        _input: &[u8],
        _out: &mut Vec<u8>,
    ) -> Result<i32, MethodError> {
        ctx.set("value", b"junk")?;
        Err(MethodError::Corrupt("value".to_string()))
    }

    fn build_test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::TempDir::new().unwrap();

        let mut registry = Registry::new();
        registry
            .class("counter")
            .read_write("bump", bump)
            .read_only("get", get)
            .read_write("poison", poison);

        let store = Store::open(dir.path(), registry).unwrap();
        (dir, store)
    }

    fn value_of(reply: &Reply) -> u64 {
        u64::from_le_bytes(reply.data.as_slice().try_into().unwrap())
    }

    #[test]
    fn test_commit_and_rollback() {
        let (_dir, store) = build_test_store();

        let reply = store.exec("obj", "counter", "bump", &[]).unwrap();
        assert_eq!((reply.status, value_of(&reply)), (0, 1));
        let reply = store.exec("obj", "counter", "bump", &[]).unwrap();
        assert_eq!((reply.status, value_of(&reply)), (0, 2));

        // A failing method rolls back everything it staged.
        let reply = store.exec("obj", "counter", "poison", &[]).unwrap();
        assert_eq!(reply.status, IO_ERROR);

        let reply = store.exec("obj", "counter", "bump", &[]).unwrap();
        assert_eq!((reply.status, value_of(&reply)), (0, 3));

        let reply = store.exec("obj", "counter", "get", &[]).unwrap();
        assert_eq!((reply.status, value_of(&reply)), (0, 3));
    }

    #[test]
    fn test_read_only_method_on_absent_object() {
        let (_dir, store) = build_test_store();

        let reply = store.exec("nope", "counter", "get", &[]).unwrap();
        assert_eq!(reply.status, NOT_FOUND);

        // A read+write method creates the object.
        store.exec("nope", "counter", "bump", &[]).unwrap();
        let reply = store.exec("nope", "counter", "get", &[]).unwrap();
        assert_eq!((reply.status, value_of(&reply)), (0, 1));
    }

    #[test]
    fn test_objects_are_isolated() {
        let (_dir, store) = build_test_store();

        store.exec("a", "counter", "bump", &[]).unwrap();
        store.exec("a", "counter", "bump", &[]).unwrap();
        store.exec("b", "counter", "bump", &[]).unwrap();

        let reply = store.exec("a", "counter", "get", &[]).unwrap();
        assert_eq!(value_of(&reply), 2);
        let reply = store.exec("b", "counter", "get", &[]).unwrap();
        assert_eq!(value_of(&reply), 1);
    }

    #[test]
    fn test_unknown_class_and_method() {
        let (_dir, store) = build_test_store();

        assert!(matches!(
            store.exec("obj", "nope", "bump", &[]),
            Err(Error::Resolve(ResolveError::UnknownClass(_)))
        ));
        assert!(matches!(
            store.exec("obj", "counter", "nope", &[]),
            Err(Error::Resolve(ResolveError::UnknownMethod { .. }))
        ));
        assert!(matches!(
            store.exec("o\0id", "counter", "bump", &[]),
            Err(Error::BadObjectId(_))
        ));
    }

    #[test]
    fn test_host_utilities() {
        let (_dir, store) = build_test_store();

        store.create("obj").unwrap();
        assert!(matches!(store.create("obj"), Err(Error::AlreadyExists(_))));
        assert_eq!(store.stat("obj").unwrap(), ObjectStat { entries: 0 });

        // Raw values land in byte-lexicographic key order.
        store.set_map_value("obj", "b", b"2").unwrap();
        store.set_map_value("obj", "a", b"1").unwrap();
        store.set_map_value("obj", "c", b"3").unwrap();

        assert_eq!(store.get_map_value("obj", "b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.get_map_value("obj", "z").unwrap(), None);
        assert_eq!(store.stat("obj").unwrap(), ObjectStat { entries: 3 });
        assert_eq!(
            store.scan("obj").unwrap(),
            vec![
                ("a".to_string(), b"1".to_vec()),
                ("b".to_string(), b"2".to_vec()),
                ("c".to_string(), b"3".to_vec()),
            ],
        );

        store.remove("obj").unwrap();
        assert!(matches!(store.remove("obj"), Err(Error::NoSuchObject(_))));
        assert!(matches!(store.stat("obj"), Err(Error::NoSuchObject(_))));

        // set_map_value creates implicitly, and old entries are gone.
        store.set_map_value("obj", "d", b"4").unwrap();
        assert_eq!(store.scan("obj").unwrap(), vec![("d".to_string(), b"4".to_vec())]);
    }
}
