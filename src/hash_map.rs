use core::borrow::Borrow;
use core::fmt::Debug;
use core::ops::Index;

use crate::error::Error;
use crate::error::Result;
use crate::hash::FixedSizeHash;
use crate::hash::HashFunctor;
use crate::hash::StringHash;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::small_string::SmallString;

/// A hash map built on [`HashTable`].
///
/// `HashMap<K, V, H>` stores key-value pairs in one contiguous block and hashes
/// keys with the [`HashFunctor`] strategy `H`. The default strategy,
/// [`FixedSizeHash`], hashes the raw bytes of plain-old-data keys; use
/// [`StringHashMap`] for string keys.
///
/// Each entry costs eight bytes of chain metadata on top of `(K, V)`. The
/// 32-bit hash is computed once per insertion and cached in the slot.
///
/// # Examples
///
/// ```rust
/// # use compact_collections::HashMap;
/// let mut scores: HashMap<u32, &str> = HashMap::new();
/// scores.add(7, "seven");
/// scores.set(9, "nine");
///
/// assert_eq!(scores.get(&7), Some(&"seven"));
/// assert_eq!(scores.set(9, "NINE"), Some("nine"));
/// assert!(scores.erase(&7));
/// assert_eq!(scores.len(), 1);
/// ```
#[derive(Clone)]
pub struct HashMap<K, V, H = FixedSizeHash> {
    table: HashTable<(K, V)>,
    hasher: H,
}

/// A [`HashMap`] keyed by [`SmallString`], hashed with each key's cached
/// string hash.
///
/// Lookups accept anything the key borrows as, including plain byte slices.
///
/// ```rust
/// # use compact_collections::SmallString;
/// # use compact_collections::StringHashMap;
/// let mut map = StringHashMap::new();
/// map.add(SmallString::from("width"), 640);
/// assert_eq!(map.get(b"width".as_slice()), Some(&640));
/// ```
pub type StringHashMap<V> = HashMap<SmallString, V, StringHash>;

impl<K, V, H> Debug for HashMap<K, V, H>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, H> HashMap<K, V, H> {
    /// Creates an empty map with the given hashing strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// # use compact_collections::hash::IdentityHash;
    /// let map: HashMap<u64, String, _> = HashMap::with_hasher(IdentityHash);
    /// assert!(map.is_empty());
    /// ```
    pub const fn with_hasher(hasher: H) -> Self {
        Self {
            table: HashTable::new(),
            hasher,
        }
    }

    /// Creates an empty map sized for `capacity` entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// # use compact_collections::hash::IdentityHash;
    /// let map: HashMap<u64, String, _> = HashMap::with_capacity_and_hasher(100, IdentityHash);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hasher,
        }
    }

    /// Returns the hashing strategy.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of allocated slots. See [`HashTable::raw_capacity`].
    pub fn raw_capacity(&self) -> usize {
        self.table.raw_capacity()
    }

    /// Number of entries the map holds before the next insertion expands it.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Drops every entry and frees the map's memory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u8, u8> = HashMap::new();
    /// map.add(1, 1);
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.raw_capacity(), 0);
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Resizes the map for `capacity` entries, never below [`len`](Self::len).
    /// See [`HashTable::set_capacity`].
    pub fn set_capacity(&mut self, capacity: usize) {
        self.table.set_capacity(capacity);
    }

    /// Fallible variant of [`set_capacity`](Self::set_capacity).
    pub fn try_set_capacity(&mut self, capacity: usize) -> Result<()> {
        self.table.try_set_capacity(capacity)
    }

    /// Shrinks the map when it is less than one third full.
    pub fn check_shrink(&mut self) {
        self.table.check_shrink();
    }

    /// Keeps only the entries for which `f` returns `true`.
    ///
    /// Entries are visited in slot order and removed through the visiting
    /// cursor; no other entry moves.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u32, u32> = (0..8).map(|i| (i, i * 10)).collect();
    /// map.retain(|k, v| {
    ///     *v += 1;
    ///     k % 2 == 0
    /// });
    /// assert_eq!(map.len(), 4);
    /// assert_eq!(map.get(&4), Some(&41));
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(k, v)| f(k, v));
    }

    /// An iterator over `(&K, &V)` in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator over `(&K, &mut V)` in slot order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// An iterator over the keys in slot order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// An iterator over the values in slot order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// An iterator over mutable values in slot order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes every entry, returning them in slot order. The map's memory is
    /// released immediately.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u32, char> = HashMap::new();
    /// map.add(1, 'a');
    /// map.add(2, 'b');
    ///
    /// let mut drained: Vec<_> = map.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, [(1, 'a'), (2, 'b')]);
    /// assert!(map.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Returns utilization statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }

    /// Histogram of chain lengths of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> alloc::vec::Vec<usize> {
        self.table.chain_histogram()
    }
}

impl<K, V, H> HashMap<K, V, H>
where
    K: Eq,
    H: HashFunctor<K>,
{
    /// Inserts an entry whose key is known to be absent.
    ///
    /// Adding a key that is already present is a logic error: it is caught by
    /// a debug assertion, and in release builds the map ends up with two
    /// entries for the key. Use [`set`](Self::set) to upsert or
    /// [`try_add`](Self::try_add) to check.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.add(1, "a");
    /// assert_eq!(map[&1], "a");
    /// ```
    pub fn add(&mut self, key: K, value: V) {
        debug_assert!(!self.contains_key(&key), "add: key already present");
        let hash = self.hasher.hash(&key);
        self.table.insert_unique(hash, (key, value));
    }

    /// Inserts an entry, failing if the key is present or the map cannot
    /// grow.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::Error;
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// assert_eq!(map.try_add(1, "a"), Ok(()));
    /// assert_eq!(map.try_add(1, "b"), Err(Error::DuplicateKey));
    /// assert_eq!(map[&1], "a");
    /// ```
    pub fn try_add(&mut self, key: K, value: V) -> Result<()> {
        let hash = self.hasher.hash(&key);
        if self.table.find(hash, |(k, _)| *k == key).is_some() {
            return Err(Error::DuplicateKey);
        }
        self.table.try_insert_unique(hash, (key, value))?;
        Ok(())
    }

    /// Inserts or replaces the value for `key`, returning the old value.
    ///
    /// The stored key is kept when a value is replaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// assert_eq!(map.set(37, "a"), None);
    /// assert_eq!(map.set(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hasher.hash(&key);
        match self.table.entry(hash, |(k, _)| *k == key) {
            TableEntry::Occupied(mut entry) => {
                Some(core::mem::replace(&mut entry.get_mut().1, value))
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Fallible variant of [`set`](Self::set). On error the map is unchanged.
    pub fn try_set(&mut self, key: K, value: V) -> Result<Option<V>> {
        let hash = self.hasher.hash(&key);
        match self.table.entry(hash, |(k, _)| *k == key) {
            TableEntry::Occupied(mut entry) => {
                Ok(Some(core::mem::replace(&mut entry.get_mut().1, value)))
            }
            TableEntry::Vacant(entry) => {
                entry.try_insert((key, value))?;
                Ok(None)
            }
        }
    }

    /// Returns a reference to the value for `key`.
    ///
    /// `key` may be any borrowed form of the key type, provided the hashing
    /// strategy hashes both forms identically.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u16, &str> = HashMap::new();
    /// map.add(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFunctor<Q>,
    {
        let hash = self.hasher.hash(key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFunctor<Q>,
    {
        let hash = self.hasher.hash(key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u16, i32> = HashMap::new();
    /// map.add(1, 10);
    /// if let Some(v) = map.get_mut(&1) {
    ///     *v += 5;
    /// }
    /// assert_eq!(map[&1], 15);
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFunctor<Q>,
    {
        let hash = self.hasher.hash(key);
        self.table
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFunctor<Q>,
    {
        self.get(key).is_some()
    }

    /// Returns the value for `key`, inserting `V::default()` first if absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut counts: HashMap<u8, u32> = HashMap::new();
    /// for b in *b"abca" {
    ///     *counts.get_or_insert_default(b) += 1;
    /// }
    /// assert_eq!(counts[&b'a'], 2);
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    /// Removes `key`, returning whether it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u32, ()> = HashMap::new();
    /// map.add(3, ());
    /// assert!(map.erase(&3));
    /// assert!(!map.erase(&3));
    /// ```
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFunctor<Q>,
    {
        self.remove_entry(key).is_some()
    }

    /// Removes `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFunctor<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` and returns the stored key and value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u32, &str> = HashMap::new();
    /// map.add(1, "a");
    /// assert_eq!(map.remove_entry(&1), Some((1, "a")));
    /// assert_eq!(map.remove_entry(&1), None);
    /// ```
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFunctor<Q>,
    {
        let hash = self.hasher.hash(key);
        self.table.remove(hash, |(k, _)| k.borrow() == key)
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let mut map: HashMap<u32, u32> = HashMap::new();
    /// *map.entry(1).or_insert(10) += 1;
    /// map.entry(1).and_modify(|v| *v *= 2).or_insert(0);
    /// assert_eq!(map[&1], 22);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let hash = self.hasher.hash(&key);
        match self.table.entry(hash, |(k, _)| *k == key) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }
}

impl<K, V, H> HashMap<K, V, H>
where
    H: Default,
{
    /// Creates an empty map using the default hashing strategy. Nothing is
    /// allocated until the first insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let map: HashMap<i32, String> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.raw_capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }

    /// Creates an empty map sized for `capacity` entries using the default
    /// hashing strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::HashMap;
    /// let map: HashMap<i32, String> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, H::default())
    }
}

impl<K, V, H> Default for HashMap<K, V, H>
where
    H: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> PartialEq for HashMap<K, V, H>
where
    K: Eq,
    V: PartialEq,
    H: HashFunctor<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| v == ov))
    }
}

impl<K, V, H> Eq for HashMap<K, V, H>
where
    K: Eq,
    V: Eq,
    H: HashFunctor<K>,
{
}

impl<K, V, H> Extend<(K, V)> for HashMap<K, V, H>
where
    K: Eq,
    H: HashFunctor<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V, H> FromIterator<(K, V)> for HashMap<K, V, H>
where
    K: Eq,
    H: HashFunctor<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, Q, V, H> Index<&Q> for HashMap<K, V, H>
where
    K: Eq + Borrow<Q>,
    Q: Eq + ?Sized,
    H: HashFunctor<K> + HashFunctor<Q>,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key not found in HashMap"),
        }
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value if the entry is occupied.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V> Entry<'a, K, V>
where
    V: Default,
{
    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V> {
    entry: crate::hash_table::VacantEntry<'a, (K, V)>,
    key: K,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value, expanding the map if needed, and returns a mutable
    /// reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V> {
    entry: crate::hash_table::OccupiedEntry<'a, (K, V)>,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// Gets a reference to the stored key.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Replaces the value and returns the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the entries of a [`HashMap`].
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a [`HashMap`].
pub struct IterMut<'a, K, V> {
    inner: crate::hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A mutable iterator over the values of a [`HashMap`].
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A draining iterator over the entries of a [`HashMap`].
pub struct Drain<'a, K, V> {
    inner: crate::hash_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An owning iterator over the entries of a [`HashMap`].
pub struct IntoIter<K, V> {
    inner: crate::hash_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, H> IntoIterator for &'a HashMap<K, V, H> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, H> IntoIterator for &'a mut HashMap<K, V, H> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, H> IntoIterator for HashMap<K, V, H> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use proptest::prelude::*;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::hash::BuildHasherHash;
    use crate::hash::IdentityHash;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type SipMap<K, V> = HashMap<K, V, BuildHasherHash<SipHashBuilder>>;

    #[test]
    fn test_new_and_with_hasher() {
        let map: HashMap<u32, String> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.raw_capacity(), 0);

        let map: SipMap<u32, String> = HashMap::with_hasher(BuildHasherHash::default());
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), 0);
    }

    #[test]
    fn test_with_capacity() {
        let map: HashMap<u32, String> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert_eq!(map.raw_capacity(), 256);
        assert!(map.is_empty());
    }

    #[test]
    fn test_add_and_get() {
        let mut map: HashMap<u32, &str> = HashMap::new();
        map.add(1, "one");
        map.add(2, "two");
        map.add(3, "three");

        assert_eq!(map.size(), 3);
        assert_eq!(map.get(&1), Some(&"one"));
        assert_eq!(map.get(&2), Some(&"two"));
        assert_eq!(map.get(&3), Some(&"three"));
        assert_eq!(map.get(&4), None);
        assert_eq!(map.get_key_value(&2), Some((&2, &"two")));
    }

    #[test]
    fn test_try_add_rejects_duplicates() {
        let mut map: HashMap<u64, i32> = HashMap::new();
        assert_eq!(map.try_add(5, 1), Ok(()));
        assert_eq!(map.try_add(5, 2), Err(Error::DuplicateKey));
        assert_eq!(map[&5], 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "key already present")]
    fn test_add_duplicate_asserts() {
        let mut map: HashMap<u64, i32> = HashMap::new();
        map.add(5, 1);
        map.add(5, 2);
    }

    #[test]
    fn test_set() {
        let mut map: SipMap<String, i32> = HashMap::default();
        assert_eq!(map.set("a".to_string(), 1), None);
        assert_eq!(map.set("a".to_string(), 2), Some(1));
        assert_eq!(map.try_set("b".to_string(), 3), Ok(None));
        assert_eq!(map.try_set("b".to_string(), 4), Ok(Some(3)));
        assert_eq!(map.get("a"), Some(&2));
        assert_eq!(map.get("b"), Some(&4));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_get_mut() {
        let mut map: HashMap<i32, i32> = HashMap::new();
        map.add(1, 10);

        if let Some(value) = map.get_mut(&1) {
            *value = 20;
        }

        assert_eq!(map.get(&1), Some(&20));
        assert!(map.get_mut(&2).is_none());
    }

    #[test]
    fn test_contains_key() {
        let mut map: HashMap<i32, &str> = HashMap::new();
        map.add(1, "one");

        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn test_get_or_insert_default() {
        let mut map: HashMap<u8, Vec<u32>> = HashMap::new();
        map.get_or_insert_default(1).push(10);
        map.get_or_insert_default(1).push(11);
        map.get_or_insert_default(2);

        assert_eq!(map[&1], vec![10, 11]);
        assert_eq!(map[&2], Vec::<u32>::new());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_erase_and_remove() {
        let mut map: HashMap<i32, &str> = HashMap::new();
        map.add(1, "one");
        map.add(2, "two");
        map.add(3, "three");

        assert!(map.erase(&1));
        assert!(!map.erase(&1));
        assert_eq!(map.remove(&2), Some("two"));
        assert_eq!(map.remove(&2), None);
        assert_eq!(map.remove_entry(&3), Some((3, "three")));
        assert!(map.is_empty());
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_panics() {
        let map: HashMap<i32, i32> = HashMap::new();
        let _ = map[&1];
    }

    #[test]
    fn test_clear() {
        let mut map: HashMap<i32, &str> = HashMap::new();
        map.add(1, "one");
        map.add(2, "two");

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.raw_capacity(), 0);
        assert_eq!(map.get(&1), None);

        map.add(3, "three");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_set_capacity_and_shrink() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        map.set_capacity(1000);
        assert_eq!(map.raw_capacity(), 2048);
        for i in 0..100 {
            map.add(i, i);
        }

        map.check_shrink();
        assert_eq!(map.raw_capacity(), 256);
        for i in 0..100 {
            assert_eq!(map.get(&i), Some(&i));
        }

        assert_eq!(map.try_set_capacity(usize::MAX), Err(Error::CapacityOverflow));
        assert_eq!(map.raw_capacity(), 256);
        assert_eq!(map.len(), 100);
    }

    #[test]
    fn test_entry_api() {
        let mut map: HashMap<u32, i32> = HashMap::new();

        let value = map.entry(1).or_insert(10);
        assert_eq!(*value, 10);
        *value = 20;

        let value = map.entry(1).or_insert(30);
        assert_eq!(*value, 20);

        map.entry(2).or_insert_with(|| 40);
        map.entry(2).and_modify(|v| *v += 1).or_insert(0);
        assert_eq!(map[&2], 41);

        *map.entry(3).or_default() += 7;
        assert_eq!(map[&3], 7);
        assert_eq!(map.entry(4).key(), &4);
    }

    #[test]
    fn test_occupied_entry() {
        let mut map: HashMap<u32, String> = HashMap::new();
        map.add(1, "one".to_string());

        match map.entry(1) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), "one");
                entry.get_mut().push('!');
                assert_eq!(entry.insert("uno".to_string()), "one!");
                assert_eq!(entry.remove_entry(), (1, "uno".to_string()));
            }
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }
        assert!(map.is_empty());

        map.add(2, "two".to_string());
        match map.entry(2) {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), "two"),
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }
    }

    #[test]
    fn test_vacant_entry() {
        let mut map: HashMap<u32, String> = HashMap::new();

        match map.entry(1) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &1);
                entry.insert("one".to_string()).push('!');
            }
            Entry::Occupied(_) => panic!("expected vacant entry"),
        }
        assert_eq!(map[&1], "one!");

        match map.entry(2) {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), 2),
            Entry::Occupied(_) => panic!("expected vacant entry"),
        }
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_iterators() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        for i in 0..10 {
            map.add(i, i * 10);
        }

        assert_eq!(map.iter().len(), 10);
        let mut pairs: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.sort();
        assert_eq!(pairs, (0..10).map(|i| (i, i * 10)).collect::<Vec<_>>());

        let mut keys: Vec<_> = map.keys().copied().collect();
        keys.sort();
        assert_eq!(keys, (0..10).collect::<Vec<_>>());

        for v in map.values_mut() {
            *v += 1;
        }
        for (_, v) in &mut map {
            *v += 1;
        }
        let sum: u32 = map.values().sum();
        assert_eq!(sum, (0..10).map(|i| i * 10 + 2).sum());

        let mut owned: Vec<_> = map.into_iter().collect();
        owned.sort();
        assert_eq!(owned[9], (9, 92));
    }

    #[test]
    fn test_drain() {
        let mut map: HashMap<u32, String> = HashMap::new();
        for i in 0..20 {
            map.add(i, format!("v{i}"));
        }

        let mut drained: Vec<_> = map.drain().collect();
        drained.sort();
        assert_eq!(drained.len(), 20);
        assert_eq!(drained[3], (3, "v3".to_string()));
        assert!(map.is_empty());

        map.add(1, "again".to_string());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_retain() {
        let mut map: HashMap<u32, u32> = (0..300).map(|i| (i, i)).collect();
        map.retain(|k, v| {
            *v *= 2;
            k % 5 != 0
        });

        assert_eq!(map.len(), 240);
        for i in 0..300 {
            if i % 5 == 0 {
                assert!(!map.contains_key(&i));
            } else {
                assert_eq!(map.get(&i), Some(&(i * 2)));
            }
        }
    }

    #[test]
    fn test_clone_eq_debug() {
        let mut map: HashMap<u8, u8> = HashMap::new();
        map.add(1, 2);
        map.add(3, 4);

        let mut cloned = map.clone();
        assert_eq!(cloned, map);
        assert_eq!(
            cloned.iter().collect::<Vec<_>>(),
            map.iter().collect::<Vec<_>>()
        );

        cloned.set(1, 9);
        assert_ne!(cloned, map);
        cloned.set(1, 2);
        cloned.add(5, 6);
        assert_ne!(cloned, map);

        let mut single: HashMap<u8, u8> = HashMap::new();
        single.add(1, 2);
        assert_eq!(format!("{single:?}"), "{1: 2}");
    }

    #[test]
    fn test_extend_overwrites() {
        let mut map: HashMap<u16, &str> = HashMap::new();
        map.extend([(1, "a"), (2, "b")]);
        map.extend([(2, "B"), (3, "C")]);
        assert_eq!(map.len(), 3);
        assert_eq!(map[&2], "B");
    }

    #[test]
    fn test_collision_handling() {
        let mut map: HashMap<u32, u32, _> = HashMap::with_hasher(IdentityHash);

        // Keys pile up in one or two chains at every table size.
        for i in 0..1000 {
            map.add(i * 1024, i * 2);
        }
        assert_eq!(map.len(), 1000);
        for i in 0..1000 {
            assert_eq!(map.get(&(i * 1024)), Some(&(i * 2)));
        }

        for i in (0..1000).step_by(2) {
            assert_eq!(map.remove(&(i * 1024)), Some(i * 2));
        }
        assert_eq!(map.len(), 500);
        for i in (1..1000).step_by(2) {
            assert_eq!(map.get(&(i * 1024)), Some(&(i * 2)));
        }
    }

    #[test]
    fn test_erase_in_shared_chain() {
        let mut map: HashMap<u32, char, _> = HashMap::with_hasher(IdentityHash);
        for (k, v) in [(0, 'a'), (16, 'b'), (32, 'c')] {
            map.add(k, v);
        }
        assert_eq!(map.raw_capacity(), 16);

        for erased in [0, 32] {
            let mut m = map.clone();
            assert!(m.erase(&erased));
            m.add(48, 'd');
            for (k, v) in [(0, 'a'), (16, 'b'), (32, 'c'), (48, 'd')] {
                let expected = (k != erased).then_some(&v);
                assert_eq!(m.get(&k), expected, "erased {erased}: {m:?}");
            }
            assert_eq!(m.len(), 3);
        }
    }

    #[test]
    fn test_string_keys() {
        let mut map: StringHashMap<i32> = StringHashMap::new();

        map.add(SmallString::from("hello"), 1);
        map.add(SmallString::from("world"), 2);
        map.add(SmallString::from("a considerably longer key"), 3);

        assert_eq!(map.get(&SmallString::from("hello")), Some(&1));
        assert_eq!(map.get(b"world".as_slice()), Some(&2));
        assert_eq!(map.get(b"a considerably longer key".as_slice()), Some(&3));
        assert_eq!(map.get(b"missing".as_slice()), None);

        assert!(map.erase(b"hello".as_slice()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_complex_values() {
        let mut map: SipMap<String, Vec<i32>> = HashMap::default();

        map.add("first".to_string(), vec![1, 2, 3]);
        map.add("second".to_string(), vec![4, 5, 6]);

        if let Some(v) = map.get_mut("first") {
            v.push(4);
        }

        assert_eq!(map.get("first"), Some(&vec![1, 2, 3, 4]));
        assert_eq!(map.get("second"), Some(&vec![4, 5, 6]));
    }

    #[test]
    fn test_stats_follow_map() {
        let mut map: HashMap<u32, u32, _> = HashMap::with_hasher(IdentityHash);
        for i in 0..8 {
            map.add(i * 16, i);
        }
        let stats = map.debug_stats();
        assert_eq!(stats.populated, 8);
        assert_eq!(stats.chains, 1);
        assert_eq!(stats.longest_chain, 8);
        assert_eq!(map.chain_histogram()[8], 1);
    }

    proptest! {
        #[test]
        fn behaves_like_btree_map(
            ops in proptest::collection::vec((0u8..5, 0u16..64, any::<u32>()), 0..300)
        ) {
            let mut map: HashMap<u16, u32> = HashMap::new();
            let mut model = BTreeMap::new();

            for (op, key, value) in ops {
                match op {
                    0 => prop_assert_eq!(map.set(key, value), model.insert(key, value)),
                    1 => prop_assert_eq!(map.remove(&key), model.remove(&key)),
                    2 => prop_assert_eq!(map.get(&key), model.get(&key)),
                    3 => {
                        let added = map.try_add(key, value).is_ok();
                        prop_assert_eq!(added, !model.contains_key(&key));
                        model.entry(key).or_insert(value);
                    }
                    _ => {
                        map.retain(|k, _| k % 3 != 0);
                        model.retain(|k, _| k % 3 != 0);
                        map.check_shrink();
                    }
                }
                prop_assert_eq!(map.len(), model.len());
            }

            let mut entries: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
            entries.sort();
            prop_assert_eq!(entries, model.into_iter().collect::<Vec<_>>());
        }
    }
}
