use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::error::OnError;
use crate::error::Result;
use crate::error::infallible;

/// `next_in_chain` value of a slot that holds nothing.
const EMPTY: i32 = -2;

/// `next_in_chain` value of the last entry in a chain.
const END_OF_CHAIN: i32 = -1;

/// `hash_value` of a non-empty slot that marks a deleted chain root.
const TOMBSTONE_HASH: u32 = u32::MAX;

/// Smallest raw capacity ever allocated.
const MIN_RAW_CAPACITY: usize = 16;

/// Chain links are `i32` slot indices.
const MAX_RAW_CAPACITY: usize = 1 << 31;

/// Maps a caller hash onto the stored hash space, which excludes
/// [`TOMBSTONE_HASH`].
#[inline(always)]
fn fix_hash(hash: u32) -> u32 {
    if hash == TOMBSTONE_HASH {
        hash ^ 0x8000
    } else {
        hash
    }
}

#[repr(C)]
struct Header {
    entry_count: usize,
    size_mask: usize,
}

/// One table slot. The state is encoded in the two metadata words:
///
/// - `next_in_chain == EMPTY`: empty, `value` uninitialized.
/// - `hash_value == TOMBSTONE_HASH`: a deleted chain root that still links to
///   the rest of its chain, `value` uninitialized.
/// - otherwise occupied, `value` initialized.
#[repr(C)]
struct Slot<T> {
    next_in_chain: i32,
    hash_value: u32,
    value: MaybeUninit<T>,
}

impl<T> Slot<T> {
    #[inline(always)]
    fn empty() -> Self {
        Slot {
            next_in_chain: EMPTY,
            hash_value: 0,
            value: MaybeUninit::uninit(),
        }
    }

    #[inline(always)]
    fn occupied(hash_value: u32, next_in_chain: i32, value: T) -> Self {
        Slot {
            next_in_chain,
            hash_value,
            value: MaybeUninit::new(value),
        }
    }

    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.next_in_chain == EMPTY
    }

    #[inline(always)]
    fn is_tombstone(&self) -> bool {
        !self.is_empty() && self.hash_value == TOMBSTONE_HASH
    }

    #[inline(always)]
    fn is_occupied(&self) -> bool {
        !self.is_empty() && self.hash_value != TOMBSTONE_HASH
    }

    /// Moves the slot's contents out, leaving its value uninitialized. The
    /// caller must overwrite or re-mark the source slot.
    #[inline(always)]
    fn take(&mut self) -> Self {
        Slot {
            next_in_chain: self.next_in_chain,
            hash_value: self.hash_value,
            value: core::mem::replace(&mut self.value, MaybeUninit::uninit()),
        }
    }
}

#[derive(Debug)]
struct DataLayout {
    layout: Layout,
    slots_offset: usize,
}

impl DataLayout {
    fn new<T>(raw_capacity: usize) -> Option<Self> {
        let slots = Layout::array::<Slot<T>>(raw_capacity).ok()?;
        let (layout, slots_offset) = Layout::new::<Header>().extend(slots).ok()?;

        Some(DataLayout {
            layout: layout.pad_to_align(),
            slots_offset,
        })
    }
}

/// Debug statistics for hash table analysis.
///
/// Only available in tests or with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of entries currently in the table
    pub populated: usize,
    /// Number of entries the table holds before it expands
    pub capacity: usize,
    /// Total number of slots allocated
    pub raw_capacity: usize,
    /// Deleted chain roots still linking their chains
    pub tombstones: usize,
    /// Entries stored outside their natural slot
    pub displaced: usize,
    /// Number of non-empty chains
    pub chains: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Load factor (populated / raw_capacity)
    pub load_factor: f64,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% of {} slots)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.raw_capacity
        );
        println!(
            "Chains: {} (longest {}), {} displaced entries",
            self.chains, self.longest_chain, self.displaced
        );
        println!("Tombstones: {}", self.tombstones);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// A flat hash table with internal chaining and tombstone deletion.
///
/// `HashTable<T>` stores values of type `T` in a single heap block: a small
/// header followed by a power-of-two array of slots. Colliding entries are
/// chained through slot indices rather than pointers, so the block contains
/// no absolute addresses and a byte-for-byte copy of it is a valid table.
///
/// Like a raw table, it does not know how to hash or compare values: every
/// operation takes the 32-bit hash of the key being looked up and an equality
/// predicate. The hash given at insertion is stored next to the value and
/// reused on every rehash.
///
/// Every entry lives in its chain's natural slot (`hash & (raw_capacity - 1)`)
/// or is reachable from it. Removing an entry never moves another entry.
///
/// ## Example
///
/// ```rust
/// use compact_collections::hash::HASH_SEED;
/// use compact_collections::hash::bernstein_hash;
/// use compact_collections::hash_table::Entry;
/// use compact_collections::hash_table::HashTable;
///
/// #[derive(Debug, PartialEq)]
/// struct Person {
///     name: &'static str,
///     age: u32,
/// }
///
/// let hash = |name: &str| bernstein_hash(name.as_bytes(), HASH_SEED);
///
/// let mut table = HashTable::new();
/// match table.entry(hash("alice"), |p: &Person| p.name == "alice") {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             name: "alice",
///             age: 30,
///         });
///     }
///     Entry::Occupied(_) => unreachable!(),
/// }
///
/// let alice = table.find(hash("alice"), |p| p.name == "alice");
/// assert_eq!(alice.map(|p| p.age), Some(30));
/// ```
pub struct HashTable<T> {
    alloc: Option<NonNull<u8>>,
    _phantom: PhantomData<T>,
}

// SAFETY: The table exclusively owns its values.
unsafe impl<T: Send> Send for HashTable<T> {}
// SAFETY: Shared access only hands out `&T`.
unsafe impl<T: Sync> Sync for HashTable<T> {}

impl<T: Debug> Debug for HashTable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::vec::Vec;

        let slots = self
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_empty())
            .map(|(i, slot)| {
                if slot.is_tombstone() {
                    format!("{i:>3}: <tombstone> -> {}", slot.next_in_chain)
                } else {
                    // SAFETY: Occupied slots hold initialized values.
                    let value = unsafe { slot.value.assume_init_ref() };
                    format!(
                        "{i:>3}: {:08x} {value:?} -> {}",
                        slot.hash_value, slot.next_in_chain
                    )
                }
            })
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("populated", &self.len())
            .field("raw_capacity", &self.raw_capacity())
            .field("slots", &slots)
            .finish()
    }
}

impl<T: Clone> Clone for HashTable<T> {
    /// Copies the table slot for slot, so the clone has the same layout and
    /// chain structure as `self`.
    fn clone(&self) -> Self {
        let Some(header) = self.header() else {
            return Self::new();
        };

        let raw_capacity = header.size_mask + 1;
        let mut new_table = Self {
            alloc: Some(infallible(Self::allocate(raw_capacity, OnError::Abort))),
            _phantom: PhantomData,
        };

        let dst = new_table.slots_mut();
        for (src, dst) in self.slots().iter().zip(dst.iter_mut()) {
            let value = if src.is_occupied() {
                // SAFETY: Occupied slots hold initialized values.
                MaybeUninit::new(unsafe { src.value.assume_init_ref() }.clone())
            } else {
                MaybeUninit::uninit()
            };
            *dst = Slot {
                next_in_chain: src.next_in_chain,
                hash_value: src.hash_value,
                value,
            };
        }

        if let Some(new_header) = new_table.header_mut() {
            new_header.entry_count = header.entry_count;
        }
        new_table
    }
}

impl<T> Drop for HashTable<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for HashTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HashTable<T> {
    const SLOTS_OFFSET: usize = size_of::<Header>().next_multiple_of(align_of::<Slot<T>>());

    /// Creates an empty table. No memory is allocated until the first
    /// insertion.
    pub const fn new() -> Self {
        Self {
            alloc: None,
            _phantom: PhantomData,
        }
    }

    /// Creates a table that can hold at least `capacity` entries without
    /// expanding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::hash_table::HashTable;
    /// let table: HashTable<u64> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert_eq!(table.raw_capacity(), 256);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        table.set_capacity(capacity);
        table
    }

    /// Allocates a block of `raw_capacity` empty slots.
    fn allocate(raw_capacity: usize, on_err: OnError) -> Result<NonNull<u8>> {
        debug_assert!(raw_capacity.is_power_of_two());
        if raw_capacity > MAX_RAW_CAPACITY {
            return Err(on_err.overflow());
        }
        let layout = DataLayout::new::<T>(raw_capacity).ok_or_else(|| on_err.overflow())?;
        debug_assert_eq!(layout.slots_offset, Self::SLOTS_OFFSET);

        // SAFETY: The layout always includes the header, so its size is
        // non-zero.
        let raw_alloc = unsafe { alloc::alloc::alloc(layout.layout) };
        let Some(alloc) = NonNull::new(raw_alloc) else {
            return Err(on_err.alloc_failed(layout.layout));
        };

        // SAFETY: The allocation is sized and aligned for a header followed by
        // `raw_capacity` slots.
        unsafe {
            alloc.cast::<Header>().write(Header {
                entry_count: 0,
                size_mask: raw_capacity - 1,
            });
            let slots = alloc.add(Self::SLOTS_OFFSET).cast::<Slot<T>>();
            for i in 0..raw_capacity {
                slots.add(i).write(Slot::empty());
            }
        }

        Ok(alloc)
    }

    fn header(&self) -> Option<&Header> {
        // SAFETY: A present allocation always starts with an initialized
        // header.
        self.alloc.map(|alloc| unsafe { alloc.cast::<Header>().as_ref() })
    }

    fn header_mut(&mut self) -> Option<&mut Header> {
        // SAFETY: As in `header`; `&mut self` guarantees uniqueness.
        self.alloc.map(|alloc| unsafe { alloc.cast::<Header>().as_mut() })
    }

    fn slots(&self) -> &[Slot<T>] {
        match self.alloc {
            // SAFETY: The slots follow the header and are all initialized
            // (their metadata, that is; values are `MaybeUninit`).
            Some(alloc) => unsafe {
                let len = alloc.cast::<Header>().as_ref().size_mask + 1;
                core::slice::from_raw_parts(alloc.add(Self::SLOTS_OFFSET).cast().as_ptr(), len)
            },
            None => &[],
        }
    }

    fn slots_mut(&mut self) -> &mut [Slot<T>] {
        match self.alloc {
            // SAFETY: As in `slots`; `&mut self` guarantees uniqueness.
            Some(alloc) => unsafe {
                let len = alloc.cast::<Header>().as_ref().size_mask + 1;
                core::slice::from_raw_parts_mut(
                    alloc.add(Self::SLOTS_OFFSET).cast().as_ptr(),
                    len,
                )
            },
            None => &mut [],
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.header().map_or(0, |h| h.entry_count)
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of allocated slots: zero, or a power of two of at least 16.
    pub fn raw_capacity(&self) -> usize {
        self.header().map_or(0, |h| h.size_mask + 1)
    }

    /// Number of entries the table can hold before an insertion expands it.
    ///
    /// An insertion expands the table first when the table is more than two
    /// thirds full.
    pub fn capacity(&self) -> usize {
        match self.raw_capacity() {
            0 => 0,
            raw => raw * 2 / 3 + 1,
        }
    }

    /// Returns an iterator over all values in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::hash_table::HashTable;
    /// let mut table = HashTable::new();
    /// table.insert_unique(1, "one");
    /// table.insert_unique(2, "two");
    ///
    /// let mut values: Vec<_> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, ["one", "two"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self.slots().iter(),
            remaining: self.len(),
        }
    }

    /// Returns an iterator over mutable references to all values in slot
    /// order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let remaining = self.len();
        IterMut {
            slots: self.slots_mut().iter_mut(),
            remaining,
        }
    }

    /// Removes every value from the table, returning them in slot order.
    ///
    /// The table is empty and unallocated as soon as this returns; values the
    /// iterator does not yield are dropped with it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::hash_table::HashTable;
    /// let mut table = HashTable::new();
    /// table.insert_unique(7, 'a');
    /// table.insert_unique(9, 'b');
    ///
    /// let drained: Vec<char> = table.drain().collect();
    /// assert_eq!(drained.len(), 2);
    /// assert!(table.is_empty());
    /// assert_eq!(table.raw_capacity(), 0);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: IntoIter {
                table: core::mem::take(self),
                index: 0,
            },
            _phantom: PhantomData,
        }
    }

    /// Drops every value and frees the table's memory.
    pub fn clear(&mut self) {
        let Some(alloc) = self.alloc else {
            return;
        };

        if core::mem::needs_drop::<T>() {
            for slot in self.slots_mut() {
                if slot.is_occupied() {
                    // Unlink first so a panicking destructor cannot lead to a
                    // double drop.
                    slot.next_in_chain = EMPTY;
                    // SAFETY: The slot was occupied, so its value is
                    // initialized; it is now marked empty.
                    unsafe { slot.value.assume_init_drop() };
                }
            }
        }

        let raw_capacity = self.raw_capacity();
        self.alloc = None;
        if let Some(layout) = DataLayout::new::<T>(raw_capacity) {
            // SAFETY: The block was allocated with exactly this layout.
            unsafe { alloc::alloc::dealloc(alloc.as_ptr(), layout.layout) };
        }
    }

    /// Resizes the table so it can comfortably hold `capacity` entries.
    ///
    /// The raw capacity becomes `capacity * 3 / 2` rounded up to a power of
    /// two, at least 16. `capacity` is raised to `len()` if smaller, so this
    /// never loses entries. `set_capacity(0)` on an empty table frees its
    /// memory.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows; aborts if allocation fails. See
    /// [`try_set_capacity`](Self::try_set_capacity).
    pub fn set_capacity(&mut self, capacity: usize) {
        infallible(self.set_capacity_inner(capacity, OnError::Abort));
    }

    /// Fallible variant of [`set_capacity`](Self::set_capacity).
    ///
    /// On error the table is left unchanged.
    pub fn try_set_capacity(&mut self, capacity: usize) -> Result<()> {
        self.set_capacity_inner(capacity, OnError::ReturnErr)
    }

    fn set_capacity_inner(&mut self, capacity: usize, on_err: OnError) -> Result<()> {
        let capacity = capacity.max(self.len());
        if capacity == 0 {
            self.clear();
            return Ok(());
        }

        let raw_capacity = (capacity.checked_mul(3).ok_or_else(|| on_err.overflow())? / 2)
            .checked_next_power_of_two()
            .ok_or_else(|| on_err.overflow())?
            .max(MIN_RAW_CAPACITY);

        if raw_capacity == self.raw_capacity() {
            return Ok(());
        }
        self.resize(raw_capacity, on_err)
    }

    /// Shrinks the table when it is less than one third full.
    ///
    /// An empty table is freed entirely. Shrinking never happens implicitly.
    pub fn check_shrink(&mut self) {
        let raw_capacity = self.raw_capacity();
        if raw_capacity > 0 && self.len() * 3 < raw_capacity {
            log::debug!(
                "shrinking hash table: {} entries in {} slots",
                self.len(),
                raw_capacity
            );
            self.set_capacity(self.len());
        }
    }

    /// Makes room for one more entry, expanding when more than two thirds
    /// full.
    fn check_expand(&mut self, on_err: OnError) -> Result<()> {
        match self.header() {
            None => self.resize(MIN_RAW_CAPACITY, on_err),
            Some(header) if header.entry_count * 3 > (header.size_mask + 1) * 2 => {
                let doubled = (header.size_mask + 1)
                    .checked_mul(2)
                    .ok_or_else(|| on_err.overflow())?;
                self.resize(doubled, on_err)
            }
            Some(_) => Ok(()),
        }
    }

    /// Moves every entry into a fresh block of `raw_capacity` slots, reusing
    /// the stored hashes.
    fn resize(&mut self, raw_capacity: usize, on_err: OnError) -> Result<()> {
        let new_alloc = Self::allocate(raw_capacity, on_err)?;

        log::trace!(
            "rehashing {} entries: {} -> {} slots",
            self.len(),
            self.raw_capacity(),
            raw_capacity
        );

        let mut old = Self {
            alloc: self.alloc.replace(new_alloc),
            _phantom: PhantomData,
        };

        for slot in old.slots_mut() {
            if slot.is_occupied() {
                let moved = slot.take();
                slot.next_in_chain = EMPTY;
                // SAFETY: The slot was occupied; its value now belongs to the
                // new table.
                let value = unsafe { moved.value.assume_init() };
                self.place(moved.hash_value, value);
            }
        }

        if let Some(header) = old.header_mut() {
            header.entry_count = 0;
        }
        drop(old);

        Ok(())
    }

    /// Finds the slot holding the entry with hash `hash` that satisfies `eq`.
    fn find_index(&self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<usize> {
        let hash = fix_hash(hash);
        let slots = self.slots();
        if slots.is_empty() {
            return None;
        }

        let mask = slots.len() - 1;
        let mut index = hash as usize & mask;
        let root = &slots[index];
        if root.is_empty() || (root.is_occupied() && root.hash_value as usize & mask != index) {
            return None;
        }

        loop {
            let slot = &slots[index];
            // A stored hash never equals `TOMBSTONE_HASH`, so a match means
            // the slot is occupied.
            // SAFETY: See above.
            if slot.hash_value == hash && eq(unsafe { slot.value.assume_init_ref() }) {
                return Some(index);
            }

            if slot.next_in_chain == END_OF_CHAIN {
                return None;
            }
            debug_assert!(slot.next_in_chain >= 0);
            index = slot.next_in_chain as usize;
        }
    }

    /// Places `value` under the already fixed `hash`, returning its slot.
    ///
    /// The new entry always lands in its natural slot. The table must have at
    /// least one empty or tombstone slot besides the natural one.
    fn place(&mut self, hash: u32, value: T) -> usize {
        debug_assert_ne!(hash, TOMBSTONE_HASH);

        if let Some(header) = self.header_mut() {
            header.entry_count += 1;
        }

        let slots = self.slots_mut();
        let mask = slots.len() - 1;
        let index = hash as usize & mask;

        if slots[index].is_empty() {
            slots[index] = Slot::occupied(hash, END_OF_CHAIN, value);
            return index;
        }

        if slots[index].is_tombstone() {
            // Take over the chain root without disturbing the rest of the
            // chain.
            let next = slots[index].next_in_chain;
            slots[index] = Slot::occupied(hash, next, value);
            return index;
        }

        let mut blank = index;
        loop {
            blank = (blank + 1) & mask;
            debug_assert_ne!(blank, index, "hash table has no blank slot");
            if slots[blank].is_empty() {
                break;
            }
            if slots[blank].is_tombstone() {
                blank = Self::reclaim_tombstone(slots, blank);
                break;
            }
        }

        if blank == index {
            // Reclaiming pulled the natural slot's foreign occupant into the
            // tombstone, so the natural slot is free now.
            slots[index] = Slot::occupied(hash, END_OF_CHAIN, value);
            return index;
        }

        let occupant_root = slots[index].hash_value as usize & mask;
        if occupant_root == index {
            // Same chain: the old head moves out and the new entry heads the
            // chain.
            slots[blank] = slots[index].take();
            slots[index] = Slot::occupied(hash, blank as i32, value);
        } else {
            // The occupant belongs to another chain; relink its predecessor to
            // the blank slot and move it there.
            let mut prev = occupant_root;
            while slots[prev].next_in_chain as usize != index {
                debug_assert!(slots[prev].next_in_chain >= 0);
                prev = slots[prev].next_in_chain as usize;
            }
            slots[prev].next_in_chain = blank as i32;
            slots[blank] = slots[index].take();
            slots[index] = Slot::occupied(hash, END_OF_CHAIN, value);
        }

        index
    }

    /// Pulls the tombstone's chain successor into the tombstone and returns
    /// the slot it vacated.
    fn reclaim_tombstone(slots: &mut [Slot<T>], tombstone: usize) -> usize {
        debug_assert!(slots[tombstone].is_tombstone());
        debug_assert!(slots[tombstone].next_in_chain >= 0);

        let successor = slots[tombstone].next_in_chain as usize;
        slots[tombstone] = slots[successor].take();
        slots[successor] = Slot::empty();
        successor
    }

    /// Removes the entry at `index` and returns its value. No other entry
    /// moves.
    fn erase_at(&mut self, index: usize) -> T {
        let slots = self.slots_mut();
        let mask = slots.len() - 1;
        debug_assert!(slots[index].is_occupied());

        let natural = slots[index].hash_value as usize & mask;
        let next = slots[index].next_in_chain;
        // SAFETY: `index` is occupied; the slot is re-marked below so the
        // value is not read again.
        let value = unsafe { slots[index].value.assume_init_read() };

        if index != natural {
            let mut prev = natural;
            while slots[prev].next_in_chain as usize != index {
                debug_assert!(slots[prev].next_in_chain >= 0);
                prev = slots[prev].next_in_chain as usize;
            }
            if slots[prev].is_tombstone() && next == END_OF_CHAIN {
                // The tombstone has nothing left to link to.
                slots[prev] = Slot::empty();
            } else {
                slots[prev].next_in_chain = next;
            }
            slots[index] = Slot::empty();
        } else if next != END_OF_CHAIN {
            slots[index].hash_value = TOMBSTONE_HASH;
        } else {
            slots[index] = Slot::empty();
        }

        if let Some(header) = self.header_mut() {
            header.entry_count -= 1;
        }
        value
    }

    fn value_ref(&self, index: usize) -> &T {
        let slot = &self.slots()[index];
        debug_assert!(slot.is_occupied());
        // SAFETY: Callers only pass indices of occupied slots.
        unsafe { slot.value.assume_init_ref() }
    }

    fn value_mut(&mut self, index: usize) -> &mut T {
        let slot = &mut self.slots_mut()[index];
        debug_assert!(slot.is_occupied());
        // SAFETY: Callers only pass indices of occupied slots.
        unsafe { slot.value.assume_init_mut() }
    }

    /// Inserts `value` under `hash` without checking for an existing equal
    /// entry, expanding the table first if needed.
    ///
    /// The caller must make sure no equal entry is present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::hash_table::HashTable;
    /// let mut table = HashTable::new();
    /// *table.insert_unique(42, 1) += 1;
    /// assert_eq!(table.find(42, |v| *v == 2), Some(&2));
    /// ```
    pub fn insert_unique(&mut self, hash: u32, value: T) -> &mut T {
        let index = infallible(self.insert_inner(hash, value, OnError::Abort));
        self.value_mut(index)
    }

    /// Fallible variant of [`insert_unique`](Self::insert_unique). `value` is
    /// dropped on error.
    pub fn try_insert_unique(&mut self, hash: u32, value: T) -> Result<&mut T> {
        let index = self.insert_inner(hash, value, OnError::ReturnErr)?;
        Ok(self.value_mut(index))
    }

    fn insert_inner(&mut self, hash: u32, value: T, on_err: OnError) -> Result<usize> {
        self.check_expand(on_err)?;
        Ok(self.place(fix_hash(hash), value))
    }

    /// Returns a reference to the value matching `hash` and `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::hash_table::HashTable;
    /// let mut table = HashTable::new();
    /// table.insert_unique(5, (5u32, "five"));
    ///
    /// assert_eq!(table.find(5, |(k, _)| *k == 5), Some(&(5, "five")));
    /// assert_eq!(table.find(6, |(k, _)| *k == 6), None);
    /// ```
    pub fn find(&self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<&T> {
        self.find_index(hash, eq).map(|index| self.value_ref(index))
    }

    /// Returns a mutable reference to the value matching `hash` and `eq`.
    pub fn find_mut(&mut self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        self.find_index(hash, eq).map(|index| self.value_mut(index))
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// A chain root with successors becomes a tombstone; nothing else moves.
    pub fn remove(&mut self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<T> {
        self.find_index(hash, eq).map(|index| self.erase_at(index))
    }

    /// Gets the entry for `hash` and `eq` for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::hash_table::HashTable;
    /// let mut table = HashTable::new();
    /// for word in ["a", "b", "a"] {
    ///     let hash = word.as_bytes()[0] as u32;
    ///     table
    ///         .entry(hash, |(w, _): &(&str, u32)| *w == word)
    ///         .or_insert((word, 0))
    ///         .1 += 1;
    /// }
    /// assert_eq!(table.find(b'a' as u32, |(w, _)| *w == "a"), Some(&("a", 2)));
    /// ```
    pub fn entry(&mut self, hash: u32, eq: impl Fn(&T) -> bool) -> Entry<'_, T> {
        match self.find_index(hash, eq) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Keeps only the values for which `f` returns `true`, visiting them in
    /// slot order.
    ///
    /// Removal happens through the visiting cursor and never moves another
    /// entry, so every value is visited exactly once.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use compact_collections::hash_table::HashTable;
    /// let mut table = HashTable::new();
    /// for i in 0..10u32 {
    ///     table.insert_unique(i, i);
    /// }
    /// table.retain(|v| *v % 2 == 0);
    /// assert_eq!(table.len(), 5);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        for index in 0..self.raw_capacity() {
            if self.slots()[index].is_occupied() && !f(self.value_mut(index)) {
                drop(self.erase_at(index));
            }
        }
    }

    /// Computes a histogram of chain lengths: `hist[n]` is the number of
    /// chains with `n` live entries.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> alloc::vec::Vec<usize> {
        let mut hist = alloc::vec![0usize; 1];
        let slots = self.slots();
        let mask = slots.len().wrapping_sub(1);

        for (root, slot) in slots.iter().enumerate() {
            let is_root = slot.is_tombstone()
                || (slot.is_occupied() && slot.hash_value as usize & mask == root);
            if !is_root {
                continue;
            }

            let mut len = 0;
            let mut index = root as i32;
            while index >= 0 {
                let slot = &slots[index as usize];
                if slot.is_occupied() {
                    len += 1;
                }
                index = slot.next_in_chain;
            }

            if hist.len() <= len {
                hist.resize(len + 1, 0);
            }
            hist[len] += 1;
        }

        hist
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let slots = self.slots();
        let mask = slots.len().wrapping_sub(1);
        let hist = self.chain_histogram();

        DebugStats {
            populated: self.len(),
            capacity: self.capacity(),
            raw_capacity: self.raw_capacity(),
            tombstones: slots.iter().filter(|s| s.is_tombstone()).count(),
            displaced: slots
                .iter()
                .enumerate()
                .filter(|(i, s)| s.is_occupied() && s.hash_value as usize & mask != *i)
                .count(),
            chains: hist.iter().skip(1).sum(),
            longest_chain: hist.len() - 1,
            load_factor: if slots.is_empty() {
                0.0
            } else {
                self.len() as f64 / slots.len() as f64
            },
            total_bytes: DataLayout::new::<T>(slots.len())
                .filter(|_| !slots.is_empty())
                .map_or(0, |l| l.layout.size()),
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, T> {
    /// The entry is vacant.
    Vacant(VacantEntry<'a, T>),
    /// The entry is occupied.
    Occupied(OccupiedEntry<'a, T>),
}

impl<'a, T> Entry<'a, T> {
    /// Inserts `default` if the entry is vacant and returns a mutable reference
    /// to the value.
    pub fn or_insert(self, default: T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value if the entry is occupied.
    pub fn and_modify(self, f: impl FnOnce(&mut T)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Inserts `T::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut T
    where
        T: Default,
    {
        self.or_insert_with(T::default)
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, T> {
    table: &'a mut HashTable<T>,
    hash: u32,
}

impl<'a, T> VacantEntry<'a, T> {
    /// Inserts `value`, expanding the table if needed, and returns a mutable
    /// reference to it.
    pub fn insert(self, value: T) -> &'a mut T {
        self.table.insert_unique(self.hash, value)
    }

    /// Fallible variant of [`insert`](Self::insert).
    pub fn try_insert(self, value: T) -> Result<&'a mut T> {
        self.table.try_insert_unique(self.hash, value)
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, T> {
    table: &'a mut HashTable<T>,
    index: usize,
}

impl<'a, T> OccupiedEntry<'a, T> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &T {
        self.table.value_ref(self.index)
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut T {
        self.table.value_mut(self.index)
    }

    /// Converts the entry into a mutable reference with the lifetime of the
    /// table borrow.
    pub fn into_mut(self) -> &'a mut T {
        self.table.value_mut(self.index)
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: T) -> T {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the table and returns the value.
    pub fn remove(self) -> T {
        self.table.erase_at(self.index)
    }
}

/// An iterator over the values of a [`HashTable`], in slot order.
pub struct Iter<'a, T> {
    slots: core::slice::Iter<'a, Slot<T>>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for slot in self.slots.by_ref() {
            if slot.is_occupied() {
                self.remaining -= 1;
                // SAFETY: Occupied slots hold initialized values.
                return Some(unsafe { slot.value.assume_init_ref() });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

/// A mutable iterator over the values of a [`HashTable`], in slot order.
pub struct IterMut<'a, T> {
    slots: core::slice::IterMut<'a, Slot<T>>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for slot in self.slots.by_ref() {
            if slot.is_occupied() {
                self.remaining -= 1;
                // SAFETY: Occupied slots hold initialized values, and each
                // slot is yielded at most once.
                return Some(unsafe { slot.value.assume_init_mut() });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

/// An owning iterator over the values of a [`HashTable`], in slot order.
pub struct IntoIter<T> {
    table: HashTable<T>,
    index: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.table.is_empty() {
            return None;
        }

        let slots = self.table.slots_mut();
        while self.index < slots.len() {
            let slot = &mut slots[self.index];
            self.index += 1;
            if slot.is_occupied() {
                // The table is never searched again, so breaking its chains
                // is fine; marking the slot empty keeps `Drop` from seeing it.
                slot.next_in_chain = EMPTY;
                // SAFETY: The slot was occupied and is now marked empty.
                let value = unsafe { slot.value.assume_init_read() };
                if let Some(header) = self.table.header_mut() {
                    header.entry_count -= 1;
                }
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.len();
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, T> {
    inner: IntoIter<T>,
    _phantom: PhantomData<&'a mut HashTable<T>>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

impl<'a, T> IntoIterator for &'a HashTable<T> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut HashTable<T> {
    type IntoIter = IterMut<'a, T>;
    type Item = &'a mut T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for HashTable<T> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            index: 0,
        }
    }
}
