use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::Deref;
use core::ops::DerefMut;
use core::ptr::NonNull;

use crate::error::Error;
use crate::error::OnError;
use crate::error::Result;
use crate::error::infallible;

/// A contiguous, growable sequence that constructs and destroys elements
/// exactly at the boundary of its active range.
///
/// Elements in `0..len()` are live; the storage past `len()` is never read.
/// When a length change needs more room, the buffer is reallocated to
/// `n + n / 2` slots for the requested length `n`. The buffer is never shrunk
/// implicitly, except by [`clear`](Self::clear) and `resize(0)`, which release
/// it.
///
/// # Examples
///
/// ```rust
/// use compact_collections::Array;
///
/// let mut a = Array::new();
/// a.push_back(1);
/// a.push_back(3);
/// a.insert(1, 2);
/// assert_eq!(&a[..], &[1, 2, 3]);
///
/// assert_eq!(a.remove(0), 1);
/// assert_eq!(a.pop_back(), Some(3));
/// assert_eq!(a.len(), 1);
/// ```
pub struct Array<T> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    _phantom: PhantomData<T>,
}

// SAFETY: `Array<T>` exclusively owns its elements, exactly like `Vec<T>`.
unsafe impl<T: Send> Send for Array<T> {}
// SAFETY: Shared access only hands out `&T`.
unsafe impl<T: Sync> Sync for Array<T> {}

impl<T> Array<T> {
    const IS_ZST: bool = size_of::<T>() == 0;

    /// Creates an empty array without allocating.
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            _phantom: PhantomData,
        }
    }

    /// Creates an empty array with room for at least `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        array.reserve(capacity);
        array
    }

    /// Number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Alias of [`len`](Self::len).
    #[inline]
    pub fn size(&self) -> usize {
        self.len
    }

    /// Number of elements the current buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a shared slice over the live elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` initialized elements (or dangling
        // and well-aligned when `len == 0`).
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Returns a mutable slice over the live elements.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: As in `as_slice`; `&mut self` guarantees uniqueness.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Appends `value`, growing the buffer if needed.
    pub fn push_back(&mut self, value: T) {
        infallible(self.grow_for(self.len + 1, OnError::Abort));
        // SAFETY: `grow_for` guarantees `cap > len`.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Removes and returns the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: The element at the old last index was live and is now
        // outside the active range, so reading it out transfers ownership.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Inserts `value` at `index`, shifting later elements up by one.
    ///
    /// `index` must be at most `len()`; out of range indices are a debug
    /// assertion and a panic otherwise. See [`try_insert`](Self::try_insert).
    pub fn insert(&mut self, index: usize, value: T) {
        debug_assert!(index <= self.len, "insert index out of bounds");
        if let Err(err) = self.insert_inner(index, value, OnError::Abort) {
            panic!("{err}");
        }
    }

    /// Fallible variant of [`insert`](Self::insert).
    ///
    /// On error `value` is dropped.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<()> {
        self.insert_inner(index, value, OnError::ReturnErr)
    }

    fn insert_inner(&mut self, index: usize, value: T, on_err: OnError) -> Result<()> {
        if index > self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        self.grow_for(self.len + 1, on_err)?;

        // SAFETY: `index <= len < cap`. The shifted range `index..len` moves to
        // `index + 1..len + 1`, which is in bounds; `copy` handles the overlap.
        unsafe {
            let at = self.ptr.as_ptr().add(index);
            core::ptr::copy(at, at.add(1), self.len - index);
            at.write(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Removes the element at `index`, shifting later elements down.
    ///
    /// This is O(n) and preserves order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> T {
        match self.try_remove(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible variant of [`remove`](Self::remove).
    pub fn try_remove(&mut self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }

        // SAFETY: `index < len`, so the element is live. After reading it out,
        // the tail `index + 1..len` is moved down over the hole.
        unsafe {
            let at = self.ptr.as_ptr().add(index);
            let value = at.read();
            core::ptr::copy(at.add(1), at, self.len - index - 1);
            self.len -= 1;
            Ok(value)
        }
    }

    /// Shortens the array to `len` elements, dropping the rest.
    ///
    /// Has no effect when `len >= self.len()`. The buffer is kept.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        // Shrink first so a panicking destructor cannot cause a double drop.
        self.len = len;
        // SAFETY: `len..len + tail` were live and are now outside the active
        // range.
        unsafe {
            core::ptr::drop_in_place(core::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr().add(len),
                tail,
            ));
        }
    }

    /// Resizes to `new_len`, calling `f` for every new element.
    ///
    /// `resize_with(0, ..)` releases the buffer.
    pub fn resize_with(&mut self, new_len: usize, mut f: impl FnMut() -> T) {
        if new_len == 0 {
            self.clear();
            return;
        }
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }

        infallible(self.grow_for(new_len, OnError::Abort));
        while self.len < new_len {
            // SAFETY: `len < new_len <= cap`.
            unsafe { self.ptr.as_ptr().add(self.len).write(f()) };
            self.len += 1;
        }
    }

    /// Ensures the buffer can hold `capacity` elements without reallocating.
    pub fn reserve(&mut self, capacity: usize) {
        infallible(self.grow_for(capacity, OnError::Abort));
    }

    /// Fallible variant of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, capacity: usize) -> Result<()> {
        self.grow_for(capacity, OnError::ReturnErr)
    }

    /// Drops every element and releases the buffer.
    pub fn clear(&mut self) {
        self.truncate(0);
        self.release();
    }

    /// Moves every element of `other` to the end of `self`, leaving `other`
    /// empty.
    pub fn append_array(&mut self, other: &mut Array<T>) {
        let count = other.len;
        if count == 0 {
            return;
        }
        infallible(self.grow_for(self.len + count, OnError::Abort));

        // SAFETY: The destination has room for `count` more elements and the
        // two buffers are distinct allocations. Ownership moves with the bytes;
        // `other.len` is reset so they are not dropped twice.
        unsafe {
            core::ptr::copy_nonoverlapping(
                other.ptr.as_ptr(),
                self.ptr.as_ptr().add(self.len),
                count,
            );
        }
        other.len = 0;
        self.len += count;
    }

    /// Makes sure there is room for `needed` elements, growing to
    /// `needed + needed / 2` if there is not.
    fn grow_for(&mut self, needed: usize, on_err: OnError) -> Result<()> {
        if needed <= self.cap {
            return Ok(());
        }

        let new_cap = needed
            .checked_add(needed / 2)
            .ok_or_else(|| on_err.overflow())?;
        let new_layout = Layout::array::<T>(new_cap).map_err(|_| on_err.overflow())?;

        let raw = if self.cap == 0 {
            // SAFETY: `T` is not zero-sized here (ZSTs start at `usize::MAX`
            // capacity) and `new_cap > 0`, so the layout is non-zero.
            unsafe { alloc::alloc::alloc(new_layout) }
        } else {
            // SAFETY: `ptr` was allocated with `current_layout`, and the new
            // size was validated by `Layout::array`.
            unsafe {
                alloc::alloc::realloc(
                    self.ptr.as_ptr().cast(),
                    self.current_layout(),
                    new_layout.size(),
                )
            }
        };

        match NonNull::new(raw.cast::<T>()) {
            Some(ptr) => {
                self.ptr = ptr;
                self.cap = new_cap;
                Ok(())
            }
            None => Err(on_err.alloc_failed(new_layout)),
        }
    }

    fn current_layout(&self) -> Layout {
        // SAFETY: This exact layout was validated when the buffer was
        // allocated.
        unsafe { Layout::from_size_align_unchecked(size_of::<T>() * self.cap, align_of::<T>()) }
    }

    fn release(&mut self) {
        if Self::IS_ZST || self.cap == 0 {
            return;
        }
        debug_assert_eq!(self.len, 0);
        // SAFETY: The buffer was allocated with `current_layout` and holds no
        // live elements.
        unsafe { alloc::alloc::dealloc(self.ptr.as_ptr().cast(), self.current_layout()) };
        self.ptr = NonNull::dangling();
        self.cap = 0;
    }
}

impl<T: Clone> Array<T> {
    /// Appends clones of every element in `items`.
    pub fn append(&mut self, items: &[T]) {
        infallible(self.grow_for(self.len + items.len(), OnError::Abort));
        for item in items {
            // SAFETY: Room for all of `items` was reserved above.
            unsafe { self.ptr.as_ptr().add(self.len).write(item.clone()) };
            self.len += 1;
        }
    }
}

impl<T: Default> Array<T> {
    /// Creates an array of `len` default-constructed elements.
    pub fn with_len(len: usize) -> Self {
        let mut array = Self::new();
        array.resize(len);
        array
    }

    /// Resizes to `new_len`, default-constructing new elements and dropping
    /// removed ones. `resize(0)` releases the buffer.
    pub fn resize(&mut self, new_len: usize) {
        self.resize_with(new_len, T::default);
    }
}

impl<T> Drop for Array<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Array<T> {
    fn clone(&self) -> Self {
        let mut out = Self::with_capacity(self.len);
        out.append(self);
        out
    }
}

impl<T: Debug> Debug for Array<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Array<T> {}

impl<T> Deref for Array<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for Array<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Extend<T> for Array<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(self.len.saturating_add(iter.size_hint().0));
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type IntoIter = core::slice::Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Array<T> {
    type IntoIter = core::slice::IterMut<'a, T>;
    type Item = &'a mut T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for Array<T> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            array: ManuallyDrop::new(self),
            next: 0,
        }
    }
}

/// Owning iterator over the elements of an [`Array`].
pub struct IntoIter<T> {
    array: ManuallyDrop<Array<T>>,
    next: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.next == self.array.len {
            return None;
        }
        // SAFETY: Elements in `next..len` have not been yielded yet and are
        // read out exactly once.
        let value = unsafe { self.array.ptr.as_ptr().add(self.next).read() };
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len - self.next;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        let start = self.next;
        let remaining = self.array.len - start;
        self.array.len = 0;
        // SAFETY: `start..start + remaining` are the elements that were never
        // yielded; nothing else references them.
        unsafe {
            core::ptr::drop_in_place(core::ptr::slice_from_raw_parts_mut(
                self.array.ptr.as_ptr().add(start),
                remaining,
            ));
        }
        self.array.release();
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::cell::Cell;

    use proptest::prelude::*;

    use super::*;

    struct Counted {
        live: Rc<Cell<isize>>,
    }

    impl Counted {
        fn new(live: &Rc<Cell<isize>>) -> Self {
            live.set(live.get() + 1);
            Counted { live: live.clone() }
        }
    }

    impl Clone for Counted {
        fn clone(&self) -> Self {
            Counted::new(&self.live)
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[test]
    fn push_then_pop_destroys_each_once() {
        let live = Rc::new(Cell::new(0));
        let mut a = Array::new();
        for _ in 0..100 {
            a.push_back(Counted::new(&live));
        }
        assert_eq!(live.get(), 100);
        while let Some(v) = a.pop_back() {
            drop(v);
        }
        assert_eq!(a.len(), 0);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn growth_is_one_and_a_half_times_request() {
        let mut a = Array::new();
        a.push_back(1u32);
        assert_eq!(a.capacity(), 1);
        a.push_back(2);
        assert_eq!(a.capacity(), 3);
        a.push_back(3);
        a.push_back(4);
        assert_eq!(a.capacity(), 6);

        let mut b: Array<u8> = Array::new();
        b.resize(10);
        assert_eq!(b.capacity(), 15);
    }

    #[test]
    fn resize_constructs_and_destroys_at_boundary() {
        let live = Rc::new(Cell::new(0));
        let mut a = Array::new();
        a.resize_with(8, || Counted::new(&live));
        assert_eq!(live.get(), 8);

        a.resize_with(3, || unreachable!());
        assert_eq!(live.get(), 3);
        assert_eq!(a.len(), 3);
        assert!(a.capacity() >= 8);

        a.resize_with(0, || unreachable!());
        assert_eq!(live.get(), 0);
        assert_eq!(a.capacity(), 0);
    }

    #[test]
    fn resize_default_fills() {
        let mut a: Array<i32> = Array::with_len(4);
        assert_eq!(&a[..], &[0, 0, 0, 0]);
        a[2] = 7;
        a.resize(6);
        assert_eq!(&a[..], &[0, 0, 7, 0, 0, 0]);
    }

    #[test]
    fn insert_and_remove_preserve_order() {
        let mut a: Array<String> = ["a", "c", "e"].iter().map(|s| s.to_string()).collect();
        a.insert(1, "b".to_string());
        a.insert(3, "d".to_string());
        a.insert(5, "f".to_string());
        assert_eq!(a.iter().map(String::as_str).collect::<Vec<_>>(), [
            "a", "b", "c", "d", "e", "f"
        ]);

        assert_eq!(a.remove(0), "a");
        assert_eq!(a.remove(4), "f");
        assert_eq!(a.remove(1), "c");
        assert_eq!(a.iter().map(String::as_str).collect::<Vec<_>>(), [
            "b", "d", "e"
        ]);
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut a: Array<u8> = Array::new();
        a.push_back(1);
        assert_eq!(a.try_remove(1), Err(Error::IndexOutOfBounds { index: 1, len: 1 }));
        assert_eq!(
            a.try_insert(3, 9),
            Err(Error::IndexOutOfBounds { index: 3, len: 1 })
        );
        assert_eq!(a.try_insert(1, 2), Ok(()));
        assert_eq!(&a[..], &[1, 2]);
    }

    #[test]
    #[should_panic]
    fn remove_past_end_panics() {
        let mut a: Array<u8> = Array::new();
        a.remove(0);
    }

    #[test]
    fn try_reserve_overflow() {
        let mut a: Array<u64> = Array::new();
        assert_eq!(a.try_reserve(usize::MAX / 4), Err(Error::CapacityOverflow));
        assert_eq!(a.try_reserve(16), Ok(()));
        assert!(a.capacity() >= 16);
    }

    #[test]
    fn append_clones_and_moves() {
        let live = Rc::new(Cell::new(0));
        let src: Vec<Counted> = (0..3).map(|_| Counted::new(&live)).collect();

        let mut a = Array::new();
        a.append(&src);
        assert_eq!(live.get(), 6);

        let mut b = Array::new();
        b.push_back(Counted::new(&live));
        b.append_array(&mut a);
        assert!(a.is_empty());
        assert_eq!(b.len(), 4);
        assert_eq!(live.get(), 7);

        drop(src);
        drop(a);
        drop(b);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn clone_is_deep() {
        let mut a: Array<String> = Array::new();
        a.push_back("x".to_string());
        let mut b = a.clone();
        b[0].push('y');
        assert_eq!(a[0], "x");
        assert_eq!(b[0], "xy");
        assert_ne!(a, b);
    }

    #[test]
    fn into_iter_drops_unconsumed() {
        let live = Rc::new(Cell::new(0));
        let a: Array<Counted> = (0..5).map(|_| Counted::new(&live)).collect();
        let mut it = a.into_iter();
        drop(it.next());
        drop(it.next());
        assert_eq!(live.get(), 3);
        drop(it);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn zero_sized_elements() {
        let mut a = Array::new();
        for _ in 0..1000 {
            a.push_back(());
        }
        assert_eq!(a.len(), 1000);
        a.insert(10, ());
        a.remove(0);
        assert_eq!(a.len(), 1000);
        a.clear();
        assert!(a.is_empty());
    }

    #[test]
    fn front_back() {
        let mut a = Array::new();
        assert_eq!(a.front(), None);
        a.extend([4, 5, 6]);
        assert_eq!(a.front(), Some(&4));
        assert_eq!(a.back(), Some(&6));
    }

    proptest! {
        #[test]
        fn matches_vec(ops in proptest::collection::vec((0u8..4, any::<u16>()), 0..200)) {
            let mut a = Array::new();
            let mut v = Vec::new();
            for (op, value) in ops {
                match op {
                    0 => {
                        a.push_back(value);
                        v.push(value);
                    }
                    1 => prop_assert_eq!(a.pop_back(), v.pop()),
                    2 => {
                        let index = value as usize % (v.len() + 1);
                        a.insert(index, value);
                        v.insert(index, value);
                    }
                    _ => {
                        if !v.is_empty() {
                            let index = value as usize % v.len();
                            prop_assert_eq!(a.remove(index), v.remove(index));
                        }
                    }
                }
                prop_assert_eq!(&a[..], &v[..]);
            }
        }
    }
}
