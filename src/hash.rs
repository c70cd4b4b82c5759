use core::hash::BuildHasher;
use core::hash::Hash;

/// Seed shared by the byte hashes below.
pub const HASH_SEED: u32 = 5381;

/// Dan Bernstein's hash (`h * 33 ^ byte`), consuming bytes last to first.
///
/// Good on text; weak on runs of small integers since each byte only shifts
/// the state by five bits.
#[inline]
pub fn bernstein_hash(data: &[u8], seed: u32) -> u32 {
    data.iter()
        .rev()
        .fold(seed, |h, &b| (h << 5).wrapping_add(h) ^ b as u32)
}

/// [`bernstein_hash`] over the ASCII-lowercased bytes.
#[inline]
pub fn bernstein_hash_case_insensitive(data: &[u8], seed: u32) -> u32 {
    data.iter()
        .rev()
        .fold(seed, |h, &b| (h << 5).wrapping_add(h) ^ b.to_ascii_lowercase() as u32)
}

/// The "sdbm" hash (`h * 65599 + byte`), consuming bytes last to first.
///
/// Slower than [`bernstein_hash`] but spreads fixed-width integer keys much
/// better.
#[inline]
pub fn sdbm_hash(data: &[u8], seed: u32) -> u32 {
    data.iter().rev().fold(seed, |h, &b| {
        (h << 16)
            .wrapping_add(h << 6)
            .wrapping_sub(h)
            .wrapping_add(b as u32)
    })
}

/// A hashing strategy for keys of type `K`.
///
/// The table stores the returned value next to each entry and never asks for
/// it again, so the strategy must be deterministic for equal keys.
pub trait HashFunctor<K: ?Sized> {
    /// Computes the 32-bit hash of `key`.
    fn hash(&self, key: &K) -> u32;
}

/// Types that compute (and possibly cache) their own hash.
pub trait CachedHash {
    /// Returns the hash of the current contents.
    fn compute_hash(&self) -> u32;
}

impl CachedHash for [u8] {
    #[inline]
    fn compute_hash(&self) -> u32 {
        bernstein_hash(self, HASH_SEED)
    }
}

impl CachedHash for str {
    #[inline]
    fn compute_hash(&self) -> u32 {
        self.as_bytes().compute_hash()
    }
}

/// Hashes the raw in-memory representation of a plain-old-data key with
/// [`sdbm_hash`].
///
/// Restricted to [`bytemuck::Pod`] keys so the representation has no padding
/// or pointers and equal keys always have equal bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedSizeHash;

impl<K: bytemuck::Pod> HashFunctor<K> for FixedSizeHash {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        sdbm_hash(bytemuck::bytes_of(key), HASH_SEED)
    }
}

/// Delegates to the key's own [`CachedHash::compute_hash`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StringHash;

impl<K: CachedHash + ?Sized> HashFunctor<K> for StringHash {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        key.compute_hash()
    }
}

/// Uses an integer key as its own hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHash;

macro_rules! identity_hash {
    ($($ty:ty),*) => {
        $(
            impl HashFunctor<$ty> for IdentityHash {
                #[inline]
                fn hash(&self, key: &$ty) -> u32 {
                    *key as u32
                }
            }
        )*
    };
}

identity_hash!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Adapts any [`BuildHasher`] by folding its 64-bit output to 32 bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildHasherHash<S>(pub S);

impl<K: Hash + ?Sized, S: BuildHasher> HashFunctor<K> for BuildHasherHash<S> {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        let h = self.0.hash_one(key);
        (h ^ (h >> 32)) as u32
    }
}

/// [`BuildHasherHash`] over foldhash's fixed-seed state.
#[cfg(feature = "foldhash")]
pub type FoldHash = BuildHasherHash<foldhash::fast::FixedState>;
