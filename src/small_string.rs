use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cell::Cell;
use core::cmp::Ordering;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use core::hash::Hash;
use core::hash::Hasher;
use core::ops::Add;
use core::ops::AddAssign;
use core::ops::Deref;
use core::ops::Index;
use core::ops::IndexMut;

use crate::array::Array;
use crate::hash::CachedHash;
use crate::hash::HASH_SEED;
use crate::hash::bernstein_hash;
use crate::numeric;
use crate::utf8;

/// Size of the inline buffer. Content strictly shorter than this is stored
/// inline; anything longer lives on the heap.
pub const INLINE_CAPACITY: usize = 19;

const FLAG_UPDATED: u8 = 0x01;
const FLAG_HASHED: u8 = 0x02;

#[derive(Clone)]
enum Repr {
    Inline {
        len: u8,
        buf: [u8; INLINE_CAPACITY],
    },
    Heap(Vec<u8>),
}

impl Repr {
    const EMPTY: Repr = Repr::Inline {
        len: 0,
        buf: [0; INLINE_CAPACITY],
    };

    fn from_bytes(bytes: &[u8]) -> Repr {
        if bytes.len() < INLINE_CAPACITY {
            let mut buf = [0; INLINE_CAPACITY];
            buf[..bytes.len()].copy_from_slice(bytes);
            Repr::Inline {
                len: bytes.len() as u8,
                buf,
            }
        } else {
            Repr::Heap(bytes.to_vec())
        }
    }
}

/// A byte string that keeps short contents inline and caches its hash.
///
/// Contents shorter than [`INLINE_CAPACITY`] bytes need no heap allocation.
/// The storage class is re-evaluated on every length change, so a string that
/// grows past the limit and shrinks back returns to inline storage.
///
/// The contents are arbitrary bytes. Operations that work in character
/// positions (`utf8_*`) decode UTF-8 and stop at the first NUL or malformed
/// sequence.
///
/// [`compute_hash`](Self::compute_hash) caches its result until the next
/// mutation. Because that cache lives in a [`Cell`], `SmallString` is `Send`
/// but not `Sync`.
///
/// # Examples
///
/// ```rust
/// use compact_collections::SmallString;
///
/// let mut s = SmallString::from("width=");
/// s.push_f64(12.5);
/// assert_eq!(s, "width=12.5");
/// assert!(s.is_inline());
///
/// s += " and quite a lot more text";
/// assert!(!s.is_inline());
/// ```
pub struct SmallString {
    repr: Repr,
    hash: Cell<u32>,
    flags: Cell<u8>,
}

impl SmallString {
    /// Creates an empty string.
    pub const fn new() -> Self {
        Self {
            repr: Repr::EMPTY,
            hash: Cell::new(0),
            flags: Cell::new(0),
        }
    }

    /// Creates a string holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            repr: Repr::from_bytes(bytes),
            hash: Cell::new(0),
            flags: Cell::new(0),
        }
    }

    /// Creates a one-byte string.
    pub fn from_byte(byte: u8) -> Self {
        Self::from_bytes(&[byte])
    }

    /// Creates a string from a UTF-16 code unit. ASCII is stored as one byte,
    /// anything else is UTF-8 encoded (lone surrogates become U+FFFD).
    pub fn from_code_unit(unit: u16) -> Self {
        let mut s = Self::new();
        if unit <= 0x7F {
            s.push_bytes(&[unit as u8]);
        } else {
            s.push_wide_char(unit as u32);
        }
        s
    }

    /// Formats `value` as a decimal integer.
    pub fn from_i32(value: i32) -> Self {
        crate::small_format!("{value}")
    }

    /// Formats `value` like `printf("%.14g")`.
    pub fn from_f64(value: f64) -> Self {
        let mut s = Self::new();
        s.push_f64(value);
        s
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.repr {
            Repr::Inline { len, buf } => &buf[..*len as usize],
            Repr::Heap(vec) => vec.as_slice(),
        }
    }

    /// Mutable view of the contents. Callers must clear the flags.
    fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.repr {
            Repr::Inline { len, buf } => &mut buf[..*len as usize],
            Repr::Heap(vec) => vec.as_mut_slice(),
        }
    }

    /// Returns the contents as `&str` if they are valid UTF-8.
    pub fn to_str(&self) -> Result<&str, core::str::Utf8Error> {
        core::str::from_utf8(self.as_bytes())
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Inline { len, .. } => *len as usize,
            Repr::Heap(vec) => vec.len(),
        }
    }

    /// Alias of [`len`](Self::len).
    #[inline]
    pub fn size(&self) -> usize {
        self.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the contents are currently stored in the inline buffer.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.repr, Repr::Inline { .. })
    }

    /// Sets the length to `new_len`, keeping the common prefix and zero
    /// filling any new bytes. Moves between inline and heap storage as the
    /// new length requires.
    fn set_len(&mut self, new_len: usize) {
        self.clear_flags();

        let moved = match &mut self.repr {
            Repr::Inline { len, buf } if new_len < INLINE_CAPACITY => {
                let old = *len as usize;
                if new_len > old {
                    buf[old..new_len].fill(0);
                }
                *len = new_len as u8;
                None
            }
            Repr::Inline { len, buf } => {
                let mut vec = Vec::with_capacity(new_len);
                vec.extend_from_slice(&buf[..*len as usize]);
                vec.resize(new_len, 0);
                Some(Repr::Heap(vec))
            }
            Repr::Heap(vec) if new_len >= INLINE_CAPACITY => {
                vec.resize(new_len, 0);
                None
            }
            Repr::Heap(vec) => {
                let keep = new_len.min(vec.len());
                let mut buf = [0; INLINE_CAPACITY];
                buf[..keep].copy_from_slice(&vec[..keep]);
                Some(Repr::Inline {
                    len: new_len as u8,
                    buf,
                })
            }
        };

        if let Some(repr) = moved {
            self.repr = repr;
        }
    }

    /// Replaces the contents with `bytes`.
    pub fn assign(&mut self, bytes: &[u8]) {
        self.clear_flags();
        self.repr = Repr::from_bytes(bytes);
    }

    /// Removes `count` bytes starting at `index`.
    ///
    /// The range is clamped to the end of the string.
    pub fn erase(&mut self, index: usize, count: usize) {
        let len = self.len();
        debug_assert!(index <= len, "erase index out of bounds");
        let index = index.min(len);
        let count = count.min(len - index);
        if count == 0 {
            return;
        }
        self.bytes_mut().copy_within(index + count..len, index);
        self.set_len(len - count);
    }

    /// Inserts `byte` before position `index`.
    pub fn insert(&mut self, index: usize, byte: u8) {
        let len = self.len();
        debug_assert!(index <= len, "insert index out of bounds");
        let index = index.min(len);
        self.set_len(len + 1);
        let bytes = self.bytes_mut();
        bytes.copy_within(index..len, index + 1);
        bytes[index] = byte;
    }

    /// Appends raw bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let len = self.len();
        self.set_len(len + bytes.len());
        self.bytes_mut()[len..].copy_from_slice(bytes);
    }

    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// Appends one byte. A zero byte is ignored.
    pub fn push_byte(&mut self, byte: u8) {
        if byte != 0 {
            self.push_bytes(&[byte]);
        }
    }

    pub fn push_char(&mut self, ch: char) {
        let mut buf = [0; 4];
        self.push_str(ch.encode_utf8(&mut buf));
    }

    /// Appends the UTF-8 encoding of `code_point`. Zero is ignored; invalid
    /// code points are written as U+FFFD.
    pub fn push_wide_char(&mut self, code_point: u32) {
        if code_point == 0 {
            return;
        }
        let mut buf = [0; 4];
        let n = utf8::encode(code_point, &mut buf);
        self.push_bytes(&buf[..n]);
    }

    /// Appends a UTF-16 code unit, as a single byte when it is ASCII.
    pub fn push_code_unit(&mut self, unit: u16) {
        self.push_wide_char(unit as u32);
    }

    /// Appends `value`. Integers go through the same `%.14g` formatting as
    /// floats.
    pub fn push_i32(&mut self, value: i32) {
        self.push_f64(value as f64);
    }

    pub fn push_f32(&mut self, value: f32) {
        self.push_f64(value as f64);
    }

    /// Appends `value` formatted like `printf("%.14g")`.
    pub fn push_f64(&mut self, value: f64) {
        // `fmt::Write` for `SmallString` never fails.
        let _ = numeric::write_g14(self, value);
    }

    /// Drops the contents, returning to empty inline storage.
    pub fn clear(&mut self) {
        self.clear_flags();
        self.repr = Repr::EMPTY;
    }

    /// Resizes to `new_len` bytes, zero filling any growth.
    pub fn resize(&mut self, new_len: usize) {
        self.set_len(new_len);
    }

    /// Returns the cached hash, computing `bernstein_hash` first if the
    /// contents changed since the last call.
    pub fn compute_hash(&self) -> u32 {
        let flags = self.flags.get();
        if flags & FLAG_HASHED == 0 {
            self.hash.set(bernstein_hash(self.as_bytes(), HASH_SEED));
            self.flags.set(flags | FLAG_HASHED);
        }
        self.hash.get()
    }

    /// Caller-owned "updated" marker. Cleared by every mutation.
    pub fn updated_flag(&self) -> bool {
        self.flags.get() & FLAG_UPDATED != 0
    }

    pub fn set_updated_flag(&self) {
        self.flags.set(self.flags.get() | FLAG_UPDATED);
    }

    /// Whether the cached hash is current.
    pub fn hashed_flag(&self) -> bool {
        self.flags.get() & FLAG_HASHED != 0
    }

    pub fn clear_flags(&self) {
        self.flags.set(0);
    }

    /// ASCII case-insensitive equality.
    pub fn eq_ignore_ascii_case(&self, other: &[u8]) -> bool {
        self.as_bytes().eq_ignore_ascii_case(other)
    }

    /// UTF-8 encodes a zero-terminated sequence of code points.
    pub fn encode_utf8_from_u32(wide: &[u32]) -> Self {
        let mut s = Self::new();
        for &cp in wide.iter().take_while(|&&cp| cp != 0) {
            s.push_wide_char(cp);
        }
        s
    }

    /// UTF-8 encodes a zero-terminated UTF-16 sequence. Unpaired surrogates
    /// become U+FFFD.
    pub fn encode_utf8_from_u16(wide: &[u16]) -> Self {
        let units = wide.iter().copied().take_while(|&u| u != 0);
        let mut s = Self::new();
        for ch in char::decode_utf16(units) {
            s.push_char(ch.unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        s
    }

    /// Code point at character position `index`, or `0` past the end.
    pub fn utf8_char_at(&self, index: usize) -> u32 {
        let bytes = self.as_bytes();
        let mut pos = utf8::byte_offset(bytes, index);
        utf8::decode_next(bytes, &mut pos)
    }

    /// Upper-cased copy (Unicode case mapping).
    pub fn utf8_to_upper(&self) -> Self {
        self.map_chars(char::to_uppercase)
    }

    /// Lower-cased copy (Unicode case mapping).
    pub fn utf8_to_lower(&self) -> Self {
        self.map_chars(char::to_lowercase)
    }

    fn map_chars<I: Iterator<Item = char>>(&self, f: impl Fn(char) -> I) -> Self {
        let bytes = self.as_bytes();
        let mut out = Self::new();
        let mut pos = 0;
        loop {
            let cp = utf8::decode_next(bytes, &mut pos);
            let Some(ch) = char::from_u32(cp).filter(|&c| c != '\0') else {
                return out;
            };
            for mapped in f(ch) {
                out.push_char(mapped);
            }
        }
    }

    /// Number of characters in `bytes`.
    pub fn utf8_char_count(bytes: &[u8]) -> usize {
        utf8::char_count(bytes)
    }

    /// Number of characters in this string.
    pub fn utf8_length(&self) -> usize {
        utf8::char_count(self.as_bytes())
    }

    /// Characters `start..end` (character positions, not bytes).
    ///
    /// Positions past the end are clamped; `start >= end` gives an empty
    /// string.
    pub fn utf8_substring(&self, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "utf8_substring range is reversed");
        if start >= end {
            return Self::new();
        }
        let bytes = self.as_bytes();
        let from = utf8::byte_offset(bytes, start);
        let to = from + utf8::byte_offset(&bytes[from..], end - start);
        Self::from_bytes(&bytes[from..to])
    }

    /// Splits on every occurrence of `delimiter`.
    ///
    /// Occurrences are matched left to right without overlapping. An empty
    /// delimiter splits into single bytes. With a non-empty delimiter there is
    /// always at least one piece, so an empty string yields one empty piece.
    ///
    /// ```rust
    /// use compact_collections::SmallString;
    ///
    /// let parts = SmallString::from("a, b,, c").split(b", ");
    /// let parts: Vec<_> = parts.iter().map(|p| p.to_str().unwrap()).collect();
    /// assert_eq!(parts, ["a", "b,", "c"]);
    /// ```
    pub fn split(&self, delimiter: &[u8]) -> Array<SmallString> {
        let mut out = Array::new();
        self.for_each_piece(delimiter, |piece| out.push_back(Self::from_bytes(piece)));
        out
    }

    /// Splits like [`split`](Self::split) and parses each piece like C `atof`.
    pub fn split_numbers(&self, delimiter: &[u8]) -> Array<f64> {
        let mut out = Array::new();
        self.for_each_piece(delimiter, |piece| {
            out.push_back(numeric::parse_f64_prefix(piece))
        });
        out
    }

    fn for_each_piece(&self, delimiter: &[u8], mut f: impl FnMut(&[u8])) {
        let bytes = self.as_bytes();
        if delimiter.is_empty() {
            for i in 0..bytes.len() {
                f(&bytes[i..i + 1]);
            }
            return;
        }

        let mut item = 0;
        let mut p = 0;
        while p + delimiter.len() <= bytes.len() {
            if &bytes[p..p + delimiter.len()] == delimiter {
                f(&bytes[item..p]);
                p += delimiter.len();
                item = p;
            } else {
                p += 1;
            }
        }
        f(&bytes[item..]);
    }
}

/// Byte-wise ASCII case-insensitive comparison; a strict prefix orders first.
pub fn stricmp(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

/// Builds a [`SmallString`] from format arguments.
///
/// ```rust
/// use compact_collections::small_format;
///
/// let s = small_format!("{}x{}", 640, 480);
/// assert_eq!(s, "640x480");
/// ```
#[macro_export]
macro_rules! small_format {
    ($($arg:tt)*) => {{
        let mut s = $crate::SmallString::new();
        // Writing into a `SmallString` never fails.
        let _ = ::core::fmt::Write::write_fmt(&mut s, ::core::format_args!($($arg)*));
        s
    }};
}

impl CachedHash for SmallString {
    #[inline]
    fn compute_hash(&self) -> u32 {
        SmallString::compute_hash(self)
    }
}

impl Clone for SmallString {
    /// Copies the contents; the copy starts with cleared flags.
    fn clone(&self) -> Self {
        Self {
            repr: self.repr.clone(),
            hash: Cell::new(0),
            flags: Cell::new(0),
        }
    }
}

impl Default for SmallString {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SmallString {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Borrow<[u8]> for SmallString {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for SmallString {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Index<usize> for SmallString {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.as_bytes()[index]
    }
}

impl IndexMut<usize> for SmallString {
    /// Invalidates the cached hash.
    fn index_mut(&mut self, index: usize) -> &mut u8 {
        self.clear_flags();
        &mut self.bytes_mut()[index]
    }
}

impl From<&str> for SmallString {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<&[u8]> for SmallString {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<char> for SmallString {
    fn from(ch: char) -> Self {
        let mut s = Self::new();
        s.push_char(ch);
        s
    }
}

impl fmt::Write for SmallString {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl AddAssign<&SmallString> for SmallString {
    fn add_assign(&mut self, rhs: &SmallString) {
        self.push_bytes(rhs.as_bytes());
    }
}

impl AddAssign<&str> for SmallString {
    fn add_assign(&mut self, rhs: &str) {
        self.push_str(rhs);
    }
}

impl AddAssign<u8> for SmallString {
    fn add_assign(&mut self, rhs: u8) {
        self.push_byte(rhs);
    }
}

impl AddAssign<char> for SmallString {
    fn add_assign(&mut self, rhs: char) {
        self.push_char(rhs);
    }
}

impl Add<&SmallString> for SmallString {
    type Output = SmallString;

    fn add(mut self, rhs: &SmallString) -> SmallString {
        self += rhs;
        self
    }
}

impl Add<&str> for SmallString {
    type Output = SmallString;

    fn add(mut self, rhs: &str) -> SmallString {
        self += rhs;
        self
    }
}

impl Add<&SmallString> for &SmallString {
    type Output = SmallString;

    fn add(self, rhs: &SmallString) -> SmallString {
        self.clone() + rhs
    }
}

impl PartialEq for SmallString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SmallString {}

impl PartialEq<str> for SmallString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for SmallString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<SmallString> for str {
    fn eq(&self, other: &SmallString) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialOrd for SmallString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialOrd<str> for SmallString {
    fn partial_cmp(&self, other: &str) -> Option<Ordering> {
        Some(self.as_bytes().cmp(other.as_bytes()))
    }
}

impl Hash for SmallString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl Display for SmallString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.as_bytes().utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

impl Debug for SmallString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.as_bytes().escape_ascii())
    }
}
