//! Hashing primitives.

/// A fast, non-cryptographic hasher suitable for hash tables.
///
/// Backed by [`foldhash`][foldhash], which provides good distribution quality at a
/// fraction of the cost of the standard library's default hasher.
///
/// [foldhash]: http://github.com/orlp/foldhash
pub type FastHasher = foldhash::quality::FoldHasher;

/// [`BuildHasher`][std::hash::BuildHasher] implementation for [`FastHasher`].
pub type FastBuildHasher = foldhash::quality::RandomState;
