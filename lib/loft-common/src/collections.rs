//! Hash-based containers using the crate's standard hasher.

use crate::hash::FastBuildHasher;

/// A hash map based on `hashbrown` ([`HashMap`][hashbrown::HashMap]) using
/// [`FastHasher`][crate::hash::FastHasher].
pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, FastBuildHasher>;

/// A hash set based on `hashbrown` ([`HashSet`][hashbrown::HashSet]) using
/// [`FastHasher`][crate::hash::FastHasher].
pub type FastHashSet<T> = hashbrown::HashSet<T, FastBuildHasher>;
