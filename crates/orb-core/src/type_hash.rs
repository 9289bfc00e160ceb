//! Deterministic hash-based identity for types, methods and constructors.
//!
//! [`TypeHash`] is a 64-bit hash computed from qualified names and signatures.
//! Because it is derived from names rather than assigned at registration time,
//! two independently compiled modules that describe the same interface agree on
//! its identity without coordinating, and a hash can be computed for a type
//! that has not been loaded yet.
//!
//! # Hash Computation
//!
//! XXHash64 of the name, xor-ed with a per-domain constant so a type and a
//! method with the same spelling never collide. Parameter lists are folded in
//! with a position-dependent multiply so order matters.
//!
//! # Examples
//!
//! ```
//! use orb_core::TypeHash;
//!
//! let a = TypeHash::from_name("orb.frame.XDesktop");
//! assert_eq!(a, TypeHash::from_name("orb.frame.XDesktop"));
//!
//! let long = TypeHash::from_name("long");
//! let string = TypeHash::from_name("string");
//! assert_ne!(
//!     TypeHash::from_signature("load", &[long, string]),
//!     TypeHash::from_signature("load", &[string, long]),
//! );
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants.
pub mod hash_constants {
    /// Multiplier folding successive parameters together.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for method signature hashes.
    pub const SIGNATURE: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for interface-owned method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for service constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Seed for per-position parameter markers.
    pub const PARAM_SEED: u64 = 0x9e3779b97f4a7c15;
}

/// Position marker for parameter `i` (splitmix64 finaliser).
#[inline]
fn param_marker(i: usize) -> u64 {
    let mut z = hash_constants::PARAM_SEED.wrapping_mul(i as u64 + 1);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[inline]
fn fold_params(mut hash: u64, params: &[TypeHash]) -> u64 {
    for (i, param) in params.iter().enumerate() {
        hash = hash
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(param_marker(i) ^ param.0);
    }
    hash
}

/// A deterministic 64-bit hash identifying a type, method or constructor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a fully-qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a method signature independent of the declaring interface.
    ///
    /// Two interfaces declaring `dispose()` with the same parameter list agree
    /// on this hash, which is what dispatch-table deduplication keys on.
    #[inline]
    pub fn from_signature(name: &str, param_hashes: &[TypeHash]) -> Self {
        let hash = hash_constants::SIGNATURE ^ xxh64(name.as_bytes(), 0);
        TypeHash(fold_params(hash, param_hashes))
    }

    /// Hash of a method owned by a specific interface.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str) -> Self {
        TypeHash(hash_constants::METHOD ^ owner.0.rotate_left(17) ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a service constructor (service + constructor name + parameters).
    #[inline]
    pub fn from_constructor(service: TypeHash, name: &str, param_hashes: &[TypeHash]) -> Self {
        let hash = hash_constants::CONSTRUCTOR ^ service.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(fold_params(hash, param_hashes))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl From<u64> for TypeHash {
    fn from(raw: u64) -> Self {
        TypeHash(raw)
    }
}
