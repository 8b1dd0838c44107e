//! Versioned entry tokens.
//!
//! A token packs the table version into the high 32 bits and a slot index
//! into the low 32 bits. Any structural change bumps the version, so a token
//! taken before the change no longer validates and the caller gets
//! `Error::ConcurrentStructuralChange` instead of a silently wrong entry.

use core::fmt;

/// Opaque handle to one entry, valid until the next structural change.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Token(u64);

impl Token {
    /// Index reserved for the null key; no slot can have it.
    pub(crate) const NULL_INDEX: u32 = u32::MAX;

    #[inline]
    pub(crate) fn new(version: Version, index: u32) -> Self {
        Token(((version.0 as u64) << 32) | index as u64)
    }

    #[inline]
    pub(crate) fn null(version: Version) -> Self {
        Self::new(version, Self::NULL_INDEX)
    }

    #[inline]
    pub(crate) fn version(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub(crate) fn index(self) -> u32 {
        self.0 as u32
    }

    /// True if this token designates the null key.
    #[inline]
    pub fn is_null_key(self) -> bool {
        self.index() == Self::NULL_INDEX
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Token");
        d.field("version", &self.version());
        if self.is_null_key() {
            d.field("index", &"null");
        } else {
            d.field("index", &self.index());
        }
        d.finish()
    }
}

/// Structural modification counter. Wraps on overflow; only equality with a
/// token's stamp matters.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Version(u32);

impl Version {
    #[inline]
    pub(crate) fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    #[inline]
    pub(crate) fn stamps(self, t: Token) -> bool {
        t.version() == self.0
    }
}
