//! Multipart boundary generation.
//!
//! Every multipart writer asks its generator for a fresh boundary, so nested
//! containers never share a delimiter.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt::Write as _;

/// Number of random bytes in a generated boundary (hex encoded, 60 chars).
const BOUNDARY_BYTES: usize = 30;

/// Source of multipart boundary strings.
pub trait BoundaryGenerator {
    /// Returns a boundary that this generator has not returned before.
    fn next_boundary(&mut self) -> String;
}

/// Boundaries made of 30 random bytes, hex encoded.
#[derive(Debug)]
pub struct RandomBoundary {
    rng: StdRng,
}

impl RandomBoundary {
    /// Creates a generator seeded from the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a reproducible generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryGenerator for RandomBoundary {
    fn next_boundary(&mut self) -> String {
        let mut bytes = [0u8; BOUNDARY_BYTES];
        self.rng.fill_bytes(&mut bytes);
        bytes.iter().fold(String::with_capacity(BOUNDARY_BYTES * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
    }
}

/// Predictable boundaries (`<prefix>1`, `<prefix>2`, ...).
#[derive(Debug, Clone)]
pub struct SequentialBoundary {
    prefix: String,
    counter: u32,
}

impl SequentialBoundary {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl Default for SequentialBoundary {
    fn default() -> Self {
        Self::new("boundary-")
    }
}

impl BoundaryGenerator for SequentialBoundary {
    fn next_boundary(&mut self) -> String {
        self.counter += 1;
        format!("{}{}", self.prefix, self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_boundary_shape() {
        let boundary = RandomBoundary::new().next_boundary();
        assert_eq!(boundary.len(), 60);
        assert!(boundary.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_boundaries_distinct() {
        let mut generator = RandomBoundary::new();
        let seen: HashSet<String> = (0..1000).map(|_| generator.next_boundary()).collect();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a: Vec<String> = {
            let mut g = RandomBoundary::seeded(7);
            (0..3).map(|_| g.next_boundary()).collect()
        };
        let b: Vec<String> = {
            let mut g = RandomBoundary::seeded(7);
            (0..3).map(|_| g.next_boundary()).collect()
        };
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn test_sequential() {
        let mut generator = SequentialBoundary::new("b");
        assert_eq!(generator.next_boundary(), "b1");
        assert_eq!(generator.next_boundary(), "b2");
    }
}
