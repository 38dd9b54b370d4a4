//! Bounded top-N peak selection
//!
//! Keeps the N strongest candidates seen in a stream without sorting or
//! allocating beyond the fixed capacity. Inserts are O(N), which is the
//! right trade when N is a handful of fiducials and the stream is every
//! pixel of a correlation surface.

use std::num::NonZeroUsize;

/// A scored location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCandidate<L> {
    pub location: L,
    pub score: f64,
}

impl<L> PeakCandidate<L> {
    pub fn new(location: L, score: f64) -> Self {
        Self { location, score }
    }
}

/// Fixed-capacity set holding the highest-scoring candidates seen so far.
///
/// While not full every candidate is appended. Once full, a new candidate
/// replaces the weakest held candidate if and only if its score is strictly
/// greater. When several held candidates share the minimum score, the one in
/// the lowest slot is evicted, so the outcome depends only on the insertion
/// sequence. The replacement takes over the evicted slot, which means the
/// held order is insertion order with in-place replacements.
///
/// NaN scores are never accepted.
#[derive(Debug, Clone)]
pub struct BoundedPeakSet<L> {
    capacity: NonZeroUsize,
    candidates: Vec<PeakCandidate<L>>,
}

impl<L> BoundedPeakSet<L> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            candidates: Vec::with_capacity(capacity.get()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.candidates.len() >= self.capacity.get()
    }

    /// Offer a candidate; returns whether it is now held.
    pub fn insert(&mut self, candidate: PeakCandidate<L>) -> bool {
        if candidate.score.is_nan() {
            return false;
        }

        if !self.is_full() {
            self.candidates.push(candidate);
            return true;
        }

        match self.weakest_index() {
            Some(index) if candidate.score > self.candidates[index].score => {
                self.candidates[index] = candidate;
                true
            }
            _ => false,
        }
    }

    /// Slot of the first candidate holding the minimum score
    fn weakest_index(&self) -> Option<usize> {
        let mut weakest: Option<(usize, f64)> = None;
        for (index, candidate) in self.candidates.iter().enumerate() {
            match weakest {
                Some((_, score)) if candidate.score >= score => {}
                _ => weakest = Some((index, candidate.score)),
            }
        }
        weakest.map(|(index, _)| index)
    }

    /// Weakest held candidate
    pub fn weakest(&self) -> Option<&PeakCandidate<L>> {
        self.weakest_index().map(|index| &self.candidates[index])
    }

    /// Strongest held candidate; the first one wins on ties
    pub fn best(&self) -> Option<&PeakCandidate<L>> {
        let mut best: Option<&PeakCandidate<L>> = None;
        for candidate in &self.candidates {
            match best {
                Some(current) if candidate.score <= current.score => {}
                _ => best = Some(candidate),
            }
        }
        best
    }

    pub fn candidates(&self) -> &[PeakCandidate<L>] {
        &self.candidates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PeakCandidate<L>> {
        self.candidates.iter()
    }

    pub fn into_candidates(self) -> Vec<PeakCandidate<L>> {
        self.candidates
    }
}

impl<'a, L> IntoIterator for &'a BoundedPeakSet<L> {
    type Item = &'a PeakCandidate<L>;
    type IntoIter = std::slice::Iter<'a, PeakCandidate<L>>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
