use std::fmt;

use crate::error::SequenceError;

/// One (quality, max-dimension) setting of the escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionAttempt {
    /// JPEG quality, 1..=100.
    pub quality: u8,
    /// Longest allowed image side in pixels.
    pub max_dimension: u32,
}

impl CompressionAttempt {
    pub const fn new(quality: u8, max_dimension: u32) -> Self {
        Self {
            quality,
            max_dimension,
        }
    }
}

impl fmt::Display for CompressionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quality {}, max {} px", self.quality, self.max_dimension)
    }
}

const DEFAULT_ATTEMPTS: [CompressionAttempt; 6] = [
    CompressionAttempt::new(80, 2600),
    CompressionAttempt::new(70, 2200),
    CompressionAttempt::new(60, 2000),
    CompressionAttempt::new(50, 1800),
    CompressionAttempt::new(40, 1600),
    CompressionAttempt::new(30, 1400),
];

/// Ordered, finite list of attempts. Neither field ever increases from one
/// attempt to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSequence {
    attempts: Vec<CompressionAttempt>,
}

impl AttemptSequence {
    pub fn new(attempts: Vec<CompressionAttempt>) -> Result<Self, SequenceError> {
        if attempts.is_empty() {
            return Err(SequenceError::Empty);
        }
        for attempt in &attempts {
            if !(1..=100).contains(&attempt.quality) {
                return Err(SequenceError::QualityOutOfRange(attempt.quality));
            }
            if attempt.max_dimension == 0 {
                return Err(SequenceError::ZeroDimension);
            }
        }
        if let Some(i) = attempts.windows(2).position(|w| {
            w[1].quality > w[0].quality || w[1].max_dimension > w[0].max_dimension
        }) {
            return Err(SequenceError::NotMonotonic(i + 1));
        }
        Ok(Self { attempts })
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompressionAttempt> {
        self.attempts.iter()
    }

    pub fn last(&self) -> CompressionAttempt {
        // Non-empty by construction.
        self.attempts[self.attempts.len() - 1]
    }
}

impl Default for AttemptSequence {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS.to_vec(),
        }
    }
}

impl<'a> IntoIterator for &'a AttemptSequence {
    type Item = &'a CompressionAttempt;
    type IntoIter = std::slice::Iter<'a, CompressionAttempt>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
