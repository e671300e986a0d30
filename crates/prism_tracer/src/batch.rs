//! Ray batches and the 32-lane bitmask convention.
//!
//! A batch holds at most [`MAX_BATCH_SIZE`] rays. Lane `i` of a `u32` mask
//! refers to ray `i` of the batch: the tracer tracks which rays are still
//! alive, and raycasts report which rays hit something.

use crate::error::{Result, TraceError};
use crate::HitInfo;

/// Hard limit on rays per batch, one per bit of a `u32` lane mask.
pub const MAX_BATCH_SIZE: usize = u32::BITS as usize;

/// Mask with the lowest `count` lanes set.
#[inline]
pub fn batch_mask(count: usize) -> u32 {
    match count {
        0 => 0,
        n if n >= MAX_BATCH_SIZE => u32::MAX,
        n => u32::MAX >> (MAX_BATCH_SIZE - n),
    }
}

/// Validate a raycast batch: at most 32 rays and a hit slot for each.
pub fn check_batch(rays: usize, hits: usize) -> Result<()> {
    if rays > MAX_BATCH_SIZE {
        return Err(TraceError::BatchTooLarge { count: rays });
    }
    if hits < rays {
        return Err(TraceError::BatchMismatch { rays, hits });
    }
    Ok(())
}

/// Record `candidate` as the hit of lane `lane`, keeping the closer hit if
/// the lane already has one.
#[inline]
pub fn record_hit(hits: &mut [HitInfo], hit_mask: &mut u32, lane: usize, candidate: HitInfo) {
    let bit = 1u32 << lane;
    if *hit_mask & bit != 0 {
        hits[lane].exchange_if_better(&candidate);
    } else {
        hits[lane] = candidate;
        *hit_mask |= bit;
    }
}

/// Iterate over the indices of the set lanes of `mask`, lowest first.
pub fn lanes(mask: u32) -> Lanes {
    Lanes { bits: mask }
}

#[derive(Copy, Clone, Debug)]
pub struct Lanes {
    bits: u32,
}

impl Iterator for Lanes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.bits == 0 {
            return None;
        }
        let tz = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(tz)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.bits.count_ones() as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for Lanes {}
