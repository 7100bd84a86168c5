// Copyright (c) 2024, The PageMorph Project Authors.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright
//       notice, this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above
//       copyright notice, this list of conditions and the following disclaimer
//       in the documentation and/or other materials provided with the
//       distribution.
//
//     * Neither the name of the copyright holder nor the names of its
//       contributors may be used to endorse or promote products derived from
//       this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.


//! # Size Matcher
//!
//! Decides which original object is padded to which target size. Originals
//! are taken smallest first and each one consumes the smallest remaining
//! target that can hold it. This succeeds whenever any one-to-one assignment
//! with `target >= original` exists.

use serde::Serialize;

use crate::error::{MorphError, Result};

/// Result of matching original sizes against target sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchAssignment {
    /// `(object index, target size)`, one per original object, ordered by
    /// ascending original size.
    pub pairs: Vec<(usize, u64)>,
    /// Target sizes no original object consumed, ascending.
    pub remainders: Vec<u64>,
}

impl MatchAssignment {
    /// Target size assigned to object `index`.
    pub fn target_of(&self, index: usize) -> Option<u64> {
        self.pairs
            .iter()
            .find(|(i, _)| *i == index)
            .map(|&(_, size)| size)
    }
}

/// Assigns every original size a distinct target size at least as large.
pub fn match_sizes(original: &[u64], targets: &[u64]) -> Result<MatchAssignment> {
    let infeasible = || MorphError::InfeasibleTarget {
        original: original.to_vec(),
        target: targets.to_vec(),
    };
    if targets.len() < original.len() {
        return Err(infeasible());
    }

    let mut order: Vec<usize> = (0..original.len()).collect();
    order.sort_by_key(|&i| original[i]);
    let mut pool = targets.to_vec();
    pool.sort_unstable();

    let mut pairs = Vec::with_capacity(original.len());
    let mut remainders = Vec::with_capacity(targets.len() - original.len());
    // Targets before `next` are either consumed or smaller than every
    // original still to come.
    let mut next = 0;
    for i in order {
        let skip = pool[next..].partition_point(|&t| t < original[i]);
        let found = next + skip;
        if found == pool.len() {
            return Err(infeasible());
        }
        remainders.extend_from_slice(&pool[next..found]);
        pairs.push((i, pool[found]));
        next = found + 1;
    }
    remainders.extend_from_slice(&pool[next..]);
    remainders.sort_unstable();

    Ok(MatchAssignment { pairs, remainders })
}
