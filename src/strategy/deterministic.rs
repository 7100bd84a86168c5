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


//! Deterministic morphing: every size becomes a multiple of `S` and the
//! object count a multiple of `L`.

use rand::rngs::StdRng;
use rand::Rng;

use super::{RetryPolicy, TargetProfile, TargetRequest, TargetStrategy};
use crate::error::{MorphError, Result};
use crate::padding::RandomSource;

/// Smallest `k * m` with `k >= 1` and `x <= k * m`.
pub fn next_multiple(x: u64, m: u64) -> u64 {
    debug_assert!(m > 0);
    x.div_ceil(m).max(1) * m
}

pub struct DeterministicMultiples {
    size_step: u64,
    count_step: usize,
    max_size: u64,
    rng: StdRng,
}

impl DeterministicMultiples {
    /// `size_step` is `S`, `count_step` is `L` and `max_size` bounds the size
    /// of newly created objects; it has to be a multiple of `S`.
    pub fn new(
        size_step: u64,
        count_step: usize,
        max_size: u64,
        source: RandomSource,
    ) -> Result<Self> {
        if size_step == 0 || count_step == 0 {
            return Err(MorphError::InvalidConfig(
                "S and L must be positive".into(),
            ));
        }
        if max_size < size_step || max_size % size_step != 0 {
            return Err(MorphError::InvalidConfig(format!(
                "max_S ({}) should be a multiple of S ({})",
                max_size, size_step
            )));
        }
        Ok(Self {
            size_step,
            count_step,
            max_size,
            rng: source.rng(u64::MAX),
        })
    }

    pub fn size_step(&self) -> u64 {
        self.size_step
    }
}

impl TargetStrategy for DeterministicMultiples {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    fn propose(&mut self, request: &TargetRequest) -> Result<TargetProfile> {
        let s = self.size_step;
        let count = next_multiple(request.original_sizes.len() as u64, self.count_step as u64);

        let mut object_sizes: Vec<u64> = request
            .original_sizes
            .iter()
            .map(|&size| next_multiple(size, s))
            .collect();
        let steps = self.max_size / s;
        while (object_sizes.len() as u64) < count {
            object_sizes.push(self.rng.gen_range(1..=steps) * s);
        }

        Ok(TargetProfile {
            html_size: next_multiple(request.min_html_size, s),
            object_sizes,
        })
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::EscalateHtml {
            step: self.size_step,
        }
    }
}
