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


//! Randomness used for filler content.
//!
//! Filler only has to defeat compression, so a fast userspace generator seeded
//! from the thread-local generator is enough. Every call builds its own
//! generator, nothing is shared between concurrent padding calls.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

const STREAM_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Where filler randomness comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomSource {
    /// Fresh generator per call, seeded from `rand::thread_rng`.
    #[default]
    Entropy,
    /// Reproducible output: stream `n` of seed `s` always yields the same bytes.
    Seeded(u64),
}

impl RandomSource {
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(RandomSource::Seeded).unwrap_or_default()
    }

    /// Returns an independent generator for the given stream.
    pub fn rng(&self, stream: u64) -> StdRng {
        match *self {
            RandomSource::Entropy => {
                StdRng::from_rng(rand::thread_rng()).unwrap_or_else(|_| StdRng::from_entropy())
            }
            RandomSource::Seeded(seed) => {
                StdRng::seed_from_u64(seed ^ stream.wrapping_add(1).wrapping_mul(STREAM_MIX))
            }
        }
    }
}

/// `n` uniformly random bytes.
pub fn random_bytes(rng: &mut dyn RngCore, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rng.fill_bytes(&mut buf);
    buf
}

/// Appends `n` random characters from `[a-zA-Z0-9]` to `out`.
pub fn push_random_chars(rng: &mut dyn RngCore, out: &mut Vec<u8>, n: usize) {
    out.reserve(n);
    for _ in 0..n {
        out.push(rng.sample(Alphanumeric));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_streams_are_reproducible_and_distinct() {
        let source = RandomSource::Seeded(7);
        let a = random_bytes(&mut source.rng(1), 64);
        let b = random_bytes(&mut source.rng(1), 64);
        let c = random_bytes(&mut source.rng(2), 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn random_chars_are_alphanumeric() {
        let mut out = Vec::new();
        push_random_chars(&mut RandomSource::Seeded(3).rng(0), &mut out, 200);
        assert_eq!(out.len(), 200);
        assert!(out.iter().all(|b| b.is_ascii_alphanumeric()));
    }
}
