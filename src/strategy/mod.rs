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


//! # Target Strategies
//!
//! A strategy proposes the sizes a morphed page should have: one HTML size
//! and a list of object sizes. Three strategies exist:
//!
//! * [`ExplicitTarget`] copies the sizes of a template page or size list.
//! * [`DistributionSampler`] draws sizes from fitted distributions.
//! * [`DeterministicMultiples`] rounds sizes up to multiples of a step.

pub mod deterministic;
pub mod distribution;
pub mod explicit;

use serde::Serialize;

use crate::error::Result;
use crate::page::Page;

pub use deterministic::DeterministicMultiples;
pub use distribution::{DistributionSampler, Histogram, Kde, ScalarDistribution};
pub use explicit::ExplicitTarget;

/// Lower bounds a proposal has to respect, derived from the original page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRequest {
    pub min_object_count: usize,
    pub min_html_size: u64,
    pub min_object_size: u64,
    /// Original object sizes in discovery order.
    pub original_sizes: Vec<u64>,
}

impl TargetRequest {
    pub fn for_page(page: &Page) -> Self {
        let original_sizes = page.get_sizes();
        Self {
            min_object_count: original_sizes.len(),
            min_html_size: page.html_size(),
            min_object_size: original_sizes.iter().copied().min().unwrap_or(0),
            original_sizes,
        }
    }
}

/// Sizes a morph aims to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetProfile {
    pub html_size: u64,
    /// No ordering relation to the page's objects is implied.
    pub object_sizes: Vec<u64>,
}

/// What the orchestrator may do when a proposal does not fit the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The first infeasible proposal is final.
    SingleShot,
    /// Draw a fresh proposal, up to the configured attempt cap.
    Resample,
    /// Grow the HTML target by `step` once if the rewritten HTML overflows.
    EscalateHtml { step: u64 },
}

pub trait TargetStrategy {
    fn name(&self) -> &'static str;

    fn propose(&mut self, request: &TargetRequest) -> Result<TargetProfile>;

    fn retry_policy(&self) -> RetryPolicy;
}
