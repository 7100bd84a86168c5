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


//! Error types shared by every stage of a morph.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::page::ContentCategory;

pub type Result<T> = std::result::Result<T, MorphError>;

#[derive(Debug, Error)]
pub enum MorphError {
    /// A referenced object could not be stat'd or read.
    #[error("cannot resolve '{reference}' at {}: {source}", .path.display())]
    Resolution {
        reference: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The target object sizes cannot dominate the original ones.
    #[error("target sizes {target:?} cannot cover original sizes {original:?}")]
    InfeasibleTarget { original: Vec<u64>, target: Vec<u64> },

    /// The rewritten HTML is already larger than the target HTML size.
    #[error("html needs at least {required} bytes but the target is {target}")]
    HtmlOverflow { required: u64, target: u64 },

    #[error("cannot pad {category} content of {current} bytes to {target} bytes")]
    PaddingTooSmall {
        category: ContentCategory,
        current: u64,
        target: u64,
    },

    #[error("no closing body tag in {}", .path.display())]
    MalformedDocument { path: PathBuf },

    #[error("corrupted distribution file {}: {reason}", .path.display())]
    CorruptDistribution { path: PathBuf, reason: String },

    #[error("no padding strategy for {category} content")]
    UnsupportedCategory { category: ContentCategory },

    #[error("gave up after {attempts} sampled targets: {last}")]
    MorphUnachievable {
        attempts: usize,
        #[source]
        last: Box<MorphError>,
    },

    #[error("malformed size list {}: {reason}", .path.display())]
    TargetFormat { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl MorphError {
    /// True for failures caused by a target profile that is too small for the
    /// page. These are the only errors a resampling strategy may retry.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            MorphError::InfeasibleTarget { .. } | MorphError::HtmlOverflow { .. }
        )
    }
}
