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


//! Morph towards the sizes of a known page.

use std::fs;
use std::path::Path;

use super::{RetryPolicy, TargetProfile, TargetRequest, TargetStrategy};
use crate::error::{MorphError, Result};
use crate::page::Page;

/// Uses a fixed target profile verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitTarget {
    profile: TargetProfile,
}

impl ExplicitTarget {
    pub fn new(profile: TargetProfile) -> Self {
        Self { profile }
    }

    /// Targets the HTML size and object sizes of another page.
    pub fn from_page(template: &Page) -> Self {
        Self::new(TargetProfile {
            html_size: template.html_size(),
            object_sizes: template.get_sizes(),
        })
    }

    /// Reads a whitespace separated size list: the HTML size followed by the
    /// object sizes.
    pub fn from_size_list(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_size_list(&text, path)
    }

    pub fn parse_size_list(text: &str, path: &Path) -> Result<Self> {
        let mut sizes = Vec::new();
        for token in text.split_whitespace() {
            let size = token.parse::<u64>().map_err(|e| MorphError::TargetFormat {
                path: path.to_path_buf(),
                reason: format!("'{}': {}", token, e),
            })?;
            sizes.push(size);
        }
        let Some((&html_size, objects)) = sizes.split_first() else {
            return Err(MorphError::TargetFormat {
                path: path.to_path_buf(),
                reason: "no html size".into(),
            });
        };
        Ok(Self::new(TargetProfile {
            html_size,
            object_sizes: objects.to_vec(),
        }))
    }

    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }
}

impl TargetStrategy for ExplicitTarget {
    fn name(&self) -> &'static str {
        "target"
    }

    fn propose(&mut self, _request: &TargetRequest) -> Result<TargetProfile> {
        Ok(self.profile.clone())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::SingleShot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_list_puts_html_first() {
        let t = ExplicitTarget::parse_size_list("1200\n300 40\n\n5\n", Path::new("t.txt")).unwrap();
        assert_eq!(t.profile().html_size, 1200);
        assert_eq!(t.profile().object_sizes, vec![300, 40, 5]);
    }

    #[test]
    fn bad_size_lists_are_rejected() {
        for text in ["", "  \n", "12 x 4", "-3"] {
            let err = ExplicitTarget::parse_size_list(text, Path::new("t.txt")).unwrap_err();
            assert!(matches!(err, MorphError::TargetFormat { .. }), "{text:?}");
        }
    }
}
