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


//! Configuration parsed from a TOML file.
//!
//! ```toml
//! [morph]
//! max_attempts = 20
//! filler_dir = "random-objects"
//! seed = 7
//!
//! [discovery]
//! scripts = false
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{MorphError, Result};
use crate::page::DiscoveryRules;

/// Sampled targets tried before a distribution morph gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 20;

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphConfig {
    pub max_attempts: usize,
    pub filler_dir: String,
    pub filler_prefix: String,
    pub filler_extension: String,
    /// Rewrite matched references to `path?type=..&size=..`.
    pub annotate_references: bool,
    /// Pad and write objects on the rayon pool.
    pub parallel: bool,
    pub seed: Option<u64>,
    pub document_root: Option<PathBuf>,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            filler_dir: "random-objects".into(),
            filler_prefix: "rnd-".into(),
            filler_extension: "png".into(),
            annotate_references: false,
            parallel: true,
            seed: None,
            document_root: None,
        }
    }
}

impl MorphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(MorphError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.filler_dir.is_empty()
            || Path::new(&self.filler_dir).is_absolute()
            || self.filler_dir.split('/').any(|part| part == "..")
        {
            return Err(MorphError::InvalidConfig(format!(
                "filler_dir '{}' must be a relative path inside the output",
                self.filler_dir
            )));
        }
        if self.filler_extension.contains(['/', '.']) {
            return Err(MorphError::InvalidConfig(format!(
                "invalid filler_extension '{}'",
                self.filler_extension
            )));
        }
        Ok(())
    }

    /// Reference used in the HTML for the `n`-th filler object.
    pub fn filler_reference(&self, n: usize) -> String {
        let name = if self.filler_extension.is_empty() {
            format!("{}{}", self.filler_prefix, n)
        } else {
            format!("{}{}.{}", self.filler_prefix, n, self.filler_extension)
        };
        format!("{}/{}", self.filler_dir.trim_end_matches('/'), name)
    }
}

/// Unified configuration: morphing plus object discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub morph: MorphConfig,
    pub discovery: DiscoveryRules,
}

impl AppConfig {
    /// Load configuration from a TOML string. Missing keys keep their
    /// defaults.
    pub fn from_toml(s: &str) -> Result<Self> {
        #[derive(Deserialize, Default)]
        #[serde(deny_unknown_fields)]
        struct Root {
            morph: Option<MorphSection>,
            discovery: Option<DiscoverySection>,
        }

        #[derive(Deserialize, Default)]
        #[serde(deny_unknown_fields)]
        struct MorphSection {
            max_attempts: Option<usize>,
            filler_dir: Option<String>,
            filler_prefix: Option<String>,
            filler_extension: Option<String>,
            annotate_references: Option<bool>,
            parallel: Option<bool>,
            seed: Option<u64>,
            document_root: Option<PathBuf>,
        }

        #[derive(Deserialize, Default)]
        #[serde(deny_unknown_fields)]
        struct DiscoverySection {
            images: Option<bool>,
            stylesheets: Option<bool>,
            scripts: Option<bool>,
            linked_images: Option<bool>,
        }

        let raw: Root = toml::from_str(s)?;
        let m = raw.morph.unwrap_or_default();
        let d = raw.discovery.unwrap_or_default();
        let defaults = MorphConfig::default();
        let rules = DiscoveryRules::default();

        let cfg = Self {
            morph: MorphConfig {
                max_attempts: m.max_attempts.unwrap_or(defaults.max_attempts),
                filler_dir: m.filler_dir.unwrap_or(defaults.filler_dir),
                filler_prefix: m.filler_prefix.unwrap_or(defaults.filler_prefix),
                filler_extension: m.filler_extension.unwrap_or(defaults.filler_extension),
                annotate_references: m
                    .annotate_references
                    .unwrap_or(defaults.annotate_references),
                parallel: m.parallel.unwrap_or(defaults.parallel),
                seed: m.seed,
                document_root: m.document_root,
            },
            discovery: DiscoveryRules {
                images: d.images.unwrap_or(rules.images),
                stylesheets: d.stylesheets.unwrap_or(rules.stylesheets),
                scripts: d.scripts.unwrap_or(rules.scripts),
                linked_images: d.linked_images.unwrap_or(rules.linked_images),
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.morph.validate()
    }
}
