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


//! # Padding Generator
//!
//! Produces content of an exact target size for a given content category.
//! Each category maps to a [`Padder`]; categories without a registered padder
//! fall back to appending random bytes.

pub mod random;

use log::warn;
use rand::RngCore;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use crate::error::{MorphError, Result};
use crate::page::ContentCategory;
pub use random::RandomSource;

/// Why a padder could not produce output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadRefusal {
    /// The target is below the current size plus the padder's overhead.
    TooSmall,
    /// The format needs structural rewriting that is not implemented.
    Unsupported,
}

/// Pads content of one category up to an exact size.
pub trait Padder: Send + Sync {
    /// Bytes the padder adds on top of the random filler itself.
    fn min_overhead(&self) -> u64;

    /// Returns `content` grown to exactly `target` bytes. A target equal to
    /// the current size returns the content unchanged.
    fn pad(
        &self,
        content: &[u8],
        target: u64,
        rng: &mut dyn RngCore,
    ) -> std::result::Result<Vec<u8>, PadRefusal>;
}

/// Opaque formats: random bytes appended after the original ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryAppend;

impl Padder for BinaryAppend {
    fn min_overhead(&self) -> u64 {
        0
    }

    fn pad(
        &self,
        content: &[u8],
        target: u64,
        rng: &mut dyn RngCore,
    ) -> std::result::Result<Vec<u8>, PadRefusal> {
        let current = content.len() as u64;
        if target < current {
            return Err(PadRefusal::TooSmall);
        }
        let mut out = Vec::with_capacity(target as usize);
        out.extend_from_slice(content);
        out.extend(random::random_bytes(rng, (target - current) as usize));
        Ok(out)
    }
}

/// Text formats: one trailing comment filled with random alphanumerics.
#[derive(Debug, Clone, Copy)]
pub struct CommentPadder {
    open: &'static str,
    close: &'static str,
}

impl CommentPadder {
    /// `<!-- ... -->`, for HTML and SVG.
    pub const MARKUP: CommentPadder = CommentPadder {
        open: "<!--",
        close: "-->",
    };
    /// `/* ... */`, for CSS and JavaScript.
    pub const BLOCK: CommentPadder = CommentPadder {
        open: "/*",
        close: "*/",
    };
}

impl Padder for CommentPadder {
    fn min_overhead(&self) -> u64 {
        (self.open.len() + self.close.len()) as u64
    }

    fn pad(
        &self,
        content: &[u8],
        target: u64,
        rng: &mut dyn RngCore,
    ) -> std::result::Result<Vec<u8>, PadRefusal> {
        let current = content.len() as u64;
        if target == current {
            return Ok(content.to_vec());
        }
        let fill = target
            .checked_sub(current + self.min_overhead())
            .ok_or(PadRefusal::TooSmall)?;
        let mut out = Vec::with_capacity(target as usize);
        out.extend_from_slice(content);
        out.extend_from_slice(self.open.as_bytes());
        random::push_random_chars(rng, &mut out, fill as usize);
        out.extend_from_slice(self.close.as_bytes());
        Ok(out)
    }
}

/// Formats whose padding must respect internal structure (TIFF, PDF).
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl Padder for Unsupported {
    fn min_overhead(&self) -> u64 {
        0
    }

    fn pad(
        &self,
        _content: &[u8],
        _target: u64,
        _rng: &mut dyn RngCore,
    ) -> std::result::Result<Vec<u8>, PadRefusal> {
        Err(PadRefusal::Unsupported)
    }
}

/// Category-aware padding front end.
#[derive(Clone)]
pub struct PaddingGenerator {
    padders: HashMap<ContentCategory, Arc<dyn Padder>>,
    fallback: Arc<dyn Padder>,
    source: RandomSource,
}

impl PaddingGenerator {
    /// Generator with the built-in padders registered.
    pub fn new(source: RandomSource) -> Self {
        let binary: Arc<dyn Padder> = Arc::new(BinaryAppend);
        let markup: Arc<dyn Padder> = Arc::new(CommentPadder::MARKUP);
        let block: Arc<dyn Padder> = Arc::new(CommentPadder::BLOCK);
        let unsupported: Arc<dyn Padder> = Arc::new(Unsupported);

        let mut padders = HashMap::new();
        for category in [
            ContentCategory::Png,
            ContentCategory::Jpeg,
            ContentCategory::Gif,
            ContentCategory::Bmp,
        ] {
            padders.insert(category, Arc::clone(&binary));
        }
        padders.insert(ContentCategory::Html, Arc::clone(&markup));
        padders.insert(ContentCategory::Svg, markup);
        padders.insert(ContentCategory::Css, Arc::clone(&block));
        padders.insert(ContentCategory::Js, block);
        padders.insert(ContentCategory::Tiff, Arc::clone(&unsupported));
        padders.insert(ContentCategory::Pdf, unsupported);

        Self {
            padders,
            fallback: binary,
            source,
        }
    }

    /// Replaces the padder used for `category`.
    pub fn register(&mut self, category: ContentCategory, padder: Arc<dyn Padder>) {
        self.padders.insert(category, padder);
    }

    pub fn source(&self) -> RandomSource {
        self.source
    }

    fn padder(&self, category: &ContentCategory) -> &dyn Padder {
        match self.padders.get(category) {
            Some(padder) => padder.as_ref(),
            None => {
                warn!(
                    "no padder for '{}' content, appending random bytes (this may not work)",
                    category
                );
                self.fallback.as_ref()
            }
        }
    }

    /// Smallest non-zero growth `category` content can take.
    pub fn min_overhead(&self, category: &ContentCategory) -> u64 {
        self.padder(category).min_overhead()
    }

    /// Pads `content` to `target` bytes using randomness stream `stream`.
    pub fn pad(
        &self,
        category: &ContentCategory,
        content: &[u8],
        target: u64,
        stream: u64,
    ) -> Result<Vec<u8>> {
        self.pad_with(category, content, target, &mut self.source.rng(stream))
    }

    /// Pads with a caller-provided generator.
    pub fn pad_with(
        &self,
        category: &ContentCategory,
        content: &[u8],
        target: u64,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<u8>> {
        self.padder(category)
            .pad(content, target, rng)
            .map_err(|refusal| match refusal {
                PadRefusal::TooSmall => MorphError::PaddingTooSmall {
                    category: category.clone(),
                    current: content.len() as u64,
                    target,
                },
                PadRefusal::Unsupported => MorphError::UnsupportedCategory {
                    category: category.clone(),
                },
            })
    }

    /// Pads an HTML document with a trailing comment.
    pub fn pad_html(&self, html: &str, target: u64, stream: u64) -> Result<String> {
        let padded = self.pad(&ContentCategory::Html, html.as_bytes(), target, stream)?;
        String::from_utf8(padded).map_err(|e| MorphError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// A brand new filler object: `size` random bytes.
    pub fn fabricate(&self, size: u64, stream: u64) -> Vec<u8> {
        random::random_bytes(&mut self.source.rng(stream), size as usize)
    }
}

impl Default for PaddingGenerator {
    fn default() -> Self {
        Self::new(RandomSource::Entropy)
    }
}
