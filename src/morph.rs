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


//! # Morph Orchestrator
//!
//! Drives one morph: obtain a target profile, match original objects to
//! target sizes, pad every object, fabricate fillers for unused target sizes,
//! rewrite and pad the HTML. Everything is computed in memory first; nothing
//! reaches the output directory unless the whole page morphed successfully.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::app_config::{AppConfig, MorphConfig};
use crate::error::{MorphError, Result};
use crate::matcher::{match_sizes, MatchAssignment};
use crate::padding::{PaddingGenerator, RandomSource};
use crate::page::{mirror_path, ContentCategory, Page, PageLoader};
use crate::strategy::{RetryPolicy, TargetProfile, TargetRequest, TargetStrategy};
use crate::telemetry;

const BODY_CLOSE: &str = "</body>";

/// A padded original object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    pub reference: String,
    pub original_size: u64,
    pub target_size: u64,
    pub output: PathBuf,
}

/// A fabricated filler object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillerReport {
    pub output: PathBuf,
    pub size: u64,
}

/// Summary of a finished morph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MorphReport {
    pub page: Option<PathBuf>,
    pub strategy: String,
    pub html_size: u64,
    pub target_html_size: u64,
    pub objects: Vec<ObjectReport>,
    pub fillers: Vec<FillerReport>,
    pub attempts: usize,
}

/// One output file, relative to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphedObject {
    pub relative_path: PathBuf,
    pub content: Vec<u8>,
}

/// A fully morphed page held in memory.
#[derive(Debug, Clone)]
pub struct MorphedPage {
    pub html_name: String,
    pub html: String,
    pub objects: Vec<MorphedObject>,
    pub report: MorphReport,
}

impl MorphedPage {
    /// Writes every object, then the HTML. Object writes run on the rayon
    /// pool when `parallel` is set; the first failure aborts the rest.
    pub fn write_to(&self, dst: &Path, parallel: bool) -> Result<()> {
        let write = |obj: &MorphedObject| -> Result<()> {
            let path = dst.join(&obj.relative_path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &obj.content)?;
            Ok(())
        };
        if parallel {
            self.objects.par_iter().try_for_each(write)?;
        } else {
            self.objects.iter().try_for_each(write)?;
        }

        fs::create_dir_all(dst)?;
        let html_path = dst.join(&self.html_name);
        info!(
            "writing {} ({} bytes)",
            html_path.display(),
            self.html.len()
        );
        fs::write(html_path, &self.html)?;
        Ok(())
    }
}

/// Morphs pages according to a [`TargetStrategy`].
#[derive(Clone)]
pub struct Morpher {
    config: MorphConfig,
    loader: PageLoader,
    padding: PaddingGenerator,
}

impl Morpher {
    pub fn new(config: AppConfig) -> Self {
        let mut loader = PageLoader::new(config.discovery);
        loader.document_root = config.morph.document_root.clone();
        let padding = PaddingGenerator::new(RandomSource::from_seed(config.morph.seed));
        Self {
            config: config.morph,
            loader,
            padding,
        }
    }

    /// Replaces the padding generator, e.g. to register extra padders.
    pub fn with_padding(mut self, padding: PaddingGenerator) -> Self {
        self.padding = padding;
        self
    }

    pub fn config(&self) -> &MorphConfig {
        &self.config
    }

    pub fn loader(&self) -> &PageLoader {
        &self.loader
    }

    pub fn load(&self, path: &Path) -> Result<Page> {
        self.loader.load(path)
    }

    /// Loads the page at `path`, morphs it and writes the result into `dst`.
    pub fn morph_file(
        &self,
        path: &Path,
        strategy: &mut dyn TargetStrategy,
        dst: &Path,
    ) -> Result<MorphReport> {
        let page = self.load(path)?;
        let morphed = self.morph_page(&page, strategy)?;
        morphed.write_to(dst, self.config.parallel)?;
        record_metrics(&morphed.report);
        Ok(morphed.report)
    }

    /// Morphs `page` in memory.
    pub fn morph_page(
        &self,
        page: &Page,
        strategy: &mut dyn TargetStrategy,
    ) -> Result<MorphedPage> {
        let request = TargetRequest::for_page(page);
        let policy = strategy.retry_policy();
        let max_attempts = match policy {
            RetryPolicy::Resample => self.config.max_attempts.max(1),
            RetryPolicy::SingleShot | RetryPolicy::EscalateHtml { .. } => 1,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = strategy
                .propose(&request)
                .and_then(|profile| self.materialize(page, &profile, policy));
            match result {
                Ok(mut morphed) => {
                    morphed.report.strategy = strategy.name().to_string();
                    morphed.report.attempts = attempt;
                    info!(
                        "morphed {} with {} after {} attempt(s): html {} -> {}, {} objects, {} fillers",
                        page.file_name(),
                        strategy.name(),
                        attempt,
                        morphed.report.html_size,
                        morphed.report.target_html_size,
                        morphed.report.objects.len(),
                        morphed.report.fillers.len()
                    );
                    return Ok(morphed);
                }
                Err(e) if policy == RetryPolicy::Resample && e.is_infeasible() => {
                    telemetry::RESAMPLE_ATTEMPTS.inc();
                    warn!(
                        "couldn't morph {:?} (html {}): {}",
                        request.original_sizes, request.min_html_size, e
                    );
                    if attempt >= max_attempts {
                        return Err(MorphError::MorphUnachievable {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn materialize(
        &self,
        page: &Page,
        profile: &TargetProfile,
        policy: RetryPolicy,
    ) -> Result<MorphedPage> {
        let original = page.get_sizes();
        let assignment = match_sizes(&original, &profile.object_sizes)?;
        if assignment.remainders.contains(&0) {
            return Err(MorphError::InfeasibleTarget {
                original,
                target: profile.object_sizes.clone(),
            });
        }

        let filler_refs = self.filler_references(page, assignment.remainders.len());

        // The HTML is settled before any object is padded, so a rejected
        // profile costs no object I/O.
        let html_stream = (page.objects().len() + filler_refs.len()) as u64;
        let mut target_html_size = profile.html_size;
        let html = match self.build_html(page, &assignment, &filler_refs, target_html_size, html_stream) {
            Err(e @ MorphError::HtmlOverflow { .. }) => match policy {
                RetryPolicy::EscalateHtml { step } => {
                    warn!(
                        "couldn't morph html of {} to {}, trying {}",
                        page.file_name(),
                        target_html_size,
                        target_html_size + step
                    );
                    target_html_size += step;
                    self.build_html(page, &assignment, &filler_refs, target_html_size, html_stream)?
                }
                _ => return Err(e),
            },
            other => other?,
        };

        let mut objects = self.pad_objects(page, &assignment)?;
        let mut report_objects = Vec::with_capacity(assignment.pairs.len());
        for &(index, target) in &assignment.pairs {
            let obj = &page.objects()[index];
            report_objects.push(ObjectReport {
                reference: obj.reference_path.clone(),
                original_size: obj.size_bytes,
                target_size: target,
                output: mirror_path(&obj.reference_path).unwrap_or_default(),
            });
        }

        let mut fillers = Vec::with_capacity(filler_refs.len());
        for (n, (reference, &size)) in filler_refs.iter().zip(&assignment.remainders).enumerate() {
            debug!("adding {} with size {}", reference, size);
            let stream = (page.objects().len() + n) as u64;
            let relative_path = PathBuf::from(reference);
            objects.push(MorphedObject {
                relative_path: relative_path.clone(),
                content: self.padding.fabricate(size, stream),
            });
            fillers.push(FillerReport {
                output: relative_path,
                size,
            });
        }

        Ok(MorphedPage {
            html_name: page.file_name().to_string(),
            html,
            objects,
            report: MorphReport {
                page: page.path().map(Path::to_path_buf),
                strategy: String::new(),
                html_size: page.html_size(),
                target_html_size,
                objects: report_objects,
                fillers,
                attempts: 0,
            },
        })
    }

    /// References for `count` fillers. Names already used by an original
    /// object (a page morphed before) are skipped so no two outputs share a
    /// file.
    fn filler_references(&self, page: &Page, count: usize) -> Vec<String> {
        let taken: HashSet<PathBuf> = page
            .objects()
            .iter()
            .filter_map(|o| mirror_path(&o.reference_path))
            .collect();
        (0..)
            .map(|n| self.config.filler_reference(n))
            .filter(|r| match mirror_path(r) {
                Some(path) => !taken.contains(&path),
                None => true,
            })
            .take(count)
            .collect()
    }

    /// Pads every matched original object to its assigned size.
    fn pad_objects(&self, page: &Page, assignment: &MatchAssignment) -> Result<Vec<MorphedObject>> {
        let pad_one = |&(index, target): &(usize, u64)| -> Result<MorphedObject> {
            let obj = &page.objects()[index];
            let relative_path =
                mirror_path(&obj.reference_path).ok_or_else(|| MorphError::Resolution {
                    reference: obj.reference_path.clone(),
                    path: obj.resolved_path.clone(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "reference points outside the output directory",
                    ),
                })?;
            let original = fs::read(&obj.resolved_path).map_err(|source| MorphError::Resolution {
                reference: obj.reference_path.clone(),
                path: obj.resolved_path.clone(),
                source,
            })?;
            debug!(
                "morphing {} ({} bytes) to size {}",
                obj.reference_path,
                original.len(),
                target
            );
            let content = self
                .padding
                .pad(&obj.category, &original, target, index as u64)?;
            Ok(MorphedObject {
                relative_path,
                content,
            })
        };

        if self.config.parallel {
            assignment.pairs.par_iter().map(pad_one).collect()
        } else {
            assignment.pairs.iter().map(pad_one).collect()
        }
    }

    /// Rewrites references, injects filler tags before `</body>` and pads
    /// the result to `target`.
    fn build_html(
        &self,
        page: &Page,
        assignment: &MatchAssignment,
        filler_refs: &[String],
        target: u64,
        stream: u64,
    ) -> Result<String> {
        let mut html = page.content().to_string();

        if self.config.annotate_references {
            for &(index, size) in &assignment.pairs {
                let obj = &page.objects()[index];
                let annotated = format!(
                    "{}?type={}&size={}",
                    obj.bare_reference(),
                    obj.category,
                    size
                );
                // The parsed reference is entity-decoded; the markup may still
                // spell `&` as `&amp;`.
                let encoded = obj.reference_path.replace('&', "&amp;");
                let mut replaced = false;
                for spelling in [obj.reference_path.as_str(), encoded.as_str()] {
                    for quote in ['"', '\''] {
                        let needle = format!("={q}{}{q}", spelling, q = quote);
                        if html.contains(&needle) {
                            html = html.replace(&needle, &format!("={q}{}{q}", annotated, q = quote));
                            replaced = true;
                        }
                    }
                }
                if !replaced {
                    warn!(
                        "cannot annotate '{}': reference not found verbatim in {}",
                        obj.reference_path,
                        page.file_name()
                    );
                }
            }
        }

        let injected: String = filler_refs
            .iter()
            .map(|r| format!("<img src=\"{}\" style=\"visibility:hidden\">", r))
            .collect();

        let body = html
            .to_ascii_lowercase()
            .find(BODY_CLOSE)
            .ok_or_else(|| MorphError::MalformedDocument {
                path: page
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(page.file_name())),
            })?;
        html.insert_str(body, &injected);

        let current = html.len() as u64;
        if current != target {
            let required = current + self.padding.min_overhead(&ContentCategory::Html);
            if required > target {
                return Err(MorphError::HtmlOverflow { required, target });
            }
        }
        self.padding.pad_html(&html, target, stream)
    }
}

fn record_metrics(report: &MorphReport) {
    let object_bytes: u64 = report
        .objects
        .iter()
        .map(|o| o.target_size.saturating_sub(o.original_size))
        .sum();
    let filler_bytes: u64 = report.fillers.iter().map(|f| f.size).sum();
    let html_bytes = report.target_html_size.saturating_sub(report.html_size);
    telemetry::PAGES_MORPHED.inc();
    telemetry::OBJECTS_PADDED.inc_by(report.objects.len() as u64);
    telemetry::FILLER_OBJECTS.inc_by(report.fillers.len() as u64);
    telemetry::PADDING_BYTES.inc_by(object_bytes + filler_bytes + html_bytes);
}
