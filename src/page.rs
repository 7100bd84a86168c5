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


//! # Page Model
//!
//! A [`Page`] is one HTML document plus the embedded objects it references
//! (images, stylesheets, scripts). Object sizes are read from disk once, when
//! the page is loaded, and never change afterwards.

use log::debug;
use select::document::Document;
use select::predicate::Any;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{MorphError, Result};

const DEFAULT_HTML_NAME: &str = "index.html";

/// The kind of content an object holds, inferred from its file extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ContentCategory {
    Html,
    Css,
    Js,
    Svg,
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Pdf,
    Unknown(String),
}

impl ContentCategory {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => ContentCategory::Html,
            "css" => ContentCategory::Css,
            "js" | "mjs" => ContentCategory::Js,
            "svg" => ContentCategory::Svg,
            "png" => ContentCategory::Png,
            "jpg" | "jpeg" => ContentCategory::Jpeg,
            "gif" => ContentCategory::Gif,
            "bmp" => ContentCategory::Bmp,
            "tif" | "tiff" => ContentCategory::Tiff,
            "pdf" => ContentCategory::Pdf,
            other => ContentCategory::Unknown(other.to_string()),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentCategory::Html => "html",
            ContentCategory::Css => "css",
            ContentCategory::Js => "js",
            ContentCategory::Svg => "svg",
            ContentCategory::Png => "png",
            ContentCategory::Jpeg => "jpg",
            ContentCategory::Gif => "gif",
            ContentCategory::Bmp => "bmp",
            ContentCategory::Tiff => "tiff",
            ContentCategory::Pdf => "pdf",
            ContentCategory::Unknown(ext) => ext,
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentCategory::Unknown(ext) if ext.is_empty() => f.write_str("unknown"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<ContentCategory> for String {
    fn from(category: ContentCategory) -> Self {
        category.to_string()
    }
}

/// Which kinds of references count as paddable objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryRules {
    /// `<img src>`
    pub images: bool,
    /// `<link rel="stylesheet" href>`
    pub stylesheets: bool,
    /// `<script src>`
    pub scripts: bool,
    /// `<link type="image/..." href>`, e.g. favicons
    pub linked_images: bool,
}

impl Default for DiscoveryRules {
    fn default() -> Self {
        Self {
            images: true,
            stylesheets: true,
            scripts: true,
            linked_images: true,
        }
    }
}

impl DiscoveryRules {
    /// Only `<img>` and stylesheets, as early page generations did.
    pub fn images_and_stylesheets() -> Self {
        Self {
            images: true,
            stylesheets: true,
            scripts: false,
            linked_images: false,
        }
    }

    /// Returns the referenced path of an element if these rules select it.
    fn reference<'a>(&self, node: &select::node::Node<'a>) -> Option<&'a str> {
        match node.name()? {
            "img" if self.images => node.attr("src"),
            "script" if self.scripts => node.attr("src"),
            "link" => {
                let href = node.attr("href")?;
                let is_stylesheet = node
                    .attr("rel")
                    .map(|rel| {
                        rel.split_ascii_whitespace()
                            .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                    })
                    .unwrap_or(false);
                let is_image = node
                    .attr("type")
                    .map(|t| t.trim().to_ascii_lowercase().starts_with("image/"))
                    .unwrap_or(false);
                if (is_stylesheet && self.stylesheets) || (is_image && self.linked_images) {
                    Some(href)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// One resource referenced by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedObject {
    /// The reference exactly as written in the HTML.
    pub reference_path: String,
    /// Where the original bytes live on disk.
    pub resolved_path: PathBuf,
    /// Size on disk at discovery time.
    pub size_bytes: u64,
    pub category: ContentCategory,
}

impl EmbeddedObject {
    /// The reference without any `?query` or `#fragment` suffix.
    pub fn bare_reference(&self) -> &str {
        strip_query(&self.reference_path)
    }
}

/// An HTML document and its discovered objects. Read-only once built.
#[derive(Debug, Clone)]
pub struct Page {
    path: Option<PathBuf>,
    content: String,
    objects: Vec<EmbeddedObject>,
}

impl Page {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File name used for the morphed HTML.
    pub fn file_name(&self) -> &str {
        self.path
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_HTML_NAME)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn html_size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn objects(&self) -> &[EmbeddedObject] {
        &self.objects
    }

    /// Original object sizes, in discovery order.
    pub fn get_sizes(&self) -> Vec<u64> {
        self.objects.iter().map(|o| o.size_bytes).collect()
    }
}

/// Builds [`Page`]s, resolving references against the filesystem.
#[derive(Debug, Clone, Default)]
pub struct PageLoader {
    pub rules: DiscoveryRules,
    /// Base for root-relative references such as `/img/a.png`. Defaults to the
    /// directory holding the HTML file.
    pub document_root: Option<PathBuf>,
}

impl PageLoader {
    pub fn new(rules: DiscoveryRules) -> Self {
        Self {
            rules,
            document_root: None,
        }
    }

    pub fn with_document_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.document_root = Some(root.into());
        self
    }

    /// Loads the HTML file at `path` and stats every object it references.
    pub fn load(&self, path: &Path) -> Result<Page> {
        let content = fs::read_to_string(path).map_err(|source| MorphError::Resolution {
            reference: path.display().to_string(),
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut page = self.parse(content, base_dir)?;
        page.path = Some(path.to_path_buf());
        Ok(page)
    }

    /// Builds a page from HTML text whose relative references live under
    /// `base_dir`.
    pub fn parse(&self, content: impl Into<String>, base_dir: &Path) -> Result<Page> {
        let content = content.into();
        let root = self.document_root.as_deref().unwrap_or(base_dir);
        let mut seen = HashSet::new();
        let mut objects = Vec::new();

        let document = Document::from(content.as_str());
        for node in document.find(Any) {
            let Some(reference) = self.rules.reference(&node) else {
                continue;
            };
            let reference = reference.trim();
            if reference.is_empty() || is_external(reference) {
                debug!("skipping non-local reference '{}'", reference);
                continue;
            }
            // Spellings of one resource (`a.png`, `./a.png`, `/a.png`) share an
            // output file and count as one object.
            let key = mirror_path(reference)
                .unwrap_or_else(|| PathBuf::from(strip_query(reference)));
            if !seen.insert(key) {
                debug!("skipping duplicate reference '{}'", reference);
                continue;
            }
            objects.push(resolve_object(reference, base_dir, root)?);
        }

        Ok(Page {
            path: None,
            content,
            objects,
        })
    }
}

fn resolve_object(reference: &str, base_dir: &Path, root: &Path) -> Result<EmbeddedObject> {
    let bare = strip_query(reference);
    let resolved_path = match bare.strip_prefix('/') {
        Some(rooted) => root.join(rooted),
        None => base_dir.join(bare),
    };
    let meta = fs::metadata(&resolved_path).map_err(|source| MorphError::Resolution {
        reference: reference.to_string(),
        path: resolved_path.clone(),
        source,
    })?;
    Ok(EmbeddedObject {
        reference_path: reference.to_string(),
        category: ContentCategory::from_path(Path::new(bare)),
        size_bytes: meta.len(),
        resolved_path,
    })
}

/// Drops a `?query` and/or `#fragment` suffix from a reference.
pub fn strip_query(reference: &str) -> &str {
    match reference.find(['?', '#']) {
        Some(idx) => &reference[..idx],
        None => reference,
    }
}

fn is_external(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("//")
        || ["http:", "https:", "data:", "mailto:", "javascript:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
}

/// Path, relative to the output directory, at which a morphed copy of
/// `reference` is stored. `None` when the reference would land outside it.
pub fn mirror_path(reference: &str) -> Option<PathBuf> {
    let bare = strip_query(reference);
    let mut out = PathBuf::new();
    for component in Path::new(bare.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
