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


//! # Distribution Sampler
//!
//! Samples target page sizes from three one-dimensional distributions: the
//! number of objects, the HTML size and the size of each object. Two model
//! formats are understood, histograms and Gaussian kernel density estimates.
//!
//! Histogram files (`.his`) hold one `<value> <probability>` record per line;
//! probabilities must sum to one. KDE files hold an optional
//! `bandwidth <float>` header followed by `<point> [weight]` records.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, RngCore};
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use super::{RetryPolicy, TargetProfile, TargetRequest, TargetStrategy};
use crate::error::{MorphError, Result};
use crate::padding::RandomSource;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Draws per scalar before a KDE sample is declared out of reach.
pub const MAX_DRAWS: usize = 10_000;

/// A one-dimensional distribution over non-negative integers.
pub trait ScalarDistribution: Send {
    /// Draws one value that is at least `min`.
    fn sample_at_least(&self, min: u64, rng: &mut dyn RngCore) -> Result<u64>;

    /// Draws `n` values, each at least `min`.
    fn sample_many(&self, n: usize, min: u64, rng: &mut dyn RngCore) -> Result<Vec<u64>> {
        (0..n).map(|_| self.sample_at_least(min, &mut *rng)).collect()
    }
}

fn corrupt(path: &Path, reason: impl Into<String>) -> MorphError {
    MorphError::CorruptDistribution {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn out_of_reach(min: u64, largest: u64) -> MorphError {
    MorphError::InfeasibleTarget {
        original: vec![min],
        target: vec![largest],
    }
}

/// Discrete distribution read from a histogram file.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    values: Vec<u64>,
    probabilities: Vec<f64>,
}

impl Histogram {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| corrupt(path, e.to_string()))?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut values = Vec::new();
        let mut probabilities = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [value, probability] = fields[..] else {
                return Err(corrupt(path, format!("line {}: expected '<value> <probability>'", lineno + 1)));
            };
            let value = value
                .parse::<u64>()
                .map_err(|e| corrupt(path, format!("line {}: {}", lineno + 1, e)))?;
            let probability = probability
                .parse::<f64>()
                .map_err(|e| corrupt(path, format!("line {}: {}", lineno + 1, e)))?;
            if !probability.is_finite() || probability < 0.0 {
                return Err(corrupt(path, format!("line {}: invalid probability", lineno + 1)));
            }
            values.push(value);
            probabilities.push(probability);
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(corrupt(
                path,
                format!("probabilities sum up to {}, not 1", total),
            ));
        }
        Ok(Self {
            values,
            probabilities,
        })
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }
}

impl ScalarDistribution for Histogram {
    /// Samples from the histogram restricted to values `>= min` and
    /// renormalised.
    fn sample_at_least(&self, min: u64, rng: &mut dyn RngCore) -> Result<u64> {
        let (values, weights): (Vec<u64>, Vec<f64>) = self
            .values
            .iter()
            .zip(&self.probabilities)
            .filter(|&(&v, &p)| v >= min && p > 0.0)
            .map(|(&v, &p)| (v, p))
            .unzip();
        let largest = self.values.iter().copied().max().unwrap_or(0);
        let index = WeightedIndex::new(&weights).map_err(|_| out_of_reach(min, largest))?;
        Ok(values[index.sample(rng)])
    }
}

/// Gaussian kernel density estimate over a set of weighted points.
#[derive(Debug, Clone, PartialEq)]
pub struct Kde {
    points: Vec<f64>,
    weights: Vec<f64>,
    bandwidth: f64,
}

impl Kde {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| corrupt(path, e.to_string()))?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut bandwidth = 1.0;
        let mut points = Vec::new();
        let mut weights = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let parse = |s: &str| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| corrupt(path, format!("line {}: bad number '{}'", lineno + 1, s)))
            };
            match fields[..] {
                [] => continue,
                ["bandwidth", bw] if points.is_empty() => bandwidth = parse(bw)?,
                [point] => {
                    points.push(parse(point)?);
                    weights.push(1.0);
                }
                [point, weight] => {
                    points.push(parse(point)?);
                    weights.push(parse(weight)?);
                }
                _ => return Err(corrupt(path, format!("line {}: unexpected record", lineno + 1))),
            }
        }
        if points.is_empty() {
            return Err(corrupt(path, "no sample points"));
        }
        if bandwidth <= 0.0 {
            return Err(corrupt(path, "bandwidth must be positive"));
        }
        if weights.iter().any(|&w| w < 0.0) || weights.iter().all(|&w| w == 0.0) {
            return Err(corrupt(path, "weights must be non-negative and not all zero"));
        }
        Ok(Self {
            points,
            weights,
            bandwidth,
        })
    }
}

/// Standard normal deviate (Box-Muller).
fn standard_normal(rng: &mut dyn RngCore) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

impl ScalarDistribution for Kde {
    fn sample_at_least(&self, min: u64, rng: &mut dyn RngCore) -> Result<u64> {
        let index = WeightedIndex::new(&self.weights).map_err(|_| out_of_reach(min, 0))?;
        for _ in 0..MAX_DRAWS {
            let x = self.points[index.sample(rng)] + self.bandwidth * standard_normal(rng);
            let x = x.trunc();
            if x >= 0.0 && x as u64 >= min {
                return Ok(x as u64);
            }
        }
        let largest = self.points.iter().copied().fold(0.0, f64::max);
        Err(out_of_reach(min, largest as u64))
    }
}

/// Which model format the distribution files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Histogram,
    Kde,
}

impl std::str::FromStr for DistributionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "histogram" | "his" => Ok(DistributionKind::Histogram),
            "kde" => Ok(DistributionKind::Kde),
            other => Err(format!("unknown distribution type '{}'", other)),
        }
    }
}

/// Files describing the three distributions.
#[derive(Debug, Clone)]
pub struct DistributionFiles {
    pub count: PathBuf,
    pub html: PathBuf,
    pub objects: PathBuf,
}

fn load(kind: DistributionKind, path: &Path) -> Result<Box<dyn ScalarDistribution>> {
    Ok(match kind {
        DistributionKind::Histogram => Box::new(Histogram::from_file(path)?),
        DistributionKind::Kde => Box::new(Kde::from_file(path)?),
    })
}

/// Samples whole target profiles.
pub struct DistributionSampler {
    count: Box<dyn ScalarDistribution>,
    html: Box<dyn ScalarDistribution>,
    objects: Box<dyn ScalarDistribution>,
    rng: StdRng,
}

impl DistributionSampler {
    pub fn new(
        count: Box<dyn ScalarDistribution>,
        html: Box<dyn ScalarDistribution>,
        objects: Box<dyn ScalarDistribution>,
        source: RandomSource,
    ) -> Self {
        Self {
            count,
            html,
            objects,
            rng: source.rng(u64::MAX - 1),
        }
    }

    pub fn from_files(
        kind: DistributionKind,
        files: &DistributionFiles,
        source: RandomSource,
    ) -> Result<Self> {
        Ok(Self::new(
            load(kind, &files.count)?,
            load(kind, &files.html)?,
            load(kind, &files.objects)?,
            source,
        ))
    }
}

impl TargetStrategy for DistributionSampler {
    fn name(&self) -> &'static str {
        "distribution"
    }

    fn propose(&mut self, request: &TargetRequest) -> Result<TargetProfile> {
        let count = self
            .count
            .sample_at_least(request.min_object_count as u64, &mut self.rng)?;
        let html_size = self
            .html
            .sample_at_least(request.min_html_size, &mut self.rng)?;
        let object_sizes =
            self.objects
                .sample_many(count as usize, request.min_object_size, &mut self.rng)?;
        Ok(TargetProfile {
            html_size,
            object_sizes,
        })
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::Resample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(text: &str) -> Histogram {
        Histogram::parse(text, Path::new("h.his")).unwrap()
    }

    #[test]
    fn histogram_must_be_normalised() {
        let err = Histogram::parse("1 0.25\n2 0.25\n", Path::new("h.his")).unwrap_err();
        assert!(matches!(err, MorphError::CorruptDistribution { .. }));
        assert!(Histogram::parse("1 0.5\n2 0.5000000001\n", Path::new("h.his")).is_ok());
    }

    #[test]
    fn histogram_rejects_bad_records() {
        for text in ["1\n", "1 0.5 3\n", "x 1.0\n", "-1 1.0\n", "1 -0.5\n2 1.5\n"] {
            assert!(Histogram::parse(text, Path::new("h.his")).is_err(), "{text:?}");
        }
    }

    #[test]
    fn histogram_sampling_respects_minimum() {
        let h = hist("10 0.7\n20 0.2\n30 0.1\n");
        let mut rng = RandomSource::Seeded(5).rng(0);
        for _ in 0..200 {
            assert!(h.sample_at_least(15, &mut rng).unwrap() >= 15);
        }
        assert_eq!(h.sample_at_least(30, &mut rng).unwrap(), 30);
    }

    #[test]
    fn histogram_below_minimum_is_infeasible() {
        let h = hist("10 1.0\n");
        let err = h.sample_at_least(11, &mut RandomSource::Seeded(1).rng(0)).unwrap_err();
        assert!(err.is_infeasible());
    }

    #[test]
    fn kde_parses_header_and_weights() {
        let k = Kde::parse("bandwidth 2.5\n100 1\n200 3\n300\n", Path::new("k.kde")).unwrap();
        assert_eq!(k.points, vec![100.0, 200.0, 300.0]);
        assert_eq!(k.weights, vec![1.0, 3.0, 1.0]);
        assert_eq!(k.bandwidth, 2.5);
        assert!(Kde::parse("bandwidth 1\n", Path::new("k.kde")).is_err());
        assert!(Kde::parse("bandwidth 0\n5\n", Path::new("k.kde")).is_err());
    }

    #[test]
    fn kde_samples_near_points_and_above_minimum() {
        let k = Kde::parse("bandwidth 1\n1000\n", Path::new("k.kde")).unwrap();
        let mut rng = RandomSource::Seeded(11).rng(0);
        for _ in 0..100 {
            let v = k.sample_at_least(990, &mut rng).unwrap();
            assert!((990..1020).contains(&v));
        }
        let err = k.sample_at_least(5000, &mut rng).unwrap_err();
        assert!(err.is_infeasible());
    }

    #[test]
    fn sampler_meets_every_bound() {
        let mut sampler = DistributionSampler::new(
            Box::new(hist("1 0.5\n3 0.5\n")),
            Box::new(hist("500 0.5\n5000 0.5\n")),
            Box::new(hist("10 0.5\n100 0.5\n")),
            RandomSource::Seeded(3),
        );
        let request = TargetRequest {
            min_object_count: 2,
            min_html_size: 600,
            min_object_size: 50,
            original_sizes: vec![50, 60],
        };
        for _ in 0..20 {
            let p = sampler.propose(&request).unwrap();
            assert_eq!(p.html_size, 5000);
            assert_eq!(p.object_sizes, vec![100, 100, 100]);
        }
    }

    #[test]
    fn distribution_kind_from_str() {
        assert_eq!("KDE".parse::<DistributionKind>(), Ok(DistributionKind::Kde));
        assert_eq!("histogram".parse::<DistributionKind>(), Ok(DistributionKind::Histogram));
        assert!("gmm".parse::<DistributionKind>().is_err());
    }
}
