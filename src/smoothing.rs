// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Smoothing strategies.
//!
//! A strategy reduces a per-minute window of setpoints to one value. The
//! set of strategies is closed: [`SmoothingKind`] names each one and maps it
//! to its [`SmoothingStrategy`] implementation.

use crate::error::{Result, SetpointError};
use crate::resolver::MINUTES_PER_DAY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Standard deviation of the Gaussian kernel, in samples (minutes).
pub const GAUSSIAN_SIGMA: f64 = 5.0;

// ---------------------------------------------------------------------------
// Offset policy
// ---------------------------------------------------------------------------

/// Where the query instant sits in the sample window, and which sample is the
/// canonical output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// Window centered on the instant; canonical index `len / 2`.
    #[default]
    #[serde(alias = "center")]
    Centered,
    /// Window ends at the instant; canonical index `0`.
    Start,
    /// Window starts at the instant; canonical index `len - 1`.
    End,
}

impl OffsetPolicy {
    /// Index of the canonical sample in a window of `len` samples.
    pub fn canonical_index(&self, len: usize) -> usize {
        match self {
            OffsetPolicy::Centered => len / 2,
            OffsetPolicy::Start => 0,
            OffsetPolicy::End => len.saturating_sub(1),
        }
    }

    /// Minute offsets (relative to the instant) sampled for a window.
    ///
    /// Every policy yields exactly `window_minutes` offsets.
    pub fn offsets(&self, window_minutes: u32) -> RangeInclusive<i64> {
        let w = window_minutes as i64;
        match self {
            OffsetPolicy::Centered => -(w / 2)..=w / 2,
            OffsetPolicy::Start => -(w - 1)..=0,
            OffsetPolicy::End => 0..=w - 1,
        }
    }
}

impl FromStr for OffsetPolicy {
    type Err = SetpointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "centered" | "center" => Ok(OffsetPolicy::Centered),
            "start" => Ok(OffsetPolicy::Start),
            "end" => Ok(OffsetPolicy::End),
            _ => Err(SetpointError::UnknownOffsetPolicy(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Reduces a window of samples to a single setpoint.
///
/// Windows are never empty when produced by the orchestrator; reducing an
/// empty slice yields NaN.
pub trait SmoothingStrategy: Send + Sync {
    fn reduce(&self, samples: &[f64], offset: OffsetPolicy) -> f64;
}

/// The sample at the canonical index, unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Identity;

impl SmoothingStrategy for Identity {
    fn reduce(&self, samples: &[f64], offset: OffsetPolicy) -> f64 {
        samples
            .get(offset.canonical_index(samples.len()))
            .copied()
            .unwrap_or(f64::NAN)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Mean;

impl SmoothingStrategy for Mean {
    fn reduce(&self, samples: &[f64], _offset: OffsetPolicy) -> f64 {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Median;

impl SmoothingStrategy for Median {
    fn reduce(&self, samples: &[f64], _offset: OffsetPolicy) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }
}

/// Gaussian-weighted average around the canonical index.
///
/// The kernel is as long as the window, normalized, with sigma
/// [`GAUSSIAN_SIGMA`], and applied as a centered "same"-length convolution.
/// Near the window edges only the overlapping part of the kernel is used and
/// re-normalized, so the result never leaves the range of the samples.
/// Results are rounded to two decimals.
#[derive(Debug, Clone, Copy)]
pub struct GaussianConvolution;

impl GaussianConvolution {
    fn kernel(len: usize) -> Vec<f64> {
        let center = (len as f64 - 1.0) / 2.0;
        let mut kernel: Vec<f64> = (0..len)
            .map(|j| {
                let z = (j as f64 - center) / GAUSSIAN_SIGMA;
                (-0.5 * z * z).exp()
            })
            .collect();
        let total: f64 = kernel.iter().sum();
        kernel.iter_mut().for_each(|k| *k /= total);
        kernel
    }
}

impl SmoothingStrategy for GaussianConvolution {
    fn reduce(&self, samples: &[f64], offset: OffsetPolicy) -> f64 {
        let n = samples.len();
        if n == 0 {
            return f64::NAN;
        }
        let kernel = Self::kernel(n);
        let shift = (n - 1) / 2;
        let i = offset.canonical_index(n);

        let (mut acc, mut weight) = (0.0, 0.0);
        for (k, sample) in samples.iter().enumerate() {
            // Kernel tap aligned with sample k for output i.
            let Some(tap) = (i + shift).checked_sub(k) else {
                continue;
            };
            if let Some(g) = kernel.get(tap) {
                acc += sample * g;
                weight += g;
            }
        }

        ((acc / weight) * 100.0).round() / 100.0
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Identifier of a smoothing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingKind {
    #[serde(alias = "none")]
    Identity,
    Mean,
    Median,
    #[serde(rename = "gaussian", alias = "gauss")]
    GaussianConvolution,
}

impl SmoothingKind {
    pub fn strategy(&self) -> &'static dyn SmoothingStrategy {
        match self {
            SmoothingKind::Identity => &Identity,
            SmoothingKind::Mean => &Mean,
            SmoothingKind::Median => &Median,
            SmoothingKind::GaussianConvolution => &GaussianConvolution,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SmoothingKind::Identity => "identity",
            SmoothingKind::Mean => "mean",
            SmoothingKind::Median => "median",
            SmoothingKind::GaussianConvolution => "gaussian",
        }
    }
}

impl fmt::Display for SmoothingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SmoothingKind {
    type Err = SetpointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "none" => Ok(SmoothingKind::Identity),
            "mean" => Ok(SmoothingKind::Mean),
            "median" => Ok(SmoothingKind::Median),
            "gaussian" | "gauss" => Ok(SmoothingKind::GaussianConvolution),
            _ => Err(SetpointError::UnknownSmoothing(s.to_string())),
        }
    }
}

/// Window smoothing parameters: strategy, odd window length, offset policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSmoothing {
    pub strategy: SmoothingKind,
    pub window_minutes: u32,
    #[serde(default)]
    pub offset: OffsetPolicy,
}

impl WindowSmoothing {
    pub fn new(strategy: SmoothingKind, window_minutes: u32, offset: OffsetPolicy) -> Result<Self> {
        let smoothing = Self {
            strategy,
            window_minutes,
            offset,
        };
        smoothing.validate()?;
        Ok(smoothing)
    }

    /// Windows must be odd and shorter than a day.
    pub fn validate(&self) -> Result<()> {
        if self.window_minutes % 2 == 0 {
            return Err(SetpointError::EvenWindowSize(self.window_minutes));
        }
        if self.window_minutes >= MINUTES_PER_DAY {
            return Err(SetpointError::WindowTooLong(self.window_minutes));
        }
        Ok(())
    }

    pub fn reduce(&self, samples: &[f64]) -> f64 {
        self.strategy.strategy().reduce(samples, self.offset)
    }
}
