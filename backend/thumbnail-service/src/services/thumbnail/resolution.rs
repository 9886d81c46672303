//! Thumbnail resolutions
//!
//! The set of sizes thumbnails may be generated at is fixed at startup.
//! Requests are snapped to one member of that set so that the number of
//! distinct cached artifacts per source stays bounded.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Returned by [`Resolutions::closest_match`] when no candidates exist.
/// Unreachable through [`Resolutions::new`], which rejects an empty set.
pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 32,
    height: 32,
};

/// A target thumbnail size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True when this resolution is at least as large as the request in both dimensions
    fn dominates(&self, width: u32, height: u32) -> bool {
        self.width >= width && self.height >= height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ConfigError;

    /// Parses a `WIDTHxHEIGHT` token, e.g. `128x128`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidResolution(s.to_string());

        let (w, h) = s.trim().split_once(|c: char| c == 'x' || c == 'X').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self { width, height })
    }
}

/// Ordered set of candidate resolutions
#[derive(Debug, Clone)]
pub struct Resolutions {
    candidates: Vec<Resolution>,
}

impl Resolutions {
    /// Build from an ordered candidate list. The order is significant: it breaks ties.
    pub fn new(candidates: Vec<Resolution>) -> Result<Self, ConfigError> {
        if candidates.is_empty() {
            return Err(ConfigError::NoResolutions);
        }
        Ok(Self { candidates })
    }

    /// Parse a list of `WIDTHxHEIGHT` tokens
    pub fn parse<I, S>(tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates = tokens
            .into_iter()
            .filter(|t| !t.as_ref().trim().is_empty())
            .map(|t| t.as_ref().parse())
            .collect::<Result<Vec<Resolution>, _>>()?;

        Self::new(candidates)
    }

    pub fn as_slice(&self) -> &[Resolution] {
        &self.candidates
    }

    /// Pick the candidate to serve a `width` x `height` request.
    ///
    /// The smallest (by area) candidate covering the request in both
    /// dimensions wins. When nothing covers it, the largest candidate is used.
    /// Equal areas go to the candidate listed first.
    pub fn closest_match(&self, width: u32, height: u32) -> Resolution {
        let mut smallest_cover: Option<Resolution> = None;
        let mut largest: Option<Resolution> = None;

        for candidate in &self.candidates {
            if candidate.dominates(width, height)
                && smallest_cover.map_or(true, |best| candidate.area() < best.area())
            {
                smallest_cover = Some(*candidate);
            }
            if largest.map_or(true, |best| candidate.area() > best.area()) {
                largest = Some(*candidate);
            }
        }

        smallest_cover.or(largest).unwrap_or(DEFAULT_RESOLUTION)
    }
}
