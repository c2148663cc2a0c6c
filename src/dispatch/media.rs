//! Media range parsing and matching
//!
//! Parses `Accept`/`Content-Type` values and scores how well a registered
//! media type satisfies a set of accepted ranges:
//! - concrete type match adds 100, concrete subtype match adds 10
//! - every equal parameter (other than `q`) adds 1
//! - the best-fitting range decides the quality

use std::fmt;
use std::str::FromStr;

/// Quality value in thousandths, `0..=1000`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u16);

impl Quality {
    pub const MAX: Self = Self(1000);
    pub const ZERO: Self = Self(0);

    /// Parse a `q` parameter. Malformed values count as `1`.
    pub fn parse(text: &str) -> Self {
        let Ok(value) = text.trim().parse::<f32>() else {
            return Self::MAX;
        };
        if !value.is_finite() {
            return Self::MAX;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let thousandths = (value.clamp(0.0, 1.0) * 1000.0).round() as u16;
        Self(thousandths)
    }

    pub const fn thousandths(self) -> u16 {
        self.0
    }
}

/// One `type/subtype; params` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRange {
    kind: String,
    subtype: String,
    params: Vec<(String, String)>,
    quality: Quality,
}

/// Error for values that are not `type/subtype`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid media range '{0}'")]
pub struct InvalidMediaRange(pub String);

impl MediaRange {
    /// `*/*`
    pub fn any() -> Self {
        Self {
            kind: "*".to_string(),
            subtype: "*".to_string(),
            params: Vec::new(),
            quality: Quality::MAX,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub const fn quality(&self) -> Quality {
        self.quality
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v.as_str()))
    }

    /// `type/subtype` without parameters
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    /// Wildcard-aware match of type and subtype, either side may be `*`
    pub fn matches(&self, other: &Self) -> bool {
        let kind_ok = self.kind == other.kind || self.kind == "*" || other.kind == "*";
        let subtype_ok =
            self.subtype == other.subtype || self.subtype == "*" || other.subtype == "*";
        kind_ok && subtype_ok
    }

    fn fitness_against(&self, range: &Self) -> u32 {
        let mut fitness = 0;
        if self.kind == range.kind && self.kind != "*" {
            fitness += 100;
        }
        if self.subtype == range.subtype && self.subtype != "*" {
            fitness += 10;
        }
        for (key, value) in &range.params {
            if self.param(key) == Some(value.as_str()) {
                fitness += 1;
            }
        }
        fitness
    }
}

impl FromStr for MediaRange {
    type Err = InvalidMediaRange;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMediaRange(text.to_string());
        let mut parts = text.split(';');
        let essence = parts.next().map(str::trim).ok_or_else(invalid)?;
        let (kind, subtype) = essence.split_once('/').ok_or_else(invalid)?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() || (kind == "*" && subtype != "*") {
            return Err(invalid());
        }

        let mut params = Vec::new();
        let mut quality = Quality::MAX;
        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"');
            if key == "q" {
                quality = Quality::parse(value);
            } else {
                params.push((key, value.to_string()));
            }
        }

        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
            quality,
        })
    }
}

impl fmt::Display for MediaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

/// Parse a comma separated `Accept` value, skipping malformed entries
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| entry.parse().ok())
        .collect()
}

/// Score `candidate` against the accepted ranges.
///
/// Returns the fitness and quality of the most specific matching range,
/// or `None` when nothing matches or the best match has quality zero.
pub fn fitness_and_quality(candidate: &MediaRange, accepted: &[MediaRange]) -> Option<(u32, Quality)> {
    let mut best: Option<(u32, Quality)> = None;
    for range in accepted {
        if !candidate.matches(range) {
            continue;
        }
        let fitness = candidate.fitness_against(range);
        let better = match best {
            Some((best_fitness, _)) => fitness > best_fitness,
            None => true,
        };
        if better {
            best = Some((fitness, range.quality));
        }
    }
    best.filter(|(_, q)| *q > Quality::ZERO)
}
