use std::fmt::{Display, Formatter};

use crate::error::VersionRangeError;
use crate::version::ComparableVersion;

/// One interval of a version range, e.g. `[1.0,2.0)`. A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub lower_bound: Option<ComparableVersion>,
    pub lower_inclusive: bool,
    pub upper_bound: Option<ComparableVersion>,
    pub upper_inclusive: bool,
}

impl Restriction {
    pub fn everything() -> Restriction {
        Restriction {
            lower_bound: None,
            lower_inclusive: false,
            upper_bound: None,
            upper_inclusive: false,
        }
    }

    pub fn contains(&self, version: &ComparableVersion) -> bool {
        if let Some(lower) = &self.lower_bound {
            match lower.cmp(version) {
                std::cmp::Ordering::Greater => return false,
                std::cmp::Ordering::Equal if !self.lower_inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper_bound {
            match upper.cmp(version) {
                std::cmp::Ordering::Less => return false,
                std::cmp::Ordering::Equal if !self.upper_inclusive => return false,
                _ => {}
            }
        }
        true
    }

    fn parse(spec: &str) -> Result<Restriction, VersionRangeError> {
        let lower_inclusive = spec.starts_with('[');
        let upper_inclusive = spec.ends_with(']');

        let inner = spec[1..spec.len() - 1].trim();

        match inner.find(',') {
            None => {
                if !lower_inclusive || !upper_inclusive {
                    return Err(VersionRangeError::SingleVersion(spec.to_string()));
                }
                let version = ComparableVersion::new(inner);
                Ok(Restriction {
                    lower_bound: Some(version.clone()),
                    lower_inclusive: true,
                    upper_bound: Some(version),
                    upper_inclusive: true,
                })
            }
            Some(comma) => {
                let lower = inner[..comma].trim();
                let upper = inner[comma + 1..].trim();
                if lower == upper {
                    return Err(VersionRangeError::IdenticalBoundaries(spec.to_string()));
                }

                let lower_bound = (!lower.is_empty()).then(|| ComparableVersion::new(lower));
                let upper_bound = (!upper.is_empty()).then(|| ComparableVersion::new(upper));

                if let (Some(l), Some(u)) = (&lower_bound, &upper_bound) {
                    if u < l {
                        return Err(VersionRangeError::DefiesOrdering(spec.to_string()));
                    }
                }

                Ok(Restriction {
                    lower_bound,
                    lower_inclusive,
                    upper_bound,
                    upper_inclusive,
                })
            }
        }
    }
}

/// A version requirement: either a plain ("soft") version like `1.0`, or a set of bracketed
///  restrictions like `[1.0,2.0)` or `[1.0,1.2),(1.2,)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    spec: String,
    recommended: Option<ComparableVersion>,
    restrictions: Vec<Restriction>,
}

impl VersionRange {
    pub fn parse(spec: &str) -> Result<VersionRange, VersionRangeError> {
        let mut restrictions = Vec::new();
        let mut process = spec.trim();
        let mut previous_upper: Option<ComparableVersion> = None;

        while process.starts_with('[') || process.starts_with('(') {
            let close_paren = process.find(')');
            let close_bracket = process.find(']');
            let end = match (close_paren, close_bracket) {
                (Some(p), Some(b)) => p.min(b),
                (Some(p), None) => p,
                (None, Some(b)) => b,
                (None, None) => return Err(VersionRangeError::Unbounded(spec.to_string())),
            };

            let restriction = Restriction::parse(&process[..=end])?;
            if let Some(upper) = &previous_upper {
                match &restriction.lower_bound {
                    Some(lower) if lower >= upper => {}
                    _ => return Err(VersionRangeError::Overlap(spec.to_string())),
                }
            }
            previous_upper = restriction.upper_bound.clone();
            restrictions.push(restriction);

            process = process[end + 1..].trim();
            if let Some(rest) = process.strip_prefix(',') {
                process = rest.trim();
            }
        }

        let mut recommended = None;
        if !process.is_empty() {
            if !restrictions.is_empty() {
                return Err(VersionRangeError::MixedSet(spec.to_string()));
            }
            recommended = Some(ComparableVersion::new(process));
            restrictions.push(Restriction::everything());
        }

        Ok(VersionRange {
            spec: spec.to_string(),
            recommended,
            restrictions,
        })
    }

    /// true if the requirement uses bracket syntax rather than naming a single version
    pub fn is_range(&self) -> bool {
        self.recommended.is_none()
    }

    pub fn recommended_version(&self) -> Option<&ComparableVersion> {
        self.recommended.as_ref()
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    /// A range is only deterministic if every one of its restrictions is bounded above.
    pub fn has_upper_bound(&self) -> bool {
        !self.restrictions.is_empty() && self.restrictions.iter().all(|r| r.upper_bound.is_some())
    }

    pub fn contains_version(&self, version: &ComparableVersion) -> bool {
        self.restrictions.iter().any(|r| r.contains(version))
    }

    /// The highest of `versions` that lies inside this range.
    pub fn match_highest<'a>(&self, versions: impl IntoIterator<Item = &'a str>) -> Option<String> {
        versions
            .into_iter()
            .map(ComparableVersion::new)
            .filter(|v| self.contains_version(v))
            .max()
            .map(|v| v.to_string())
    }
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.spec)
    }
}
