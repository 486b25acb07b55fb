//! Route pattern parsing and path matching.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::RouteConfigError;

static PARAM_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid parameter regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    /// `{name}`: exactly one path segment.
    Param(String),
    /// `{name?}`: one path segment or nothing. Always last.
    Optional(String),
    /// `{*name}`: the remaining path, possibly empty. Always last.
    Wildcard(String),
}

/// A parsed route pattern such as `users/{id}/files/{*path}`.
///
/// Leading and trailing slashes are ignored, so `/users/` and `users` are the
/// same pattern. The empty pattern is the root route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, RouteConfigError> {
        let trimmed = pattern.trim().trim_matches('/');
        let invalid = |reason: &str| RouteConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        if !trimmed.is_empty() {
            let parts: Vec<&str> = trimmed.split('/').collect();
            for (index, part) in parts.iter().enumerate() {
                if part.is_empty() {
                    return Err(invalid("empty segment"));
                }
                let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    Some(inner) => {
                        let last = index + 1 == parts.len();
                        let segment = if let Some(name) = inner.strip_prefix('*') {
                            if !last {
                                return Err(invalid("wildcard must be the last segment"));
                            }
                            Segment::Wildcard(name.to_string())
                        } else if let Some(name) = inner.strip_suffix('?') {
                            if !last {
                                return Err(invalid("optional parameter must be the last segment"));
                            }
                            Segment::Optional(name.to_string())
                        } else {
                            Segment::Param(inner.to_string())
                        };
                        let name = segment.name().unwrap_or_default();
                        if !PARAM_NAME_RE.is_match(name) {
                            return Err(invalid(&format!("invalid parameter name '{}'", name)));
                        }
                        segment
                    }
                    None => {
                        if part.contains('{') || part.contains('}') {
                            return Err(invalid(&format!("malformed segment '{}'", part)));
                        }
                        Segment::Static((*part).to_string())
                    }
                };
                segments.push(segment);
            }
        }

        let names: Vec<&str> = segments.iter().filter_map(Segment::name).collect();
        for (index, name) in names.iter().enumerate() {
            if names[..index].contains(name) {
                return Err(invalid(&format!("duplicate parameter '{}'", name)));
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// Normalized pattern text (no leading or trailing slash).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Pattern with parameter names erased.
    ///
    /// Two patterns with the same shape match the same paths and therefore
    /// cannot be bound to different targets.
    pub fn shape(&self) -> String {
        shape_of(&self.segments)
    }

    pub fn has_optional(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Optional(_)))
    }

    /// Shapes of the plain patterns an optional parameter overlaps: the
    /// pattern without its last segment and the pattern with a required
    /// parameter in its place. Empty when the pattern has no optional
    /// parameter.
    ///
    /// `users/{id?}` overlaps `users` and `users/{id}`.
    pub fn overlapped_shapes(&self) -> Vec<String> {
        let Some((Segment::Optional(name), prefix)) = self.segments.split_last() else {
            return Vec::new();
        };
        let mut required = prefix.to_vec();
        required.push(Segment::Param(name.clone()));
        vec![shape_of(prefix), shape_of(&required)]
    }

    /// Ordering key: higher is more specific. Compared segment by segment,
    /// static text beats a parameter, which beats an optional parameter,
    /// which beats the end of the pattern, which beats a wildcard.
    pub(crate) fn specificity(&self) -> Vec<u8> {
        let mut key: Vec<u8> = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Static(_) => 4,
                Segment::Param(_) => 3,
                Segment::Optional(_) => 2,
                Segment::Wildcard(_) => 0,
            })
            .collect();
        if !matches!(self.segments.last(), Some(Segment::Wildcard(_))) {
            key.push(1);
        }
        key
    }

    /// Match a concrete URL path, returning extracted parameters.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let trimmed = path.trim().trim_matches('/');
        let parts: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let mut params = BTreeMap::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(text) => {
                    if parts.get(index) != Some(&text.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(index).filter(|value| !value.is_empty())?;
                    params.insert(name.clone(), (*value).to_string());
                }
                Segment::Optional(name) => {
                    return match parts.get(index..).unwrap_or(&[]) {
                        [] => Some(params),
                        [value] if !value.is_empty() => {
                            params.insert(name.clone(), (*value).to_string());
                            Some(params)
                        }
                        _ => None,
                    };
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(index..).unwrap_or(&[]).join("/");
                    params.insert(name.clone(), rest);
                    return Some(params);
                }
            }
        }

        if parts.len() == self.segments.len() {
            Some(params)
        } else {
            None
        }
    }
}

impl Segment {
    /// Parameter name, `None` for static text.
    pub fn name(&self) -> Option<&str> {
        match self {
            Segment::Static(_) => None,
            Segment::Param(name) | Segment::Optional(name) | Segment::Wildcard(name) => {
                Some(name.as_str())
            }
        }
    }
}

fn shape_of(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Static(text) => text.as_str(),
            Segment::Param(_) => "{}",
            Segment::Optional(_) => "{?}",
            Segment::Wildcard(_) => "{*}",
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
