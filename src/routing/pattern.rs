//! Path patterns with positional parameters.
//!
//! # Syntax
//! - `/images/json`: literal segments, compared exactly (case-sensitive)
//! - `/images/{name}/json`: `{name}` matches any one non-empty segment
//! - `/v{version}/...`: the API version segment, `v` then a digit then digits or dots
//!
//! Parameter names only label the bound values. A parameter segment accepts
//! every literal in its position, so `/images/{name}` covers `/images/json`.

use crate::routing::error::RouteError;

/// Name under which the version segment value is bound.
pub const VERSION_PARAM: &str = "version";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Version,
}

impl Segment {
    fn parse(raw: &str, pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("empty segment"));
        }
        if raw == "v{version}" {
            return Ok(Segment::Version);
        }
        if let Some(name) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            if name.is_empty() || name.contains(['{', '}']) {
                return Err(invalid("malformed parameter"));
            }
            if name == VERSION_PARAM {
                return Err(invalid("parameter name is reserved"));
            }
            return Ok(Segment::Param(name.to_string()));
        }
        if raw.contains(['{', '}']) {
            return Err(invalid("parameter must span a whole segment"));
        }
        Ok(Segment::Literal(raw.to_string()))
    }

    /// True when every path part `later` accepts is also accepted here.
    fn covers(&self, later: &Segment) -> bool {
        match (self, later) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_) | Segment::Literal(_)) => true,
            (Segment::Version, Segment::Version) => true,
            (Segment::Version, Segment::Literal(lit)) => is_version(lit).is_some(),
            _ => false,
        }
    }
}

fn is_version(raw: &str) -> Option<&str> {
    let version = raw.strip_prefix('v')?;
    let mut chars = version.chars();
    let first = chars.next()?;
    (first.is_ascii_digit() && chars.all(|c| c.is_ascii_digit() || c == '.')).then_some(version)
}

/// A compiled route path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern. It must begin with `/`.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let rest = raw.strip_prefix('/').ok_or_else(|| RouteError::InvalidPattern {
            pattern: raw.to_string(),
            reason: "must begin with '/'",
        })?;

        let segments = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/')
                .map(|s| Segment::parse(s, raw))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut seen = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if seen.contains(&name) {
                    return Err(RouteError::InvalidPattern {
                        pattern: raw.to_string(),
                        reason: "duplicate parameter name",
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a concrete request path, binding parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.push(name, part),
                Segment::Version => params.push(VERSION_PARAM, is_version(part)?),
            }
        }
        Some(params)
    }

    /// True when every path `later` matches is also matched by `self`.
    pub fn covers(&self, later: &PathPattern) -> bool {
        self.segments.len() == later.segments.len()
            && self
                .segments
                .iter()
                .zip(&later.segments)
                .all(|(a, b)| a.covers(b))
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Path parameters bound by a successful match, in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    fn push(&mut self, name: &str, value: &str) {
        self.params.push((name.to_string(), value.to_string()));
    }

    /// Get a parameter value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let p = PathPattern::parse("/images/json").unwrap();
        assert!(p.matches("/images/json").unwrap().is_empty());
        assert!(p.matches("/images/json/").is_none());
        assert!(p.matches("/Images/json").is_none());
        assert!(p.matches("/images").is_none());
    }

    #[test]
    fn test_param_binding() {
        let p = PathPattern::parse("/v{version}/images/{name}/json").unwrap();
        let params = p.matches("/v1.40/images/alpine/json").unwrap();
        assert_eq!(params.get("version"), Some("1.40"));
        assert_eq!(params.get("name"), Some("alpine"));

        assert!(p.matches("/images/alpine/json").is_none());
        assert!(p.matches("/vx/images/alpine/json").is_none());
        assert!(p.matches("/v/images/alpine/json").is_none());
        assert!(p.matches("/v1.40/images//json").is_none());
    }

    #[test]
    fn test_covers_ignores_param_names() {
        let a = PathPattern::parse("/images/{name}").unwrap();
        let b = PathPattern::parse("/images/{id}").unwrap();
        assert!(a.covers(&b));
        assert!(b.covers(&a));
    }

    #[test]
    fn test_param_covers_literal() {
        let param = PathPattern::parse("/images/{name}").unwrap();
        let literal = PathPattern::parse("/images/json").unwrap();
        let other = PathPattern::parse("/images/search").unwrap();
        assert!(param.covers(&literal));
        assert!(!literal.covers(&param));
        assert!(!literal.covers(&other));
        assert!(!param.covers(&PathPattern::parse("/images/{name}/json").unwrap()));
    }

    #[test]
    fn test_version_covers_literal_version() {
        let negotiated = PathPattern::parse("/v{version}/images/json").unwrap();
        let pinned = PathPattern::parse("/v1.40/images/json").unwrap();
        let not_version = PathPattern::parse("/vnext/images/json").unwrap();
        assert!(negotiated.covers(&pinned));
        assert!(!pinned.covers(&negotiated));
        assert!(!negotiated.covers(&not_version));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(PathPattern::parse("images/json").is_err());
        assert!(PathPattern::parse("/images//json").is_err());
        assert!(PathPattern::parse("/images/{}").is_err());
        assert!(PathPattern::parse("/images/x{name}").is_err());
        assert!(PathPattern::parse("/images/{name}/{name}").is_err());
        assert!(PathPattern::parse("/images/{version}").is_err());
    }
}
