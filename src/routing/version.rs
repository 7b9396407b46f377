//! API version prefixing.
//!
//! Every route is registered under a version segment followed by its
//! namespace prefix: `/v1.40/libpod/images/json`. The prefix is fixed for
//! the lifetime of one route table.

use crate::config::ApiConfig;
use crate::routing::compat::Namespace;

/// Computes versioned route patterns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PathVersioner {
    /// Accept any `v<major>.<minor>` segment and bind it as `version`.
    #[default]
    Negotiated,
    /// Only accept one literal version, e.g. `1.40` yields `/v1.40`.
    Fixed(String),
}

impl PathVersioner {
    /// Pin routes to one version. A leading `v` is accepted and dropped.
    pub fn fixed(version: impl Into<String>) -> Self {
        let version = version.into();
        match version.strip_prefix('v') {
            Some(stripped) => Self::Fixed(stripped.to_string()),
            None => Self::Fixed(version),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        match &config.version {
            Some(version) => Self::fixed(version.as_str()),
            None => Self::Negotiated,
        }
    }

    /// The configured version, if pinned.
    pub fn pinned_version(&self) -> Option<&str> {
        match self {
            Self::Fixed(v) => Some(v),
            Self::Negotiated => None,
        }
    }

    /// Versioned route pattern for `resource_path` (which begins with `/`).
    pub fn versioned_path(&self, namespace: Namespace, resource_path: &str) -> String {
        let version = match self {
            Self::Negotiated => "/v{version}".to_string(),
            Self::Fixed(v) => format!("/v{v}"),
        };
        format!("{version}{}{resource_path}", namespace.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiated_paths() {
        let v = PathVersioner::Negotiated;
        assert_eq!(
            v.versioned_path(Namespace::Compat, "/images/json"),
            "/v{version}/images/json"
        );
        assert_eq!(
            v.versioned_path(Namespace::Native, "/images/{name}/tree"),
            "/v{version}/libpod/images/{name}/tree"
        );
    }

    #[test]
    fn test_fixed_paths_are_deterministic() {
        let v = PathVersioner::fixed("v1.40");
        let first = v.versioned_path(Namespace::Native, "/images/json");
        let second = v.versioned_path(Namespace::Native, "/images/json");
        assert_eq!(first, "/v1.40/libpod/images/json");
        assert_eq!(first, second);
        assert_eq!(v.pinned_version(), Some("1.40"));
    }

    #[test]
    fn test_from_config() {
        let mut config = ApiConfig::default();
        assert_eq!(PathVersioner::from_config(&config), PathVersioner::Negotiated);

        config.version = Some("1.41".into());
        assert_eq!(
            PathVersioner::from_config(&config),
            PathVersioner::Fixed("1.41".into())
        );
    }
}
