//! Representation of `@core`/`@link` feature specifications.
use std::fmt;
use std::str;

use apollo_compiler::Name;
use apollo_compiler::name;
use thiserror::Error;

use crate::error::FederationError;
use crate::error::SingleFederationError;

pub const APOLLO_SPEC_DOMAIN: &str = "https://specs.apollo.dev";

#[derive(Error, Debug, PartialEq)]
pub enum SpecError {
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<SpecError> for FederationError {
    fn from(value: SpecError) -> Self {
        SingleFederationError::InvalidFederationSupergraph {
            message: value.to_string(),
        }
        .into()
    }
}

/// What a feature url designates regardless of its version, for instance
/// `https://specs.apollo.dev/join`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Identity {
    /// Everything before the feature name, scheme included.
    pub domain: String,
    /// The feature name, which is also the default prefix of its directives and types.
    pub name: Name,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

impl Identity {
    fn apollo(name: Name) -> Identity {
        Identity {
            domain: APOLLO_SPEC_DOMAIN.to_string(),
            name,
        }
    }

    pub fn core_identity() -> Identity {
        Self::apollo(name!("core"))
    }

    pub fn link_identity() -> Identity {
        Self::apollo(name!("link"))
    }

    pub fn join_identity() -> Identity {
        Self::apollo(name!("join"))
    }
}

/// A `major.minor` feature version. Urls spell it with a `v` prefix.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl str::FromStr for Version {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').ok_or(SpecError::ParseError(
            "version number is missing a dot (.)".to_string(),
        ))?;
        let parse_number = |number: &str, part: &str| {
            number.parse::<u32>().map_err(|_| {
                SpecError::ParseError(format!("invalid {part} version number '{number}'"))
            })
        };
        Ok(Version {
            major: parse_number(major, "major")?,
            minor: parse_number(minor, "minor")?,
        })
    }
}

/// A versioned feature url, like `https://specs.apollo.dev/join/v0.2`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Url {
    pub identity: Identity,
    pub version: Version,
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/v{}", self.identity, self.version)
    }
}

impl str::FromStr for Url {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = url::Url::parse(s)
            .map_err(|e| SpecError::ParseError(format!("invalid specification url: {e}")))?;
        let mut segments = url.path_segments().ok_or(SpecError::ParseError(
            "invalid specification url".to_string(),
        ))?;
        let version = segments.next_back().ok_or(SpecError::ParseError(
            "invalid specification url: missing specification version".to_string(),
        ))?;
        let Some(version) = version.strip_prefix('v') else {
            return Err(SpecError::ParseError(
                "invalid specification url: the last element of the path should be the version starting with a 'v'"
                    .to_string(),
            ));
        };
        let version = version.parse::<Version>()?;
        let name = segments.next_back().ok_or(SpecError::ParseError(
            "invalid specification url: missing specification name".to_string(),
        ))?;
        // Feature names are only used as directive and type prefixes, which must be valid names.
        let name = Name::new(name).map_err(|_| {
            SpecError::ParseError(format!(
                "invalid specification url: \"{name}\" is not a valid feature name"
            ))
        })?;
        let scheme = url.scheme();
        if !scheme.starts_with("http") {
            return Err(SpecError::ParseError(
                "invalid specification url: only http(s) urls are supported currently".to_string(),
            ));
        }
        let url_domain = url.domain().ok_or(SpecError::ParseError(
            "invalid specification url".to_string(),
        ))?;
        let path_remainder = segments.collect::<Vec<&str>>();
        let domain = if path_remainder.is_empty() {
            format!("{scheme}://{url_domain}")
        } else {
            format!("{scheme}://{url_domain}/{}", path_remainder.join("/"))
        };
        Ok(Url {
            identity: Identity { domain, name },
            version,
        })
    }
}
