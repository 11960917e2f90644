//! Features linked into a schema through `@core(feature:)` or `@link(url:)` applications on the
//! schema definition.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use apollo_compiler::InvalidNameError;
use apollo_compiler::Name;
use thiserror::Error;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::link::spec::Identity;
use crate::link::spec::Url;
use crate::schema::FederationSchema;
use crate::schema::definitions::AppliedDirective;

pub(crate) mod argument;
pub(crate) mod join_spec_definition;
pub mod spec;
pub(crate) mod spec_definition;

#[derive(Error, Debug, PartialEq)]
pub enum LinkError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
    #[error("Invalid use of @link in schema: {0}")]
    BootstrapError(String),
}

impl From<LinkError> for FederationError {
    fn from(value: LinkError) -> Self {
        SingleFederationError::InvalidFederationSupergraph {
            message: value.to_string(),
        }
        .into()
    }
}

/// One linked feature: its url and the name it is known by in the schema.
#[derive(Debug, Eq, PartialEq)]
pub struct Link {
    pub url: Url,
    pub spec_alias: Option<Name>,
}

impl Link {
    pub fn spec_name_in_schema(&self) -> &Name {
        self.spec_alias.as_ref().unwrap_or(&self.url.identity.name)
    }

    pub fn directive_name_in_schema(&self, name: &Name) -> Name {
        // Directives are qualified by the feature name, except for the directive whose name is the
        // feature name itself (`@core`, `@link`).
        if name == self.url.identity.name.as_str() {
            self.spec_name_in_schema().clone()
        } else {
            // Both sides are `Name`s and we just add valid characters in between.
            Name::new_unchecked(&format!("{}__{}", self.spec_name_in_schema(), name))
        }
    }

    pub fn type_name_in_schema(&self, name: &Name) -> Name {
        // Both sides are `Name`s and we just add valid characters in between.
        Name::new_unchecked(&format!("{}__{}", self.spec_name_in_schema(), name))
    }

    pub fn from_directive_application(directive: &AppliedDirective) -> Result<Link, LinkError> {
        let (url, is_link) = if let Some(value) = directive.argument("url") {
            (value, true)
        } else if let Some(value) = directive.argument("feature") {
            (value, false)
        } else {
            return Err(LinkError::BootstrapError(
                "the `url` argument for @link is mandatory".to_string(),
            ));
        };

        let (directive_name, arg_name) = if is_link {
            ("link", "url")
        } else {
            ("core", "feature")
        };

        let url = url.as_str().ok_or_else(|| {
            LinkError::BootstrapError(format!(
                "the `{arg_name}` argument for @{directive_name} must be a String"
            ))
        })?;
        let url: Url = url.parse::<Url>().map_err(|e| {
            LinkError::BootstrapError(format!("invalid `{arg_name}` argument (reason: {e})"))
        })?;

        let spec_alias = directive
            .argument("as")
            .and_then(|arg| arg.as_str())
            .map(Name::new)
            .transpose()?;

        Ok(Link { url, spec_alias })
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = self
            .spec_alias
            .as_ref()
            .map(|a| format!(r#", as: "{a}""#))
            .unwrap_or_default();
        write!(f, r#"@link(url: "{}"{alias})"#, self.url)
    }
}

#[derive(Default, Eq, PartialEq, Debug)]
pub struct LinksMetadata {
    pub(crate) links: Vec<Arc<Link>>,
    pub(crate) by_identity: HashMap<Identity, Arc<Link>>,
    pub(crate) by_name_in_schema: HashMap<Name, Arc<Link>>,
}

impl LinksMetadata {
    pub fn all_links(&self) -> &[Arc<Link>] {
        self.links.as_ref()
    }

    pub fn for_identity(&self, identity: &Identity) -> Option<Arc<Link>> {
        self.by_identity.get(identity).cloned()
    }

    /// The feature a type belongs to. Feature types are always qualified by the feature name.
    pub fn source_link_of_type(&self, type_name: &Name) -> Option<Arc<Link>> {
        type_name
            .split_once("__")
            .and_then(|(spec_name, _)| self.by_name_in_schema.get(spec_name))
            .cloned()
    }

    /// The feature a directive belongs to: either it is named like the feature, or it is
    /// qualified by the feature name.
    pub fn source_link_of_directive(&self, directive_name: &Name) -> Option<Arc<Link>> {
        if let Some(link) = self.by_name_in_schema.get(directive_name) {
            return Some(Arc::clone(link));
        }
        directive_name
            .split_once("__")
            .and_then(|(spec_name, _)| self.by_name_in_schema.get(spec_name))
            .cloned()
    }
}

/// Collects the features linked into `schema`, or `None` if the schema does not link the `core`
/// or `link` feature itself.
pub fn links_metadata(schema: &FederationSchema) -> Result<Option<LinksMetadata>, FederationError> {
    let applications = &schema.schema_definition().directives;
    // The bootstrapping application links the core/link feature under the directive's own name.
    let bootstrap = applications.iter().find_map(|application| {
        let link = Link::from_directive_application(application).ok()?;
        let is_bootstrap = (link.url.identity == Identity::core_identity()
            || link.url.identity == Identity::link_identity())
            && application.name() == link.spec_name_in_schema();
        is_bootstrap.then(|| application.name().clone())
    });
    let Some(link_directive_name) = bootstrap else {
        return Ok(None);
    };

    let mut metadata = LinksMetadata::default();
    for application in applications
        .iter()
        .filter(|application| *application.name() == link_directive_name)
    {
        let link = Arc::new(Link::from_directive_application(application)?);
        if metadata
            .by_identity
            .insert(link.url.identity.clone(), Arc::clone(&link))
            .is_some()
        {
            return Err(LinkError::BootstrapError(format!(
                "duplicate inclusion of feature \"{}\"",
                link.url.identity
            ))
            .into());
        }
        let name_in_schema = link.spec_name_in_schema().clone();
        if let Some(other) = metadata
            .by_name_in_schema
            .insert(name_in_schema.clone(), Arc::clone(&link))
        {
            return Err(LinkError::BootstrapError(format!(
                "name conflict: {} and {} are imported under the same name \"{name_in_schema}\"",
                other.url, link.url
            ))
            .into());
        }
        metadata.links.push(link);
    }
    Ok(Some(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;

    const CORE_DEFINITIONS: &str = r#"
    directive @core(feature: String!, as: String) repeatable on SCHEMA

    type Query {
      hello: String
    }
    "#;

    fn metadata(schema_block: &str) -> Result<Option<LinksMetadata>, FederationError> {
        let schema =
            FederationSchema::parse(&format!("{schema_block}\n{CORE_DEFINITIONS}"), GRAPHQL_BUILT_INS)
                .unwrap();
        links_metadata(&schema)
    }

    #[test]
    fn collects_linked_features() {
        let metadata = metadata(
            r#"
            schema
              @core(feature: "https://specs.apollo.dev/core/v0.2")
              @core(feature: "https://specs.apollo.dev/join/v0.1", as: "myjoin")
            {
              query: Query
            }
            "#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(metadata.all_links().len(), 2);
        let Some(join) = metadata.for_identity(&Identity::join_identity()) else {
            panic!("join feature should be linked");
        };
        assert_eq!(join.spec_name_in_schema().as_str(), "myjoin");
        assert_eq!(
            join.directive_name_in_schema(&apollo_compiler::name!("type"))
                .as_str(),
            "myjoin__type"
        );
        assert_eq!(
            metadata
                .source_link_of_type(&apollo_compiler::name!("myjoin__Graph"))
                .map(|link| link.url.to_string()),
            Some("https://specs.apollo.dev/join/v0.1".to_owned())
        );
        assert_eq!(
            metadata
                .source_link_of_directive(&apollo_compiler::name!("core"))
                .map(|link| link.url.identity.clone()),
            Some(Identity::core_identity())
        );
        assert!(
            metadata
                .source_link_of_type(&apollo_compiler::name!("join__Graph"))
                .is_none()
        );
    }

    #[test]
    fn schemas_without_core_have_no_links() {
        assert!(metadata("").unwrap().is_none());
    }

    #[test]
    fn rejects_duplicate_features() {
        let error = metadata(
            r#"
            schema
              @core(feature: "https://specs.apollo.dev/core/v0.2")
              @core(feature: "https://specs.apollo.dev/join/v0.1")
              @core(feature: "https://specs.apollo.dev/join/v0.2")
            {
              query: Query
            }
            "#,
        )
        .unwrap_err();
        insta::assert_snapshot!(
            error,
            @r###"Invalid use of @link in schema: duplicate inclusion of feature "https://specs.apollo.dev/join""###
        );
    }
}
