use std::sync::LazyLock;

use apollo_compiler::Name;
use apollo_compiler::name;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::link::Link;
use crate::link::argument::directive_optional_boolean_argument;
use crate::link::argument::directive_optional_enum_argument;
use crate::link::argument::directive_optional_string_argument;
use crate::link::argument::directive_required_enum_argument;
use crate::link::argument::directive_required_string_argument;
use crate::link::spec::Identity;
use crate::link::spec::Url;
use crate::link::spec::Version;
use crate::link::spec_definition::SpecDefinition;
use crate::link::spec_definition::SpecDefinitions;
use crate::schema::FederationSchema;
use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::DirectiveDefinition;
use crate::schema::definitions::EnumType;
use crate::schema::definitions::TypeDefinition;

pub(crate) const JOIN_GRAPH_ENUM_NAME_IN_SPEC: Name = name!("Graph");
pub(crate) const JOIN_GRAPH_DIRECTIVE_NAME_IN_SPEC: Name = name!("graph");
pub(crate) const JOIN_TYPE_DIRECTIVE_NAME_IN_SPEC: Name = name!("type");
pub(crate) const JOIN_FIELD_DIRECTIVE_NAME_IN_SPEC: Name = name!("field");
pub(crate) const JOIN_OWNER_DIRECTIVE_NAME_IN_SPEC: Name = name!("owner");
pub(crate) const JOIN_IMPLEMENTS_DIRECTIVE_NAME_IN_SPEC: Name = name!("implements");

pub(crate) const JOIN_NAME_ARGUMENT_NAME: Name = name!("name");
pub(crate) const JOIN_URL_ARGUMENT_NAME: Name = name!("url");
pub(crate) const JOIN_GRAPH_ARGUMENT_NAME: Name = name!("graph");
pub(crate) const JOIN_KEY_ARGUMENT_NAME: Name = name!("key");
pub(crate) const JOIN_EXTENSION_ARGUMENT_NAME: Name = name!("extension");
pub(crate) const JOIN_REQUIRES_ARGUMENT_NAME: Name = name!("requires");
pub(crate) const JOIN_PROVIDES_ARGUMENT_NAME: Name = name!("provides");
pub(crate) const JOIN_INTERFACE_ARGUMENT_NAME: Name = name!("interface");

pub(crate) struct GraphDirectiveArguments<'doc> {
    pub(crate) name: &'doc str,
    pub(crate) url: &'doc str,
}

pub(crate) struct TypeDirectiveArguments<'doc> {
    pub(crate) graph: Name,
    pub(crate) key: Option<&'doc str>,
    pub(crate) extension: bool,
}

pub(crate) struct FieldDirectiveArguments<'doc> {
    pub(crate) graph: Option<Name>,
    pub(crate) requires: Option<&'doc str>,
    pub(crate) provides: Option<&'doc str>,
}

pub(crate) struct OwnerDirectiveArguments {
    pub(crate) graph: Name,
}

pub(crate) struct ImplementsDirectiveArguments<'doc> {
    pub(crate) graph: Name,
    pub(crate) interface: &'doc str,
}

#[derive(Clone)]
pub(crate) struct JoinSpecDefinition {
    url: Url,
}

impl JoinSpecDefinition {
    pub(crate) fn new(version: Version) -> Self {
        Self {
            url: Url {
                identity: Identity::join_identity(),
                version,
            },
        }
    }

    pub(crate) fn graph_enum_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
    ) -> Result<&'schema EnumType, FederationError> {
        match self.type_definition(schema, link, &JOIN_GRAPH_ENUM_NAME_IN_SPEC)? {
            TypeDefinition::Enum(type_) => Ok(type_),
            type_ => Err(SingleFederationError::InvalidFederationSupergraph {
                message: format!(
                    "Unexpectedly found non-enum for join spec's \"{}\" enum definition",
                    type_.name(),
                ),
            }
            .into()),
        }
    }

    pub(crate) fn graph_directive_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
    ) -> Result<&'schema DirectiveDefinition, FederationError> {
        self.directive_definition(schema, link, &JOIN_GRAPH_DIRECTIVE_NAME_IN_SPEC)
    }

    pub(crate) fn graph_directive_arguments<'doc>(
        &self,
        application: &'doc AppliedDirective,
    ) -> Result<GraphDirectiveArguments<'doc>, FederationError> {
        Ok(GraphDirectiveArguments {
            name: directive_required_string_argument(application, &JOIN_NAME_ARGUMENT_NAME)?,
            url: directive_required_string_argument(application, &JOIN_URL_ARGUMENT_NAME)?,
        })
    }

    pub(crate) fn type_directive_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
    ) -> Result<&'schema DirectiveDefinition, FederationError> {
        self.directive_definition(schema, link, &JOIN_TYPE_DIRECTIVE_NAME_IN_SPEC)
    }

    pub(crate) fn type_directive_arguments<'doc>(
        &self,
        application: &'doc AppliedDirective,
    ) -> Result<TypeDirectiveArguments<'doc>, FederationError> {
        Ok(TypeDirectiveArguments {
            graph: directive_required_enum_argument(application, &JOIN_GRAPH_ARGUMENT_NAME)?,
            key: directive_optional_string_argument(application, &JOIN_KEY_ARGUMENT_NAME)?,
            extension: directive_optional_boolean_argument(
                application,
                &JOIN_EXTENSION_ARGUMENT_NAME,
            )?
            .unwrap_or(false),
        })
    }

    pub(crate) fn field_directive_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
    ) -> Result<&'schema DirectiveDefinition, FederationError> {
        self.directive_definition(schema, link, &JOIN_FIELD_DIRECTIVE_NAME_IN_SPEC)
    }

    pub(crate) fn field_directive_arguments<'doc>(
        &self,
        application: &'doc AppliedDirective,
    ) -> Result<FieldDirectiveArguments<'doc>, FederationError> {
        Ok(FieldDirectiveArguments {
            graph: directive_optional_enum_argument(application, &JOIN_GRAPH_ARGUMENT_NAME)?,
            requires: directive_optional_string_argument(
                application,
                &JOIN_REQUIRES_ARGUMENT_NAME,
            )?,
            provides: directive_optional_string_argument(
                application,
                &JOIN_PROVIDES_ARGUMENT_NAME,
            )?,
        })
    }

    /// `@join__owner` only exists in the earliest supergraphs, and is optional there.
    pub(crate) fn owner_directive_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
    ) -> Option<&'schema DirectiveDefinition> {
        let name = link.directive_name_in_schema(&JOIN_OWNER_DIRECTIVE_NAME_IN_SPEC);
        schema.directive_definition(&name)
    }

    pub(crate) fn owner_directive_arguments(
        &self,
        application: &AppliedDirective,
    ) -> Result<OwnerDirectiveArguments, FederationError> {
        Ok(OwnerDirectiveArguments {
            graph: directive_required_enum_argument(application, &JOIN_GRAPH_ARGUMENT_NAME)?,
        })
    }

    pub(crate) fn implements_directive_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
    ) -> Result<Option<&'schema DirectiveDefinition>, FederationError> {
        if *self.version() < (Version { major: 0, minor: 2 }) {
            return Ok(None);
        }
        self.directive_definition(schema, link, &JOIN_IMPLEMENTS_DIRECTIVE_NAME_IN_SPEC)
            .map(Some)
    }

    pub(crate) fn implements_directive_arguments<'doc>(
        &self,
        application: &'doc AppliedDirective,
    ) -> Result<ImplementsDirectiveArguments<'doc>, FederationError> {
        Ok(ImplementsDirectiveArguments {
            graph: directive_required_enum_argument(application, &JOIN_GRAPH_ARGUMENT_NAME)?,
            interface: directive_required_string_argument(
                application,
                &JOIN_INTERFACE_ARGUMENT_NAME,
            )?,
        })
    }
}

impl SpecDefinition for JoinSpecDefinition {
    fn url(&self) -> &Url {
        &self.url
    }
}

pub(crate) static JOIN_VERSIONS: LazyLock<SpecDefinitions<JoinSpecDefinition>> =
    LazyLock::new(|| {
        let mut definitions = SpecDefinitions::new(Identity::join_identity());
        definitions.add(JoinSpecDefinition::new(Version { major: 0, minor: 1 }));
        definitions.add(JoinSpecDefinition::new(Version { major: 0, minor: 2 }));
        definitions
    });
