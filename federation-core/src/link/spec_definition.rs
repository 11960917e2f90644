use std::collections::BTreeMap;
use std::collections::btree_map::Keys;

use apollo_compiler::Name;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::link::Link;
use crate::link::spec::Identity;
use crate::link::spec::Url;
use crate::link::spec::Version;
use crate::schema::FederationSchema;
use crate::schema::definitions::DirectiveDefinition;
use crate::schema::definitions::TypeDefinition;

/// One version of a feature specification, resolved through the [`Link`] that brings it into a
/// schema.
pub(crate) trait SpecDefinition {
    fn url(&self) -> &Url;

    fn identity(&self) -> &Identity {
        &self.url().identity
    }

    fn version(&self) -> &Version {
        &self.url().version
    }

    fn directive_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
        name_in_spec: &Name,
    ) -> Result<&'schema DirectiveDefinition, FederationError> {
        let name = link.directive_name_in_schema(name_in_spec);
        schema.directive_definition(&name).ok_or_else(|| {
            SingleFederationError::InvalidFederationSupergraph {
                message: format!(
                    "Could not find directive \"@{name}\" of {} in schema",
                    self.url()
                ),
            }
            .into()
        })
    }

    fn type_definition<'schema>(
        &self,
        schema: &'schema FederationSchema,
        link: &Link,
        name_in_spec: &Name,
    ) -> Result<&'schema TypeDefinition, FederationError> {
        let name = link.type_name_in_schema(name_in_spec);
        schema.type_definition(&name).ok_or_else(|| {
            SingleFederationError::InvalidFederationSupergraph {
                message: format!("Could not find type \"{name}\" of {} in schema", self.url()),
            }
            .into()
        })
    }
}

/// The known versions of one feature specification.
#[derive(Clone)]
pub(crate) struct SpecDefinitions<T: SpecDefinition> {
    identity: Identity,
    definitions: BTreeMap<Version, T>,
}

impl<T: SpecDefinition> SpecDefinitions<T> {
    pub(crate) fn new(identity: Identity) -> Self {
        Self {
            identity,
            definitions: BTreeMap::new(),
        }
    }

    pub(crate) fn add(&mut self, definition: T) {
        debug_assert_eq!(
            *definition.identity(),
            self.identity,
            "Cannot add definition for {} to the versions of definitions for {}",
            definition.url(),
            self.identity
        );
        if self.definitions.contains_key(definition.version()) {
            return;
        }
        self.definitions
            .insert(definition.version().clone(), definition);
    }

    pub(crate) fn find(&self, requested: &Version) -> Option<&T> {
        self.definitions.get(requested)
    }

    pub(crate) fn versions(&self) -> Keys<'_, Version, T> {
        self.definitions.keys()
    }
}
