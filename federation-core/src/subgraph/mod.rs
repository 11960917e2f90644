//! Subgraph schemas: the partial schema one service publishes, built on the federation built-ins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FederationError;
use crate::error::MultipleFederationErrors;
use crate::error::SingleFederationError;
use crate::schema::FederationSchema;
use crate::schema::ValidFederationSchema;
use crate::subgraph::spec::FEDERATION_BUILT_INS;

pub mod spec;

pub struct Subgraph {
    pub name: String,
    pub url: String,
    pub schema: FederationSchema,
}

impl Subgraph {
    pub fn new(name: &str, url: &str, schema: FederationSchema) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            schema,
        }
    }

    /// An empty subgraph, holding only the federation built-ins.
    pub fn empty(name: &str, url: &str) -> Result<Self, FederationError> {
        Ok(Self::new(name, url, FederationSchema::new(FEDERATION_BUILT_INS)?))
    }

    /// Builds a subgraph from its SDL. Federation definitions the SDL repeats are skipped in favor
    /// of the built-in ones.
    pub fn parse(name: &str, url: &str, schema_str: &str) -> Result<Self, FederationError> {
        let schema = FederationSchema::parse(schema_str, FEDERATION_BUILT_INS)
            .map_err(|error| into_subgraph_error(name, error))?;
        Ok(Self::new(name, url, schema))
    }

    /// Validates the schema, which also recomputes its entities and federation root fields.
    /// Errors are tagged with the subgraph name.
    pub fn validate(self) -> Result<ValidSubgraph, FederationError> {
        let Subgraph { name, url, schema } = self;
        let schema = schema
            .validate()
            .map_err(|error| into_subgraph_error(&name, error))?;
        Ok(ValidSubgraph { name, url, schema })
    }
}

impl fmt::Debug for Subgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#"name: {}, url: {}"#, self.name, self.url)
    }
}

fn into_subgraph_error(subgraph: &str, error: FederationError) -> FederationError {
    let errors = MultipleFederationErrors::from_iter(error.into_errors().into_iter().map(|error| {
        match error {
            SingleFederationError::InvalidSubgraph { .. } => error,
            error => SingleFederationError::InvalidSubgraph {
                subgraph: subgraph.to_owned(),
                message: error.to_string(),
            },
        }
    }));
    match errors.into_result() {
        Ok(()) => FederationError::internal(format!("Subgraph \"{subgraph}\" failed without error")),
        Err(error) => error,
    }
}

#[derive(Clone, PartialEq)]
pub struct ValidSubgraph {
    pub name: String,
    pub url: String,
    pub schema: ValidFederationSchema,
}

impl fmt::Debug for ValidSubgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#"name: {}, url: {}"#, self.name, self.url)
    }
}

/// Subgraphs being built, by name.
#[derive(Debug, Default)]
pub struct Subgraphs {
    subgraphs: BTreeMap<Arc<str>, Subgraph>,
}

impl Subgraphs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subgraph: Subgraph) -> Result<(), FederationError> {
        if self.subgraphs.contains_key(subgraph.name.as_str()) {
            return Err(SingleFederationError::InvalidFederationSupergraph {
                message: format!("A subgraph named \"{}\" already exists", subgraph.name),
            }
            .into());
        }
        self.subgraphs
            .insert(subgraph.name.as_str().into(), subgraph);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Subgraph> {
        self.subgraphs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Subgraph> {
        self.subgraphs.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.subgraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subgraphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subgraph> {
        self.subgraphs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Subgraph> {
        self.subgraphs.values_mut()
    }

    /// Validates every subgraph, reporting the errors of all of them.
    pub fn validate(self) -> Result<ValidSubgraphs, FederationError> {
        let mut errors = MultipleFederationErrors::new();
        let mut valid = ValidSubgraphs::default();
        for (name, subgraph) in self.subgraphs {
            match subgraph.validate() {
                Ok(subgraph) => {
                    valid.subgraphs.insert(name, subgraph);
                }
                Err(error) => errors.push(error),
            }
        }
        errors.into_result()?;
        Ok(valid)
    }
}

/// Validated subgraphs, by name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidSubgraphs {
    subgraphs: BTreeMap<Arc<str>, ValidSubgraph>,
}

impl ValidSubgraphs {
    pub fn get(&self, name: &str) -> Option<&ValidSubgraph> {
        self.subgraphs.get(name)
    }

    pub fn len(&self) -> usize {
        self.subgraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subgraphs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subgraphs.keys().map(|name| &**name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidSubgraph> {
        self.subgraphs.values()
    }
}

impl IntoIterator for ValidSubgraphs {
    type Item = <BTreeMap<Arc<str>, ValidSubgraph> as IntoIterator>::Item;
    type IntoIter = <BTreeMap<Arc<str>, ValidSubgraph> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.subgraphs.into_iter()
    }
}
