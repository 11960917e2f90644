//! Federated GraphQL schemas: an in-memory type system model, the federation built-ins of
//! subgraph schemas, selection sets over that model, and the decomposition of a composed
//! supergraph back into its subgraphs.
//!
//! ## Usage
//!
//! ```ignore
//! let supergraph = federation_core::Supergraph::new(supergraph_sdl)?;
//! for (name, subgraph) in supergraph.extract_subgraphs()? {
//!     println!("# {name} ({})\n{}", subgraph.url, subgraph.schema);
//! }
//! ```
//!
//! Both [`FederationSchema`] and [`ValidFederationSchema`] print as schema SDL.
//!
//! Schemas are built on an explicit set of built-ins ([`schema::built_ins::GRAPHQL_BUILT_INS`] or
//! [`subgraph::spec::FEDERATION_BUILT_INS`]) and are validated on demand, which turns a
//! [`FederationSchema`] into a [`ValidFederationSchema`].

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod error;
pub mod link;
pub mod operation;
pub mod schema;
pub mod subgraph;
pub mod supergraph;
pub(crate) mod utils;

use crate::error::FederationError;
pub use crate::schema::FederationSchema;
pub use crate::schema::ValidFederationSchema;
use crate::schema::built_ins::GRAPHQL_BUILT_INS;
pub use crate::subgraph::ValidSubgraph;
pub use crate::subgraph::ValidSubgraphs;
pub use crate::supergraph::ExtractSubgraphsOptions;

/// A composed schema whose elements carry join provenance.
#[derive(Debug)]
pub struct Supergraph {
    pub schema: ValidFederationSchema,
}

impl Supergraph {
    pub fn new(schema_str: &str) -> Result<Self, FederationError> {
        let schema = FederationSchema::parse(schema_str, GRAPHQL_BUILT_INS)?.validate()?;
        Self::from_schema(schema)
    }

    /// Fails if the schema does not declare a supported version of the join feature.
    pub fn from_schema(schema: ValidFederationSchema) -> Result<Self, FederationError> {
        let _ = supergraph::join_feature(&schema)?;
        Ok(Self { schema })
    }

    pub fn extract_subgraphs(&self) -> Result<ValidSubgraphs, FederationError> {
        self.extract_subgraphs_with_options(&ExtractSubgraphsOptions::default())
    }

    pub fn extract_subgraphs_with_options(
        &self,
        options: &ExtractSubgraphsOptions,
    ) -> Result<ValidSubgraphs, FederationError> {
        supergraph::extract_subgraphs_from_supergraph(&self.schema, options)
    }
}

const _: () = {
    const fn assert_thread_safe<T: Sync + Send>() {}

    assert_thread_safe::<Supergraph>();
    assert_thread_safe::<ValidSubgraphs>();
    assert_thread_safe::<operation::Operation>();
};
