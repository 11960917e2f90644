use std::fmt;

use crate::error::FederationError;
use crate::schema::FederationSchema;
use crate::schema::from_ast;

/// The bootstrap layer of a schema: what is installed before any user definition, and what is
/// recomputed each time the schema is validated.
pub trait BuiltIns: Send + Sync + fmt::Debug {
    fn add_built_in_types(&self, schema: &mut FederationSchema) -> Result<(), FederationError>;

    fn add_built_in_directives(&self, schema: &mut FederationSchema)
    -> Result<(), FederationError>;

    /// Called by [`FederationSchema::validate`] before the schema is checked.
    fn on_validation(&self, _schema: &mut FederationSchema) -> Result<(), FederationError> {
        Ok(())
    }
}

const GRAPHQL_BUILT_IN_TYPES: &str = r#"
scalar Int
scalar Float
scalar String
scalar Boolean
scalar ID
"#;

const GRAPHQL_BUILT_IN_DIRECTIVES: &str = r#"
directive @include(if: Boolean!) on FIELD | FRAGMENT_SPREAD | INLINE_FRAGMENT
directive @skip(if: Boolean!) on FIELD | FRAGMENT_SPREAD | INLINE_FRAGMENT
directive @deprecated(reason: String = "No longer supported") on FIELD_DEFINITION | ARGUMENT_DEFINITION | INPUT_FIELD_DEFINITION | ENUM_VALUE
directive @specifiedBy(url: String!) on SCALAR
"#;

/// The scalars and directives of the GraphQL specification.
#[derive(Debug)]
pub struct GraphQLBuiltIns;

impl BuiltIns for GraphQLBuiltIns {
    fn add_built_in_types(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        from_ast::add_built_in_sdl(schema, GRAPHQL_BUILT_IN_TYPES)
    }

    fn add_built_in_directives(
        &self,
        schema: &mut FederationSchema,
    ) -> Result<(), FederationError> {
        from_ast::add_built_in_sdl(schema, GRAPHQL_BUILT_IN_DIRECTIVES)
    }
}

pub static GRAPHQL_BUILT_INS: &dyn BuiltIns = &GraphQLBuiltIns;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::definitions::TypeKind;

    #[test]
    fn graphql_built_ins_are_not_printed() {
        let schema = FederationSchema::new(GRAPHQL_BUILT_INS).unwrap();
        assert_eq!(schema.types().count(), 0);
        assert_eq!(schema.built_in_types().count(), 5);
        assert_eq!(
            schema.type_definition("Boolean").map(|type_| type_.kind()),
            Some(TypeKind::Scalar)
        );
        assert_eq!(schema.to_string().trim(), "");
    }

    #[test]
    fn deprecated_has_a_default_reason() {
        let schema = FederationSchema::new(GRAPHQL_BUILT_INS).unwrap();
        let deprecated = schema.directive_definition("deprecated").unwrap();
        assert!(deprecated.arguments["reason"].default_value.is_some());
        assert!(!deprecated.repeatable);
    }
}
