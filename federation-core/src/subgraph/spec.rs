//! The federation built-ins every subgraph schema is bootstrapped with.
//!
//! Besides the GraphQL built-ins, a subgraph knows the entity machinery (`_Any`, `_Service`,
//! `_Entity`) and the federation directives. The `_Entity` union and the `_service`/`_entities`
//! root fields depend on the rest of the schema, so they are recomputed each time the schema is
//! validated.

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::name;
use indexmap::IndexSet;
use tracing::trace;

use crate::error::FederationError;
use crate::schema::FederationSchema;
use crate::schema::built_ins::BuiltIns;
use crate::schema::built_ins::GRAPHQL_BUILT_INS;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::SchemaRootDefinitionKind;
use crate::schema::definitions::TypeDefinition;
use crate::schema::definitions::TypeKind;
use crate::schema::from_ast;
use crate::schema::position::SchemaRootDefinitionPosition;
use crate::schema::position::TypeDefinitionPosition;

pub const ANY_SCALAR_NAME: Name = name!("_Any");
pub const ENTITY_UNION_NAME: Name = name!("_Entity");
pub const SERVICE_TYPE: Name = name!("_Service");

pub const ENTITIES_QUERY: Name = name!("_entities");
pub const SERVICE_SDL_QUERY: Name = name!("_service");
pub const REPRESENTATIONS_ARGUMENT_NAME: Name = name!("representations");

pub const KEY_DIRECTIVE_NAME: Name = name!("key");
pub const EXTENDS_DIRECTIVE_NAME: Name = name!("extends");
pub const EXTERNAL_DIRECTIVE_NAME: Name = name!("external");
pub const REQUIRES_DIRECTIVE_NAME: Name = name!("requires");
pub const PROVIDES_DIRECTIVE_NAME: Name = name!("provides");
pub const INACCESSIBLE_DIRECTIVE_NAME: Name = name!("inaccessible");
pub const FIELDS_ARGUMENT_NAME: Name = name!("fields");

const FEDERATION_BUILT_IN_TYPES: &str = r#"
scalar _Any

type _Service {
  sdl: String
}
"#;

const FEDERATION_BUILT_IN_DIRECTIVES: &str = r#"
directive @key(fields: String!) repeatable on OBJECT | INTERFACE
directive @extends on OBJECT | INTERFACE
directive @external on OBJECT | FIELD_DEFINITION
directive @requires(fields: String!) on FIELD_DEFINITION
directive @provides(fields: String!) on FIELD_DEFINITION
directive @inaccessible on QUERY | MUTATION | SUBSCRIPTION | FIELD | FRAGMENT_DEFINITION | FRAGMENT_SPREAD | INLINE_FRAGMENT | VARIABLE_DEFINITION | SCHEMA | SCALAR | OBJECT | FIELD_DEFINITION | ARGUMENT_DEFINITION | INTERFACE | UNION | ENUM | ENUM_VALUE | INPUT_OBJECT | INPUT_FIELD_DEFINITION
"#;

/// The GraphQL built-ins plus the federation entity types and directives.
#[derive(Debug)]
pub struct FederationBuiltIns;

impl BuiltIns for FederationBuiltIns {
    fn add_built_in_types(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        GRAPHQL_BUILT_INS.add_built_in_types(schema)?;
        from_ast::add_built_in_sdl(schema, FEDERATION_BUILT_IN_TYPES)?;
        // Members are only known once the schema is complete.
        schema.add_built_in_type(TypeDefinition::new(TypeKind::Union, ENTITY_UNION_NAME))?;
        Ok(())
    }

    fn add_built_in_directives(
        &self,
        schema: &mut FederationSchema,
    ) -> Result<(), FederationError> {
        GRAPHQL_BUILT_INS.add_built_in_directives(schema)?;
        from_ast::add_built_in_sdl(schema, FEDERATION_BUILT_IN_DIRECTIVES)
    }

    fn on_validation(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        schema.with_built_in_modification_allowed(|schema| {
            let entities = entity_type_names(schema);
            trace!("Found {} entity type(s)", entities.len());
            let query_type = ensure_query_root(schema)?;
            // `_entities` is the only referencer of `_Entity` and goes away first.
            if entities.is_empty() {
                update_root_fields(schema, &query_type, false)?;
                update_entity_union(schema, &entities)
            } else {
                update_entity_union(schema, &entities)?;
                update_root_fields(schema, &query_type, true)
            }
        })
    }
}

pub static FEDERATION_BUILT_INS: &dyn BuiltIns = &FederationBuiltIns;

/// Object types carrying `@key`, in schema order.
fn entity_type_names(schema: &FederationSchema) -> IndexSet<Name> {
    schema
        .types()
        .filter(|type_| {
            matches!(type_, TypeDefinition::Object(_)) && type_.has_directive(&KEY_DIRECTIVE_NAME)
        })
        .map(|type_| type_.name().clone())
        .collect()
}

/// The query root type, bound (and created empty) if the schema does not have one yet.
fn ensure_query_root(schema: &mut FederationSchema) -> Result<Name, FederationError> {
    if let Some(query_type) = schema.root_type_name(SchemaRootDefinitionKind::Query) {
        return Ok(query_type.clone());
    }
    let query_type = SchemaRootDefinitionKind::Query.default_type_name();
    if schema.type_definition(&query_type).is_none() {
        schema.add_type(TypeDefinition::new(TypeKind::Object, query_type.clone()))?;
    }
    SchemaRootDefinitionPosition {
        root_kind: SchemaRootDefinitionKind::Query,
    }
    .insert(schema, query_type.clone(), None)?;
    Ok(query_type)
}

fn update_entity_union(
    schema: &mut FederationSchema,
    entities: &IndexSet<Name>,
) -> Result<(), FederationError> {
    let position = TypeDefinitionPosition::new(ENTITY_UNION_NAME);
    if entities.is_empty() {
        position.remove(schema)?;
        return Ok(());
    }
    if position.try_get(schema).is_none() {
        schema.add_built_in_type(TypeDefinition::new(TypeKind::Union, ENTITY_UNION_NAME))?;
    }
    let current: Vec<Name> = match position.get(schema)? {
        TypeDefinition::Union(union_) => union_.members.keys().cloned().collect(),
        _ => Vec::new(),
    };
    for member in current {
        position.union_member(member).remove(schema)?;
    }
    for entity in entities {
        position.union_member(entity.clone()).insert(schema, None)?;
    }
    Ok(())
}

fn update_root_fields(
    schema: &mut FederationSchema,
    query_type: &Name,
    has_entities: bool,
) -> Result<(), FederationError> {
    let query = TypeDefinitionPosition::new(query_type.clone());

    let entities_field = query.field(ENTITIES_QUERY);
    if !has_entities {
        entities_field.remove(schema)?;
    } else if entities_field.try_get(schema).is_none() {
        // _entities(representations: [_Any!]!): [_Entity]!
        let representations = InputValueDefinition::new(
            REPRESENTATIONS_ARGUMENT_NAME,
            ast::Type::Named(ANY_SCALAR_NAME)
                .non_null()
                .list()
                .non_null(),
        );
        entities_field.insert(
            schema,
            FieldDefinition::new(
                ENTITIES_QUERY,
                ast::Type::Named(ENTITY_UNION_NAME).list().non_null(),
            )
            .with_argument(representations),
        )?;
    }

    let service_field = query.field(SERVICE_SDL_QUERY);
    if service_field.try_get(schema).is_none() {
        service_field.insert(
            schema,
            FieldDefinition::new(SERVICE_SDL_QUERY, ast::Type::Named(SERVICE_TYPE).non_null()),
        )?;
    }
    Ok(())
}
