//! Construction boundary: turns a parsed schema document into schema definitions.

use apollo_compiler::Node;
use apollo_compiler::ast;
use indexmap::IndexMap;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::schema::FederationSchema;
use crate::schema::copy_directive_definitions;
use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::DirectiveDefinition;
use crate::schema::definitions::EnumType;
use crate::schema::definitions::EnumValueDefinition;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputObjectType;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::ObjectOrInterfaceType;
use crate::schema::definitions::ScalarType;
use crate::schema::definitions::SchemaRootDefinitionKind;
use crate::schema::definitions::TypeDefinition;
use crate::schema::definitions::UnionType;
use crate::schema::populate_type;
use crate::schema::position::SchemaDefinitionPosition;
use crate::schema::position::SchemaRootDefinitionPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildMode {
    /// Definitions become built-ins. Only valid during bootstrap.
    BuiltIn,
    Regular,
}

pub(crate) fn add_built_in_sdl(
    schema: &mut FederationSchema,
    sdl: &str,
) -> Result<(), FederationError> {
    let document = ast::Document::parse(sdl, "built_ins.graphql").map_err(|e| {
        crate::internal_error!("Built-in definitions do not parse: {}", e.errors)
    })?;
    add_document(schema, &document, BuildMode::BuiltIn)
}

/// Adds every definition of `document` to the schema.
///
/// Types are added as empty shells first so that fields may reference types defined later in the
/// document; directive definitions and root bindings come next, and the content of each type last.
/// Definitions whose name is already taken by a built-in are skipped. Type and schema extensions
/// are not supported here.
pub(crate) fn add_document(
    schema: &mut FederationSchema,
    document: &ast::Document,
    mode: BuildMode,
) -> Result<(), FederationError> {
    let mut types = Vec::new();
    let mut directive_definitions = Vec::new();
    let mut schema_definition = None;
    for definition in &document.definitions {
        match definition {
            ast::Definition::SchemaDefinition(definition) => {
                if schema_definition.replace(definition).is_some() {
                    return Err(SingleFederationError::InvalidGraphQL {
                        message: "Must have at most one schema definition".to_owned(),
                    }
                    .into());
                }
            }
            ast::Definition::DirectiveDefinition(definition) => {
                if mode == BuildMode::Regular && schema.is_built_in_directive(&definition.name) {
                    continue;
                }
                directive_definitions.push(directive_definition_from_ast(definition));
            }
            ast::Definition::ScalarTypeDefinition(_)
            | ast::Definition::ObjectTypeDefinition(_)
            | ast::Definition::InterfaceTypeDefinition(_)
            | ast::Definition::UnionTypeDefinition(_)
            | ast::Definition::EnumTypeDefinition(_)
            | ast::Definition::InputObjectTypeDefinition(_) => {
                let Some(type_) = type_definition_from_ast(definition) else {
                    continue;
                };
                if mode == BuildMode::Regular && schema.is_built_in_type(type_.name()) {
                    continue;
                }
                types.push(type_);
            }
            ast::Definition::SchemaExtension(_)
            | ast::Definition::ScalarTypeExtension(_)
            | ast::Definition::ObjectTypeExtension(_)
            | ast::Definition::InterfaceTypeExtension(_)
            | ast::Definition::UnionTypeExtension(_)
            | ast::Definition::EnumTypeExtension(_)
            | ast::Definition::InputObjectTypeExtension(_) => {
                return Err(SingleFederationError::UnsupportedFeature {
                    message: format!(
                        "Extensions are not supported when building a schema: \"{}\"",
                        definition
                            .name()
                            .map(|name| name.to_string())
                            .unwrap_or_else(|| "schema".to_owned())
                    ),
                }
                .into());
            }
            ast::Definition::OperationDefinition(_) | ast::Definition::FragmentDefinition(_) => {
                return Err(SingleFederationError::InvalidGraphQL {
                    message: "Executable definitions are not allowed in a schema document"
                        .to_owned(),
                }
                .into());
            }
        }
    }

    for type_ in &types {
        match mode {
            BuildMode::BuiltIn => schema.add_built_in_type(type_.shell())?,
            BuildMode::Regular => schema.add_type(type_.shell())?,
        };
    }
    copy_directive_definitions(
        schema,
        directive_definitions.iter(),
        mode == BuildMode::BuiltIn,
    )?;

    match schema_definition {
        Some(definition) => {
            if definition.description.is_some() {
                schema.schema_definition.description = definition.description.clone();
            }
            for root in &definition.root_operations {
                let (operation_type, type_name) = &**root;
                SchemaRootDefinitionPosition {
                    root_kind: (*operation_type).into(),
                }
                .insert(schema, type_name.clone(), None)?;
            }
            for directive in definition.directives.iter() {
                SchemaDefinitionPosition
                    .insert_directive(schema, AppliedDirective::from_node(directive.clone()))?;
            }
        }
        None if mode == BuildMode::Regular => add_default_roots(schema)?,
        None => {}
    }

    let no_extensions = IndexMap::new();
    for type_ in &types {
        populate_type(schema, type_, &no_extensions)?;
    }
    Ok(())
}

/// Binds the conventionally named object types as roots when nothing else is bound.
pub(crate) fn add_default_roots(schema: &mut FederationSchema) -> Result<(), FederationError> {
    if !schema.schema_definition.roots.is_empty() {
        return Ok(());
    }
    for kind in SchemaRootDefinitionKind::ALL {
        let type_name = kind.default_type_name();
        if matches!(
            schema.type_definition(&type_name),
            Some(TypeDefinition::Object(_))
        ) {
            SchemaRootDefinitionPosition { root_kind: kind }.insert(schema, type_name, None)?;
        }
    }
    Ok(())
}

fn directives_from_ast(directives: &ast::DirectiveList) -> Vec<AppliedDirective> {
    directives
        .iter()
        .map(|directive| AppliedDirective::from_node(directive.clone()))
        .collect()
}

fn input_value_from_ast(value: &Node<ast::InputValueDefinition>) -> InputValueDefinition {
    InputValueDefinition {
        description: value.description.clone(),
        name: value.name.clone(),
        ty: Some((*value.ty).clone()),
        default_value: value.default_value.clone(),
        directives: directives_from_ast(&value.directives),
        extension: None,
    }
}

fn input_values_from_ast(
    values: &[Node<ast::InputValueDefinition>],
) -> IndexMap<apollo_compiler::Name, InputValueDefinition> {
    values
        .iter()
        .map(|value| (value.name.clone(), input_value_from_ast(value)))
        .collect()
}

fn fields_from_ast(
    fields: &[Node<ast::FieldDefinition>],
) -> IndexMap<apollo_compiler::Name, FieldDefinition> {
    fields
        .iter()
        .map(|field| {
            (
                field.name.clone(),
                FieldDefinition {
                    description: field.description.clone(),
                    name: field.name.clone(),
                    arguments: input_values_from_ast(&field.arguments),
                    ty: Some(field.ty.clone()),
                    directives: directives_from_ast(&field.directives),
                    extension: None,
                },
            )
        })
        .collect()
}

fn type_definition_from_ast(definition: &ast::Definition) -> Option<TypeDefinition> {
    Some(match definition {
        ast::Definition::ScalarTypeDefinition(type_) => TypeDefinition::Scalar(ScalarType {
            description: type_.description.clone(),
            name: type_.name.clone(),
            directives: directives_from_ast(&type_.directives),
            extensions: Default::default(),
        }),
        ast::Definition::ObjectTypeDefinition(type_) => {
            TypeDefinition::Object(ObjectOrInterfaceType {
                description: type_.description.clone(),
                name: type_.name.clone(),
                implements_interfaces: type_
                    .implements_interfaces
                    .iter()
                    .map(|name| (name.clone(), None))
                    .collect(),
                fields: fields_from_ast(&type_.fields),
                directives: directives_from_ast(&type_.directives),
                extensions: Default::default(),
            })
        }
        ast::Definition::InterfaceTypeDefinition(type_) => {
            TypeDefinition::Interface(ObjectOrInterfaceType {
                description: type_.description.clone(),
                name: type_.name.clone(),
                implements_interfaces: type_
                    .implements_interfaces
                    .iter()
                    .map(|name| (name.clone(), None))
                    .collect(),
                fields: fields_from_ast(&type_.fields),
                directives: directives_from_ast(&type_.directives),
                extensions: Default::default(),
            })
        }
        ast::Definition::UnionTypeDefinition(type_) => TypeDefinition::Union(UnionType {
            description: type_.description.clone(),
            name: type_.name.clone(),
            members: type_
                .members
                .iter()
                .map(|name| (name.clone(), None))
                .collect(),
            directives: directives_from_ast(&type_.directives),
            extensions: Default::default(),
        }),
        ast::Definition::EnumTypeDefinition(type_) => TypeDefinition::Enum(EnumType {
            description: type_.description.clone(),
            name: type_.name.clone(),
            values: type_
                .values
                .iter()
                .map(|value| {
                    (
                        value.value.clone(),
                        EnumValueDefinition {
                            description: value.description.clone(),
                            value: value.value.clone(),
                            directives: directives_from_ast(&value.directives),
                            extension: None,
                        },
                    )
                })
                .collect(),
            directives: directives_from_ast(&type_.directives),
            extensions: Default::default(),
        }),
        ast::Definition::InputObjectTypeDefinition(type_) => {
            TypeDefinition::InputObject(InputObjectType {
                description: type_.description.clone(),
                name: type_.name.clone(),
                fields: input_values_from_ast(&type_.fields),
                directives: directives_from_ast(&type_.directives),
                extensions: Default::default(),
            })
        }
        _ => return None,
    })
}

fn directive_definition_from_ast(definition: &Node<ast::DirectiveDefinition>) -> DirectiveDefinition {
    DirectiveDefinition {
        description: definition.description.clone(),
        name: definition.name.clone(),
        arguments: input_values_from_ast(&definition.arguments),
        repeatable: definition.repeatable,
        locations: definition.locations.clone(),
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use crate::schema::FederationSchema;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;
    use crate::schema::definitions::SchemaRootDefinitionKind;

    #[test]
    fn forward_references_resolve() {
        let schema = FederationSchema::parse(
            r#"
            type Query { users: [User!]! }
            type User { id: ID! friends(first: Int = 10): [User] status: Status }
            enum Status { ACTIVE DISABLED }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        assert_eq!(
            schema.root_type_name(SchemaRootDefinitionKind::Query),
            Some(&name!("Query"))
        );
        let user_referencers = schema.referencers().type_referencers("User").unwrap();
        let referencers: Vec<String> = user_referencers.iter().map(|r| r.to_string()).collect();
        assert_eq!(referencers, vec!["Query.users", "User.friends"]);
        assert!(schema.referencers().type_referencers("Int").unwrap().len() == 1);
    }

    #[test]
    fn explicit_schema_block_overrides_default_roots() {
        let schema = FederationSchema::parse(
            r#"
            schema { query: Root }
            type Root { a: Int }
            type Query { b: Int }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        assert_eq!(
            schema.root_type_name(SchemaRootDefinitionKind::Query),
            Some(&name!("Root"))
        );
    }

    #[test]
    fn extensions_are_unsupported() {
        let error = FederationSchema::parse(
            "type Query { a: Int } extend type Query { b: Int }",
            GRAPHQL_BUILT_INS,
        )
        .unwrap_err();
        assert_eq!(error.errors()[0].code(), "UNSUPPORTED_FEATURE");
    }

    #[test]
    fn unknown_types_are_reported() {
        let error = FederationSchema::parse("type Query { a: Missing }", GRAPHQL_BUILT_INS)
            .unwrap_err();
        insta::assert_snapshot!(error, @r###"Cannot find type "Missing" in schema"###);
    }
}
