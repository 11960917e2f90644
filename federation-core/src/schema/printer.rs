//! SDL output, going through the `apollo_compiler` AST.
//!
//! Built-ins are never printed. Elements attached to an extension are printed in an `extend`
//! block of their own, one block per extension in allocation order. Fields and input values whose
//! type has been removed are left out.

use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use indexmap::IndexMap;

use crate::schema::FederationSchema;
use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::DirectiveDefinition;
use crate::schema::definitions::EnumValueDefinition;
use crate::schema::definitions::ExtensionId;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::SchemaDefinition;
use crate::schema::definitions::TypeDefinition;

fn in_block(extension: Option<ExtensionId>, block: Option<ExtensionId>) -> bool {
    extension == block
}

fn directives_to_ast(
    directives: &[AppliedDirective],
    block: Option<ExtensionId>,
) -> ast::DirectiveList {
    ast::DirectiveList(
        directives
            .iter()
            .filter(|directive| in_block(directive.extension, block))
            .map(|directive| directive.node.clone())
            .collect(),
    )
}

/// Applications on a field, value or argument are printed with the element itself.
fn element_directives_to_ast(directives: &[AppliedDirective]) -> ast::DirectiveList {
    ast::DirectiveList(
        directives
            .iter()
            .map(|directive| directive.node.clone())
            .collect(),
    )
}

fn input_value_to_ast(value: &InputValueDefinition) -> Option<Node<ast::InputValueDefinition>> {
    let ty = value.ty.clone()?;
    Some(Node::new(ast::InputValueDefinition {
        description: value.description.clone(),
        name: value.name.clone(),
        ty: Node::new(ty),
        default_value: value.default_value.clone(),
        directives: element_directives_to_ast(&value.directives),
    }))
}

fn input_values_to_ast(
    values: &IndexMap<Name, InputValueDefinition>,
    block: Option<ExtensionId>,
) -> Vec<Node<ast::InputValueDefinition>> {
    values
        .values()
        .filter(|value| in_block(value.extension, block))
        .filter_map(input_value_to_ast)
        .collect()
}

fn arguments_to_ast(
    arguments: &IndexMap<Name, InputValueDefinition>,
) -> Vec<Node<ast::InputValueDefinition>> {
    arguments.values().filter_map(input_value_to_ast).collect()
}

fn fields_to_ast(
    fields: &IndexMap<Name, FieldDefinition>,
    block: Option<ExtensionId>,
) -> Vec<Node<ast::FieldDefinition>> {
    fields
        .values()
        .filter(|field| in_block(field.extension, block))
        .filter_map(|field| {
            Some(Node::new(ast::FieldDefinition {
                description: field.description.clone(),
                name: field.name.clone(),
                arguments: arguments_to_ast(&field.arguments),
                ty: field.ty.clone()?,
                directives: element_directives_to_ast(&field.directives),
            }))
        })
        .collect()
}

fn members_to_ast(
    members: &IndexMap<Name, Option<ExtensionId>>,
    block: Option<ExtensionId>,
) -> Vec<Name> {
    members
        .iter()
        .filter(|(_, extension)| in_block(**extension, block))
        .map(|(name, _)| name.clone())
        .collect()
}

fn enum_values_to_ast(
    values: &IndexMap<Name, EnumValueDefinition>,
    block: Option<ExtensionId>,
) -> Vec<Node<ast::EnumValueDefinition>> {
    values
        .values()
        .filter(|value| in_block(value.extension, block))
        .map(|value| {
            Node::new(ast::EnumValueDefinition {
                description: value.description.clone(),
                value: value.value.clone(),
                directives: element_directives_to_ast(&value.directives),
            })
        })
        .collect()
}

/// The base definition of a type, followed by one extension definition per extension.
fn type_to_ast(type_: &TypeDefinition) -> Vec<ast::Definition> {
    let mut blocks = vec![None];
    blocks.extend(type_.extensions().iter().copied().map(Some));
    blocks
        .into_iter()
        .map(|block| type_block_to_ast(type_, block))
        .collect()
}

fn type_block_to_ast(type_: &TypeDefinition, block: Option<ExtensionId>) -> ast::Definition {
    let name = type_.name().clone();
    let directives = directives_to_ast(type_.directives(), block);
    match (type_, block) {
        (TypeDefinition::Scalar(type_), None) => {
            ast::Definition::ScalarTypeDefinition(Node::new(ast::ScalarTypeDefinition {
                description: type_.description.clone(),
                name,
                directives,
            }))
        }
        (TypeDefinition::Scalar(_), Some(_)) => {
            ast::Definition::ScalarTypeExtension(Node::new(ast::ScalarTypeExtension {
                name,
                directives,
            }))
        }
        (TypeDefinition::Object(type_), None) => {
            ast::Definition::ObjectTypeDefinition(Node::new(ast::ObjectTypeDefinition {
                description: type_.description.clone(),
                name,
                implements_interfaces: members_to_ast(&type_.implements_interfaces, block),
                directives,
                fields: fields_to_ast(&type_.fields, block),
            }))
        }
        (TypeDefinition::Object(type_), Some(_)) => {
            ast::Definition::ObjectTypeExtension(Node::new(ast::ObjectTypeExtension {
                name,
                implements_interfaces: members_to_ast(&type_.implements_interfaces, block),
                directives,
                fields: fields_to_ast(&type_.fields, block),
            }))
        }
        (TypeDefinition::Interface(type_), None) => {
            ast::Definition::InterfaceTypeDefinition(Node::new(ast::InterfaceTypeDefinition {
                description: type_.description.clone(),
                name,
                implements_interfaces: members_to_ast(&type_.implements_interfaces, block),
                directives,
                fields: fields_to_ast(&type_.fields, block),
            }))
        }
        (TypeDefinition::Interface(type_), Some(_)) => {
            ast::Definition::InterfaceTypeExtension(Node::new(ast::InterfaceTypeExtension {
                name,
                implements_interfaces: members_to_ast(&type_.implements_interfaces, block),
                directives,
                fields: fields_to_ast(&type_.fields, block),
            }))
        }
        (TypeDefinition::Union(type_), None) => {
            ast::Definition::UnionTypeDefinition(Node::new(ast::UnionTypeDefinition {
                description: type_.description.clone(),
                name,
                directives,
                members: members_to_ast(&type_.members, block),
            }))
        }
        (TypeDefinition::Union(type_), Some(_)) => {
            ast::Definition::UnionTypeExtension(Node::new(ast::UnionTypeExtension {
                name,
                directives,
                members: members_to_ast(&type_.members, block),
            }))
        }
        (TypeDefinition::Enum(type_), None) => {
            ast::Definition::EnumTypeDefinition(Node::new(ast::EnumTypeDefinition {
                description: type_.description.clone(),
                name,
                directives,
                values: enum_values_to_ast(&type_.values, block),
            }))
        }
        (TypeDefinition::Enum(type_), Some(_)) => {
            ast::Definition::EnumTypeExtension(Node::new(ast::EnumTypeExtension {
                name,
                directives,
                values: enum_values_to_ast(&type_.values, block),
            }))
        }
        (TypeDefinition::InputObject(type_), None) => {
            ast::Definition::InputObjectTypeDefinition(Node::new(ast::InputObjectTypeDefinition {
                description: type_.description.clone(),
                name,
                directives,
                fields: input_values_to_ast(&type_.fields, block),
            }))
        }
        (TypeDefinition::InputObject(type_), Some(_)) => {
            ast::Definition::InputObjectTypeExtension(Node::new(ast::InputObjectTypeExtension {
                name,
                directives,
                fields: input_values_to_ast(&type_.fields, block),
            }))
        }
    }
}

fn directive_definition_to_ast(definition: &DirectiveDefinition) -> ast::Definition {
    ast::Definition::DirectiveDefinition(Node::new(ast::DirectiveDefinition {
        description: definition.description.clone(),
        name: definition.name.clone(),
        arguments: arguments_to_ast(&definition.arguments),
        repeatable: definition.repeatable,
        locations: definition.locations.clone(),
    }))
}

fn root_operations_to_ast(
    definition: &SchemaDefinition,
    block: Option<ExtensionId>,
) -> Vec<Node<(ast::OperationType, ast::NamedType)>> {
    definition
        .roots
        .iter()
        .filter(|(_, root)| in_block(root.extension, block))
        .map(|(kind, root)| Node::new(((*kind).into(), root.type_name.clone())))
        .collect()
}

fn schema_definition_to_ast(definition: &SchemaDefinition) -> Vec<ast::Definition> {
    let mut definitions = Vec::new();
    if !definition.is_default() {
        definitions.push(ast::Definition::SchemaDefinition(Node::new(
            ast::SchemaDefinition {
                description: definition.description.clone(),
                directives: directives_to_ast(&definition.directives, None),
                root_operations: root_operations_to_ast(definition, None),
            },
        )));
    }
    for extension in &definition.extensions {
        definitions.push(ast::Definition::SchemaExtension(Node::new(
            ast::SchemaExtension {
                directives: directives_to_ast(&definition.directives, Some(*extension)),
                root_operations: root_operations_to_ast(definition, Some(*extension)),
            },
        )));
    }
    definitions
}

impl FederationSchema {
    /// The regular content of this schema as a document.
    pub fn to_ast(&self) -> ast::Document {
        let mut document = ast::Document::new();
        document
            .definitions
            .extend(schema_definition_to_ast(&self.schema_definition));
        document.definitions.extend(
            self.directive_definitions
                .values()
                .map(directive_definition_to_ast),
        );
        for type_ in self.types.values() {
            document.definitions.extend(type_to_ast(type_));
        }
        document
    }
}

impl fmt::Display for FederationSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_ast().fmt(f)
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut document = ast::Document::new();
        document.definitions = type_to_ast(self);
        document.fmt(f)
    }
}

impl fmt::Display for DirectiveDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        directive_definition_to_ast(self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use crate::schema::FederationSchema;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;
    use crate::schema::definitions::AppliedDirective;
    use crate::schema::definitions::EnumValueDefinition;
    use crate::schema::position::DirectiveTargetPosition;
    use crate::schema::position::TypeDefinitionPosition;

    #[test]
    fn extensions_print_as_extend_blocks() {
        let mut schema = FederationSchema::parse(
            r#"
            type Query { color: Color }
            enum Color { RED }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        let color = TypeDefinitionPosition::new(name!("Color"));
        let extension = color.new_extension(&mut schema).unwrap();
        let mut blue = EnumValueDefinition::new(name!("BLUE"));
        blue.extension = Some(extension);
        color.enum_value(name!("BLUE")).insert(&mut schema, blue).unwrap();
        DirectiveTargetPosition::from(color.enum_value(name!("RED")))
            .insert_directive(&mut schema, AppliedDirective::new(name!("deprecated"), []))
            .unwrap();

        insta::assert_snapshot!(schema.to_string(), @r###"
        type Query {
          color: Color
        }

        enum Color {
          RED @deprecated
        }

        extend enum Color {
          BLUE
        }
        "###);
    }

    #[test]
    fn removed_types_leave_untyped_fields_unprinted() {
        let mut schema = FederationSchema::parse(
            r#"
            type Query { a: A b: Int }
            type A { x: Int }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        TypeDefinitionPosition::new(name!("A"))
            .remove(&mut schema)
            .unwrap();
        insta::assert_snapshot!(schema.to_string(), @r###"
        type Query {
          b: Int
        }
        "###);
    }
}
