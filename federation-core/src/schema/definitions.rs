//! The element structs of the type system model.
//!
//! Types refer to each other by name only. A [`super::FederationSchema`] owns every definition and
//! keeps the name references consistent through its referencer index; the structs in here are
//! plain data, readable by anyone but only mutated through the schema's position handles.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::DirectiveLocation;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Serialize;
use strum_macros::Display;

/// Identifies one `extend` block of a type or of the schema definition. Identities are allocated by
/// the schema owning the extended element and are only meaningful within that schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExtensionId(pub(crate) u32);

/// A directive application attached to exactly one schema element. Its definition is resolved by
/// name against the owning schema whenever it is read.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDirective {
    pub node: Node<ast::Directive>,
    pub extension: Option<ExtensionId>,
}

impl AppliedDirective {
    pub fn new(name: Name, arguments: impl IntoIterator<Item = (Name, ast::Value)>) -> Self {
        Self {
            node: Node::new(ast::Directive {
                name,
                arguments: arguments
                    .into_iter()
                    .map(|(name, value)| {
                        Node::new(ast::Argument {
                            name,
                            value: Node::new(value),
                        })
                    })
                    .collect(),
            }),
            extension: None,
        }
    }

    pub fn from_node(node: Node<ast::Directive>) -> Self {
        Self {
            node,
            extension: None,
        }
    }

    pub fn in_extension(mut self, extension: Option<ExtensionId>) -> Self {
        self.extension = extension;
        self
    }

    pub fn name(&self) -> &Name {
        &self.node.name
    }

    pub fn argument(&self, name: &str) -> Option<&Node<ast::Value>> {
        self.node
            .arguments
            .iter()
            .find(|argument| argument.name == name)
            .map(|argument| &argument.value)
    }
}

pub(crate) fn has_directive(directives: &[AppliedDirective], name: &str) -> bool {
    directives.iter().any(|directive| directive.name() == name)
}

/// An argument of a field or directive, or a field of an input object.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub description: Option<Node<str>>,
    pub name: Name,
    /// `None` once the referenced type has been removed from the schema.
    pub ty: Option<ast::Type>,
    pub default_value: Option<Node<ast::Value>>,
    pub directives: Vec<AppliedDirective>,
    pub extension: Option<ExtensionId>,
}

impl InputValueDefinition {
    pub fn new(name: Name, ty: ast::Type) -> Self {
        Self {
            description: None,
            name,
            ty: Some(ty),
            default_value: None,
            directives: Vec::new(),
            extension: None,
        }
    }

    pub fn with_default_value(mut self, value: ast::Value) -> Self {
        self.default_value = Some(Node::new(value));
        self
    }

    /// Non-nullable and without default: a value must be supplied.
    pub fn is_required(&self) -> bool {
        self.default_value.is_none() && self.ty.as_ref().is_some_and(|ty| ty.is_non_null())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub description: Option<Node<str>>,
    pub name: Name,
    pub arguments: IndexMap<Name, InputValueDefinition>,
    /// `None` once the referenced type has been removed from the schema.
    pub ty: Option<ast::Type>,
    pub directives: Vec<AppliedDirective>,
    pub extension: Option<ExtensionId>,
}

impl FieldDefinition {
    pub fn new(name: Name, ty: ast::Type) -> Self {
        Self {
            description: None,
            name,
            arguments: IndexMap::new(),
            ty: Some(ty),
            directives: Vec::new(),
            extension: None,
        }
    }

    pub fn with_argument(mut self, argument: InputValueDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDefinition {
    pub description: Option<Node<str>>,
    pub value: Name,
    pub directives: Vec<AppliedDirective>,
    pub extension: Option<ExtensionId>,
}

impl EnumValueDefinition {
    pub fn new(value: Name) -> Self {
        Self {
            description: None,
            value,
            directives: Vec::new(),
            extension: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarType {
    pub description: Option<Node<str>>,
    pub name: Name,
    pub directives: Vec<AppliedDirective>,
    pub extensions: IndexSet<ExtensionId>,
}

/// Shared shape of object and interface types.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectOrInterfaceType {
    pub description: Option<Node<str>>,
    pub name: Name,
    /// Implemented interface names, with the extension each `implements` clause came from.
    pub implements_interfaces: IndexMap<Name, Option<ExtensionId>>,
    pub fields: IndexMap<Name, FieldDefinition>,
    pub directives: Vec<AppliedDirective>,
    pub extensions: IndexSet<ExtensionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub description: Option<Node<str>>,
    pub name: Name,
    pub members: IndexMap<Name, Option<ExtensionId>>,
    pub directives: Vec<AppliedDirective>,
    pub extensions: IndexSet<ExtensionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub description: Option<Node<str>>,
    pub name: Name,
    pub values: IndexMap<Name, EnumValueDefinition>,
    pub directives: Vec<AppliedDirective>,
    pub extensions: IndexSet<ExtensionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectType {
    pub description: Option<Node<str>>,
    pub name: Name,
    pub fields: IndexMap<Name, InputValueDefinition>,
    pub directives: Vec<AppliedDirective>,
    pub extensions: IndexSet<ExtensionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

/// A named type of the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Scalar(ScalarType),
    Object(ObjectOrInterfaceType),
    Interface(ObjectOrInterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    /// An empty definition of the given kind.
    pub fn new(kind: TypeKind, name: Name) -> Self {
        match kind {
            TypeKind::Scalar => TypeDefinition::Scalar(ScalarType {
                description: None,
                name,
                directives: Vec::new(),
                extensions: IndexSet::new(),
            }),
            TypeKind::Object | TypeKind::Interface => {
                let type_ = ObjectOrInterfaceType {
                    description: None,
                    name,
                    implements_interfaces: IndexMap::new(),
                    fields: IndexMap::new(),
                    directives: Vec::new(),
                    extensions: IndexSet::new(),
                };
                if kind == TypeKind::Object {
                    TypeDefinition::Object(type_)
                } else {
                    TypeDefinition::Interface(type_)
                }
            }
            TypeKind::Union => TypeDefinition::Union(UnionType {
                description: None,
                name,
                members: IndexMap::new(),
                directives: Vec::new(),
                extensions: IndexSet::new(),
            }),
            TypeKind::Enum => TypeDefinition::Enum(EnumType {
                description: None,
                name,
                values: IndexMap::new(),
                directives: Vec::new(),
                extensions: IndexSet::new(),
            }),
            TypeKind::InputObject => TypeDefinition::InputObject(InputObjectType {
                description: None,
                name,
                fields: IndexMap::new(),
                directives: Vec::new(),
                extensions: IndexSet::new(),
            }),
        }
    }

    /// The same type with its description kept and every inner element dropped.
    pub fn shell(&self) -> Self {
        let mut shell = TypeDefinition::new(self.kind(), self.name().clone());
        shell.set_description(self.description().cloned());
        shell
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDefinition::Scalar(_) => TypeKind::Scalar,
            TypeDefinition::Object(_) => TypeKind::Object,
            TypeDefinition::Interface(_) => TypeKind::Interface,
            TypeDefinition::Union(_) => TypeKind::Union,
            TypeDefinition::Enum(_) => TypeKind::Enum,
            TypeDefinition::InputObject(_) => TypeKind::InputObject,
        }
    }

    pub fn name(&self) -> &Name {
        match self {
            TypeDefinition::Scalar(type_) => &type_.name,
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => &type_.name,
            TypeDefinition::Union(type_) => &type_.name,
            TypeDefinition::Enum(type_) => &type_.name,
            TypeDefinition::InputObject(type_) => &type_.name,
        }
    }

    pub fn description(&self) -> Option<&Node<str>> {
        match self {
            TypeDefinition::Scalar(type_) => type_.description.as_ref(),
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                type_.description.as_ref()
            }
            TypeDefinition::Union(type_) => type_.description.as_ref(),
            TypeDefinition::Enum(type_) => type_.description.as_ref(),
            TypeDefinition::InputObject(type_) => type_.description.as_ref(),
        }
    }

    fn set_description(&mut self, description: Option<Node<str>>) {
        match self {
            TypeDefinition::Scalar(type_) => type_.description = description,
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                type_.description = description
            }
            TypeDefinition::Union(type_) => type_.description = description,
            TypeDefinition::Enum(type_) => type_.description = description,
            TypeDefinition::InputObject(type_) => type_.description = description,
        }
    }

    pub fn directives(&self) -> &[AppliedDirective] {
        match self {
            TypeDefinition::Scalar(type_) => &type_.directives,
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => &type_.directives,
            TypeDefinition::Union(type_) => &type_.directives,
            TypeDefinition::Enum(type_) => &type_.directives,
            TypeDefinition::InputObject(type_) => &type_.directives,
        }
    }

    pub(crate) fn directives_mut(&mut self) -> &mut Vec<AppliedDirective> {
        match self {
            TypeDefinition::Scalar(type_) => &mut type_.directives,
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                &mut type_.directives
            }
            TypeDefinition::Union(type_) => &mut type_.directives,
            TypeDefinition::Enum(type_) => &mut type_.directives,
            TypeDefinition::InputObject(type_) => &mut type_.directives,
        }
    }

    pub fn extensions(&self) -> &IndexSet<ExtensionId> {
        match self {
            TypeDefinition::Scalar(type_) => &type_.extensions,
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => &type_.extensions,
            TypeDefinition::Union(type_) => &type_.extensions,
            TypeDefinition::Enum(type_) => &type_.extensions,
            TypeDefinition::InputObject(type_) => &type_.extensions,
        }
    }

    pub(crate) fn extensions_mut(&mut self) -> &mut IndexSet<ExtensionId> {
        match self {
            TypeDefinition::Scalar(type_) => &mut type_.extensions,
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                &mut type_.extensions
            }
            TypeDefinition::Union(type_) => &mut type_.extensions,
            TypeDefinition::Enum(type_) => &mut type_.extensions,
            TypeDefinition::InputObject(type_) => &mut type_.extensions,
        }
    }

    pub fn has_directive(&self, name: &str) -> bool {
        has_directive(self.directives(), name)
    }

    /// Fields of an object or interface type.
    pub fn fields(&self) -> Option<&IndexMap<Name, FieldDefinition>> {
        match self {
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => Some(&type_.fields),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Object(_) | TypeDefinition::Interface(_) | TypeDefinition::Union(_)
        )
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeDefinition::Scalar(_) | TypeDefinition::Enum(_))
    }

    pub fn is_input_type(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) | TypeDefinition::InputObject(_)
        )
    }

    pub fn is_output_type(&self) -> bool {
        !matches!(self, TypeDefinition::InputObject(_))
    }

    /// Whether the type has nothing a selection or input value could use.
    pub fn is_empty(&self) -> bool {
        match self {
            TypeDefinition::Scalar(_) => false,
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                type_.fields.is_empty()
            }
            TypeDefinition::Union(type_) => type_.members.is_empty(),
            TypeDefinition::Enum(type_) => type_.values.is_empty(),
            TypeDefinition::InputObject(type_) => type_.fields.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveDefinition {
    pub description: Option<Node<str>>,
    pub name: Name,
    pub arguments: IndexMap<Name, InputValueDefinition>,
    pub repeatable: bool,
    pub locations: Vec<DirectiveLocation>,
}

impl DirectiveDefinition {
    pub fn new(
        name: Name,
        repeatable: bool,
        locations: impl IntoIterator<Item = DirectiveLocation>,
    ) -> Self {
        Self {
            description: None,
            name,
            arguments: IndexMap::new(),
            repeatable,
            locations: locations.into_iter().collect(),
        }
    }

    pub fn with_argument(mut self, argument: InputValueDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    /// The same definition without arguments.
    pub(crate) fn shell(&self) -> Self {
        Self {
            description: self.description.clone(),
            name: self.name.clone(),
            arguments: IndexMap::new(),
            repeatable: self.repeatable,
            locations: self.locations.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
pub enum SchemaRootDefinitionKind {
    #[strum(to_string = "query")]
    Query,
    #[strum(to_string = "mutation")]
    Mutation,
    #[strum(to_string = "subscription")]
    Subscription,
}

impl SchemaRootDefinitionKind {
    pub const ALL: [SchemaRootDefinitionKind; 3] = [
        SchemaRootDefinitionKind::Query,
        SchemaRootDefinitionKind::Mutation,
        SchemaRootDefinitionKind::Subscription,
    ];

    /// The root type name used when a schema has no `schema` block.
    pub fn default_type_name(&self) -> Name {
        match self {
            SchemaRootDefinitionKind::Query => apollo_compiler::name!("Query"),
            SchemaRootDefinitionKind::Mutation => apollo_compiler::name!("Mutation"),
            SchemaRootDefinitionKind::Subscription => apollo_compiler::name!("Subscription"),
        }
    }
}

impl From<ast::OperationType> for SchemaRootDefinitionKind {
    fn from(value: ast::OperationType) -> Self {
        match value {
            ast::OperationType::Query => SchemaRootDefinitionKind::Query,
            ast::OperationType::Mutation => SchemaRootDefinitionKind::Mutation,
            ast::OperationType::Subscription => SchemaRootDefinitionKind::Subscription,
        }
    }
}

impl From<SchemaRootDefinitionKind> for ast::OperationType {
    fn from(value: SchemaRootDefinitionKind) -> Self {
        match value {
            SchemaRootDefinitionKind::Query => ast::OperationType::Query,
            SchemaRootDefinitionKind::Mutation => ast::OperationType::Mutation,
            SchemaRootDefinitionKind::Subscription => ast::OperationType::Subscription,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRootDefinition {
    pub type_name: Name,
    pub extension: Option<ExtensionId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    pub description: Option<Node<str>>,
    pub roots: IndexMap<SchemaRootDefinitionKind, SchemaRootDefinition>,
    pub directives: Vec<AppliedDirective>,
    pub extensions: IndexSet<ExtensionId>,
}

impl SchemaDefinition {
    pub fn root(&self, kind: SchemaRootDefinitionKind) -> Option<&Name> {
        self.roots.get(&kind).map(|root| &root.type_name)
    }

    /// Whether every root uses its conventional name and nothing else is declared, in which case
    /// the `schema` block can be left out of printed output.
    pub(crate) fn is_default(&self) -> bool {
        self.description.is_none()
            && self.directives.is_empty()
            && self.extensions.is_empty()
            && self
                .roots
                .iter()
                .all(|(kind, root)| root.type_name == kind.default_type_name())
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    #[test]
    fn required_inputs_are_non_null_without_default() {
        let ty = ast::Type::Named(name!("Int")).non_null();
        assert!(InputValueDefinition::new(name!("a"), ty.clone()).is_required());
        assert!(
            !InputValueDefinition::new(name!("a"), ty)
                .with_default_value(ast::Value::Int(1.into()))
                .is_required()
        );
        assert!(
            !InputValueDefinition::new(name!("a"), ast::Type::Named(name!("Int"))).is_required()
        );
    }

    #[test]
    fn shells_keep_kind_and_drop_content() {
        let mut object = TypeDefinition::new(TypeKind::Object, name!("T"));
        if let TypeDefinition::Object(type_) = &mut object {
            type_.fields.insert(
                name!("f"),
                FieldDefinition::new(name!("f"), ast::Type::Named(name!("Int"))),
            );
        }
        let shell = object.shell();
        assert_eq!(shell.kind(), TypeKind::Object);
        assert!(shell.is_empty());
        assert!(!object.is_empty());
    }

    #[test]
    fn default_roots_are_recognized() {
        let mut definition = SchemaDefinition::default();
        definition.roots.insert(
            SchemaRootDefinitionKind::Query,
            SchemaRootDefinition {
                type_name: name!("Query"),
                extension: None,
            },
        );
        assert!(definition.is_default());
        definition.roots.insert(
            SchemaRootDefinitionKind::Mutation,
            SchemaRootDefinition {
                type_name: name!("Writes"),
                extension: None,
            },
        );
        assert!(!definition.is_default());
        assert_eq!(SchemaRootDefinitionKind::Mutation.to_string(), "mutation");
    }
}
