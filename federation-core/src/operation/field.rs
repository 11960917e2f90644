use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::operation::DirectiveList;
use crate::operation::SelectionSet;
use crate::operation::TYPENAME_FIELD;
use crate::operation::directive_list::sort_arguments;
use crate::schema::FederationSchema;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::TypeDefinition;
use crate::schema::position::FieldDefinitionPosition;
use crate::schema::position::TypeDefinitionPosition;
use crate::schema::values::collect_variables;
use crate::schema::values::is_valid_input_value;

fn invalid_selection(message: String) -> FederationError {
    SingleFederationError::InvalidSelection { message }.into()
}

/// What a field selection asks for, before it is resolved against a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    pub parent_type: Name,
    pub name: Name,
    pub alias: Option<Name>,
    pub arguments: Vec<Node<ast::Argument>>,
    pub directives: DirectiveList,
}

impl FieldData {
    pub fn new(parent_type: Name, name: Name) -> Self {
        Self {
            parent_type,
            name,
            alias: None,
            arguments: Vec::new(),
            directives: DirectiveList::new(),
        }
    }

    pub fn with_alias(mut self, alias: Name) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn with_argument(mut self, name: Name, value: ast::Value) -> Self {
        self.arguments.push(Node::new(ast::Argument {
            name,
            value: Node::new(value),
        }));
        self
    }

    pub fn with_directives(mut self, directives: DirectiveList) -> Self {
        self.directives = directives;
        self
    }
}

/// A field element resolved against a schema: the field exists on its parent type and its
/// arguments are valid for the field definition.
#[derive(Debug, Clone)]
pub struct Field {
    data: FieldData,
    output_type: ast::Type,
    output_is_composite: bool,
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Field {}

impl Field {
    /// Resolves `data` against `schema`.
    ///
    /// Required arguments must be supplied and every supplied value must be valid for the declared
    /// argument type. A `null` given for an argument the field does not declare is dropped, any
    /// other undeclared argument is an error. Variables used by the arguments or directives must be
    /// among `variables`.
    pub fn new(
        schema: &FederationSchema,
        data: FieldData,
        variables: &[Node<ast::VariableDefinition>],
    ) -> Result<Self, FederationError> {
        let field = Self::resolve(schema, data)?;
        let undeclared = field
            .used_variables()
            .into_iter()
            .find(|used| !variables.iter().any(|variable| variable.name == **used));
        if let Some(variable) = undeclared {
            return Err(invalid_selection(format!(
                "Variable \"${variable}\" used in \"{field}\" is not declared"
            )));
        }
        Ok(field)
    }

    /// Resolves `data` against `schema` without checking variable declarations.
    pub(crate) fn resolve(
        schema: &FederationSchema,
        mut data: FieldData,
    ) -> Result<Self, FederationError> {
        let parent = TypeDefinitionPosition::new(data.parent_type.clone());
        let parent_type = parent.try_get(schema).ok_or_else(|| {
            SingleFederationError::UnknownReference {
                message: format!("Cannot find type \"{parent}\" in schema"),
            }
        })?;
        if !parent_type.is_composite() {
            return Err(invalid_selection(format!(
                "Cannot select field \"{}\" on non-composite type \"{parent}\"",
                data.name
            )));
        }

        let no_arguments = IndexMap::new();
        let (argument_definitions, output_type) = if data.name == TYPENAME_FIELD {
            (
                &no_arguments,
                ast::Type::NonNullNamed(apollo_compiler::name!("String")),
            )
        } else {
            let position = parent.field(data.name.clone());
            let Some(definition) = position.try_get(schema) else {
                return Err(invalid_selection(format!(
                    "Cannot query field \"{}\" on type \"{parent}\"",
                    data.name
                )));
            };
            let Some(ty) = definition.ty.clone() else {
                return Err(invalid_selection(format!(
                    "Field \"{position}\" has no type in schema"
                )));
            };
            (&definition.arguments, ty)
        };

        data.arguments = check_arguments(schema, &data, argument_definitions)?;
        sort_arguments(&mut data.arguments);
        let output_is_composite = schema
            .type_definition(output_type.inner_named_type())
            .is_some_and(TypeDefinition::is_composite);
        Ok(Self {
            data,
            output_type,
            output_is_composite,
        })
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    pub fn name(&self) -> &Name {
        &self.data.name
    }

    pub fn alias(&self) -> Option<&Name> {
        self.data.alias.as_ref()
    }

    /// The key of this field in a response: its alias if it has one, its name otherwise.
    pub fn response_name(&self) -> &Name {
        self.data.alias.as_ref().unwrap_or(&self.data.name)
    }

    pub fn parent_type(&self) -> &Name {
        &self.data.parent_type
    }

    pub fn arguments(&self) -> &[Node<ast::Argument>] {
        &self.data.arguments
    }

    pub fn directives(&self) -> &DirectiveList {
        &self.data.directives
    }

    pub fn output_type(&self) -> &ast::Type {
        &self.output_type
    }

    pub fn is_leaf(&self) -> bool {
        !self.output_is_composite
    }

    /// The schema field this selects, `None` for `__typename`.
    pub fn field_position(&self) -> Option<FieldDefinitionPosition> {
        (self.data.name != TYPENAME_FIELD).then(|| {
            TypeDefinitionPosition::new(self.data.parent_type.clone()).field(self.data.name.clone())
        })
    }

    pub(crate) fn used_variables(&self) -> Vec<&Name> {
        let mut variables = Vec::new();
        for argument in &self.data.arguments {
            collect_variables(&argument.value, &mut variables);
        }
        for directive in self.data.directives.iter() {
            for argument in &directive.arguments {
                collect_variables(&argument.value, &mut variables);
            }
        }
        variables
    }

    /// The same field selected from `parent_type` instead.
    pub(crate) fn rebase_on(
        &self,
        schema: &FederationSchema,
        parent_type: &Name,
    ) -> Result<Self, FederationError> {
        if self.data.parent_type == *parent_type {
            return Ok(self.clone());
        }
        Self::resolve(
            schema,
            FieldData {
                parent_type: parent_type.clone(),
                ..self.data.clone()
            },
        )
    }

    pub(crate) fn to_ast(&self, selection_set: Vec<ast::Selection>) -> ast::Field {
        ast::Field {
            alias: self.data.alias.clone(),
            name: self.data.name.clone(),
            arguments: self.data.arguments.clone(),
            directives: self.data.directives.to_ast(),
            selection_set,
        }
    }
}

fn check_arguments(
    schema: &FederationSchema,
    data: &FieldData,
    definitions: &IndexMap<Name, InputValueDefinition>,
) -> Result<Vec<Node<ast::Argument>>, FederationError> {
    let coordinate = format!("{}.{}", data.parent_type, data.name);
    let mut arguments = Vec::with_capacity(data.arguments.len());
    for argument in &data.arguments {
        if arguments
            .iter()
            .any(|other: &Node<ast::Argument>| other.name == argument.name)
        {
            return Err(invalid_selection(format!(
                "Argument \"{}\" is given more than once to field \"{coordinate}\"",
                argument.name
            )));
        }
        match definitions.get(&argument.name) {
            None if matches!(*argument.value, ast::Value::Null) => continue,
            None => {
                return Err(invalid_selection(format!(
                    "Unknown argument \"{}\" given to field \"{coordinate}\"",
                    argument.name
                )));
            }
            Some(definition) => {
                let valid = definition
                    .ty
                    .as_ref()
                    .is_some_and(|ty| is_valid_input_value(schema, &argument.value, ty));
                if !valid {
                    return Err(invalid_selection(format!(
                        "Invalid value {} for argument \"{}\" of field \"{coordinate}\"",
                        argument.value, argument.name
                    )));
                }
            }
        }
        arguments.push(argument.clone());
    }
    let missing = definitions.values().find(|definition| {
        definition.is_required()
            && !arguments
                .iter()
                .any(|argument| argument.name == definition.name)
    });
    if let Some(missing) = missing {
        return Err(invalid_selection(format!(
            "Missing value for required argument \"{}\" of field \"{coordinate}\"",
            missing.name
        )));
    }
    Ok(arguments)
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.data.alias {
            write!(f, "{alias}: ")?;
        }
        write!(f, "{}", self.data.name)?;
        if !self.data.arguments.is_empty() {
            write!(
                f,
                "({})",
                self.data
                    .arguments
                    .iter()
                    .map(|argument| format!("{}: {}", argument.name, argument.value))
                    .join(", ")
            )?;
        }
        write!(f, "{}", self.data.directives)
    }
}

/// A field together with its sub-selections. Leaf fields have none.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub field: Field,
    pub selection_set: Option<SelectionSet>,
}

impl FieldSelection {
    /// A selection of `field`, with an empty sub-selection set if the field is not a leaf.
    pub fn new(field: Field) -> Self {
        let selection_set = (!field.is_leaf())
            .then(|| SelectionSet::new(field.output_type().inner_named_type().clone()));
        Self {
            field,
            selection_set,
        }
    }

    pub fn with_selection_set(field: Field, selection_set: Option<SelectionSet>) -> Self {
        Self {
            field,
            selection_set,
        }
    }
}

impl fmt::Display for FieldSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field)?;
        if let Some(selection_set) = &self.selection_set {
            write!(f, " {selection_set}")?;
        }
        Ok(())
    }
}
