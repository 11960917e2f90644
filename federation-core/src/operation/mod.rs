//! Operations and selection sets resolved against a [`FederationSchema`].
//!
//! ## Selection types
//! Each "conceptual" type consists of up to three actual types: a data type, an "element"
//! type, and a selection type.
//! - The data type records what is asked for, like a field name and its arguments. It can be
//!   constructed and modified with plain rust.
//! - The element type is the data resolved against a schema. Constructing one checks it.
//! - The selection type contains the element type and, for composite fields and fragments, a
//!   subselection.
//!
//! For example, for fields, the data type is [`FieldData`], the element type is
//! [`Field`], and the selection type is [`FieldSelection`].
//!
//! Named fragments are not kept: spreads are expanded into inline fragments when an operation is
//! parsed.

use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::schema::FederationSchema;
use crate::schema::definitions::SchemaRootDefinitionKind;
use crate::schema::values::collect_variables;

mod directive_list;
mod field;
mod fragment;
mod merging;
mod paths;
mod rebase;
mod selection_map;
#[cfg(test)]
mod tests;

pub use directive_list::DirectiveList;
pub use field::Field;
pub use field::FieldData;
pub use field::FieldSelection;
pub use fragment::FragmentElement;
pub use fragment::InlineFragmentSelection;
pub use paths::OperationPath;
pub use selection_map::SelectionKey;
use selection_map::SelectionMap;

pub(crate) const TYPENAME_FIELD: Name = name!("__typename");

fn invalid_selection(message: String) -> FederationError {
    SingleFederationError::InvalidSelection { message }.into()
}

/// One entry of a selection set.
#[derive(Debug, Clone, PartialEq, derive_more::From)]
pub enum Selection {
    Field(FieldSelection),
    InlineFragment(InlineFragmentSelection),
}

impl Selection {
    /// The key this selection is grouped under in a [`SelectionSet`].
    pub fn key(&self) -> SelectionKey {
        match self {
            Selection::Field(selection) => SelectionKey::Field {
                response_name: selection.field.response_name().clone(),
            },
            Selection::InlineFragment(selection) => SelectionKey::InlineFragment {
                type_condition: selection.fragment.type_condition().cloned(),
            },
        }
    }

    pub fn parent_type(&self) -> &Name {
        match self {
            Selection::Field(selection) => selection.field.parent_type(),
            Selection::InlineFragment(selection) => selection.fragment.parent_type(),
        }
    }

    pub fn directives(&self) -> &DirectiveList {
        match self {
            Selection::Field(selection) => selection.field.directives(),
            Selection::InlineFragment(selection) => selection.fragment.directives(),
        }
    }

    pub fn element(&self) -> OperationElement {
        match self {
            Selection::Field(selection) => OperationElement::Field(selection.field.clone()),
            Selection::InlineFragment(selection) => {
                OperationElement::InlineFragment(selection.fragment.clone())
            }
        }
    }

    pub fn selection_set(&self) -> Option<&SelectionSet> {
        match self {
            Selection::Field(selection) => selection.selection_set.as_ref(),
            Selection::InlineFragment(selection) => Some(&selection.selection_set),
        }
    }

    fn collect_variables<'a>(&'a self, variables: &mut Vec<&'a Name>) {
        match self {
            Selection::Field(selection) => variables.extend(selection.field.used_variables()),
            Selection::InlineFragment(selection) => {
                for directive in selection.fragment.directives().iter() {
                    for argument in &directive.arguments {
                        collect_variables(&argument.value, variables);
                    }
                }
            }
        }
        if let Some(selection_set) = self.selection_set() {
            for selection in selection_set.iter() {
                selection.collect_variables(variables);
            }
        }
    }

    fn to_ast(&self) -> ast::Selection {
        match self {
            Selection::Field(selection) => {
                let selection_set = selection
                    .selection_set
                    .as_ref()
                    .map(SelectionSet::to_ast)
                    .unwrap_or_default();
                ast::Selection::Field(Node::new(selection.field.to_ast(selection_set)))
            }
            Selection::InlineFragment(selection) => ast::Selection::InlineFragment(Node::new(
                selection.fragment.to_ast(selection.selection_set.to_ast()),
            )),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Field(selection) => fmt::Display::fmt(selection, f),
            Selection::InlineFragment(selection) => fmt::Display::fmt(selection, f),
        }
    }
}

/// A selection without its sub-selections: one step of an [`OperationPath`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From)]
pub enum OperationElement {
    Field(Field),
    InlineFragment(FragmentElement),
}

impl fmt::Display for OperationElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationElement::Field(field) => fmt::Display::fmt(field, f),
            OperationElement::InlineFragment(fragment) => fmt::Display::fmt(fragment, f),
        }
    }
}

/// The selections made on one parent type.
///
/// Equality is structural: two sets are equal when they have the same parent type and each
/// selection of one has an equal selection, sub-selections included, in the other. The order in
/// which selections were added does not matter.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    pub(crate) parent_type: Name,
    pub(crate) selections: SelectionMap,
}

impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.parent_type == other.parent_type
            && self.len() == other.len()
            && self.iter().all(|selection| {
                other
                    .selections
                    .get(&selection.key())
                    .iter()
                    .any(|other| other == selection)
            })
    }
}

impl SelectionSet {
    pub fn new(parent_type: Name) -> Self {
        Self {
            parent_type,
            selections: SelectionMap::new(),
        }
    }

    pub fn parent_type(&self) -> &Name {
        &self.parent_type
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Selections in the order their keys were first added.
    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.selections.iter()
    }

    /// The selections stored under `key`, one per distinct directive set.
    pub fn get(&self, key: &SelectionKey) -> &[Selection] {
        self.selections.get(key)
    }

    pub(crate) fn into_selections(self) -> Vec<Selection> {
        self.selections.iter().cloned().collect()
    }

    /// Every variable referenced by arguments of fields or directives in this set, at any depth.
    pub fn used_variables(&self) -> IndexSet<Name> {
        let mut variables = Vec::new();
        for selection in self.iter() {
            selection.collect_variables(&mut variables);
        }
        variables.into_iter().cloned().collect()
    }

    /// Checks that this set is not empty, that every composite field has a non-empty
    /// sub-selection and that no leaf field has one.
    pub fn validate(&self) -> Result<(), FederationError> {
        if self.is_empty() {
            return Err(invalid_selection(format!(
                "A selection set on type \"{}\" must select at least one field",
                self.parent_type
            )));
        }
        for selection in self.iter() {
            match selection {
                Selection::Field(selection) => {
                    let field = &selection.field;
                    match (&selection.selection_set, field.is_leaf()) {
                        (Some(_), true) => {
                            return Err(invalid_selection(format!(
                                "Leaf field \"{field}\" of type \"{}\" cannot have a selection set",
                                field.output_type()
                            )));
                        }
                        (None, false) => {
                            return Err(invalid_selection(format!(
                                "Field \"{field}\" of type \"{}\" must have a selection of subfields",
                                field.output_type()
                            )));
                        }
                        (Some(selection_set), false) => selection_set.validate()?,
                        (None, true) => {}
                    }
                }
                Selection::InlineFragment(selection) => selection.selection_set.validate()?,
            }
        }
        Ok(())
    }

    /// Builds the selections of `selections`, made on `parent_type`.
    ///
    /// Fragment spreads are replaced by inline fragments on the spread fragment's type condition.
    /// `visiting` holds the fragments being expanded, to detect cycles.
    pub(crate) fn from_ast(
        schema: &FederationSchema,
        parent_type: &Name,
        selections: &[ast::Selection],
        fragments: &IndexMap<Name, Node<ast::FragmentDefinition>>,
        variables: &[Node<ast::VariableDefinition>],
        visiting: &mut Vec<Name>,
    ) -> Result<Self, FederationError> {
        let mut selection_set = SelectionSet::new(parent_type.clone());
        for selection in selections {
            let selection: Selection = match selection {
                ast::Selection::Field(field) => {
                    let data = FieldData {
                        parent_type: parent_type.clone(),
                        name: field.name.clone(),
                        alias: field.alias.clone(),
                        arguments: field.arguments.clone(),
                        directives: DirectiveList::from(&field.directives),
                    };
                    let resolved = Field::new(schema, data, variables)?;
                    if resolved.is_leaf() && !field.selection_set.is_empty() {
                        return Err(invalid_selection(format!(
                            "Leaf field \"{resolved}\" of type \"{}\" cannot have a selection set",
                            resolved.output_type()
                        )));
                    }
                    if resolved.is_leaf() {
                        FieldSelection::new(resolved).into()
                    } else {
                        let sub_selections = SelectionSet::from_ast(
                            schema,
                            resolved.output_type().inner_named_type(),
                            &field.selection_set,
                            fragments,
                            variables,
                            visiting,
                        )?;
                        FieldSelection::with_selection_set(resolved, Some(sub_selections)).into()
                    }
                }
                ast::Selection::InlineFragment(inline) => {
                    let fragment = FragmentElement::new(
                        schema,
                        parent_type.clone(),
                        inline.type_condition.clone(),
                        DirectiveList::from(&inline.directives),
                    )?;
                    let sub_selections = SelectionSet::from_ast(
                        schema,
                        fragment.casted_type(),
                        &inline.selection_set,
                        fragments,
                        variables,
                        visiting,
                    )?;
                    InlineFragmentSelection {
                        fragment,
                        selection_set: sub_selections,
                    }
                    .into()
                }
                ast::Selection::FragmentSpread(spread) => {
                    let name = &spread.fragment_name;
                    let Some(definition) = fragments.get(name) else {
                        return Err(invalid_selection(format!("Unknown fragment \"{name}\"")));
                    };
                    if visiting.contains(name) {
                        return Err(invalid_selection(format!(
                            "Cannot spread fragment \"{name}\" within itself via {}",
                            visiting.iter().join(", ")
                        )));
                    }
                    let fragment = FragmentElement::new(
                        schema,
                        parent_type.clone(),
                        Some(definition.type_condition.clone()),
                        DirectiveList::from(&spread.directives),
                    )?;
                    visiting.push(name.clone());
                    let sub_selections = SelectionSet::from_ast(
                        schema,
                        fragment.casted_type(),
                        &definition.selection_set,
                        fragments,
                        variables,
                        visiting,
                    );
                    visiting.pop();
                    InlineFragmentSelection {
                        fragment,
                        selection_set: sub_selections?,
                    }
                    .into()
                }
            };
            selection_set.add(selection)?;
        }
        Ok(selection_set)
    }

    pub(crate) fn to_ast(&self) -> Vec<ast::Selection> {
        self.iter().map(Selection::to_ast).collect()
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ {} }}", self.iter().join(" "))
    }
}

/// An executable operation on one of the schema roots.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub(crate) root_kind: SchemaRootDefinitionKind,
    pub(crate) name: Option<Name>,
    pub(crate) variables: Vec<Node<ast::VariableDefinition>>,
    pub(crate) directives: DirectiveList,
    pub(crate) selection_set: SelectionSet,
}

impl Operation {
    /// Parses `source` and builds the operation named `operation_name`, or the only operation of
    /// the document when no name is given.
    pub fn parse(
        schema: &FederationSchema,
        source: &str,
        operation_name: Option<&str>,
    ) -> Result<Self, FederationError> {
        let document = ast::Document::parse(source, "operation.graphql").map_err(|e| {
            SingleFederationError::InvalidGraphQL {
                message: e.errors.to_string(),
            }
        })?;
        let mut operations = Vec::new();
        let mut fragments = IndexMap::new();
        for definition in &document.definitions {
            match definition {
                ast::Definition::OperationDefinition(operation) => operations.push(operation),
                ast::Definition::FragmentDefinition(fragment) => {
                    if fragments
                        .insert(fragment.name.clone(), fragment.clone())
                        .is_some()
                    {
                        return Err(SingleFederationError::InvalidGraphQL {
                            message: format!(
                                "There can be only one fragment named \"{}\"",
                                fragment.name
                            ),
                        }
                        .into());
                    }
                }
                _ => {
                    return Err(SingleFederationError::InvalidGraphQL {
                        message: "Type system definitions are not allowed in an operation"
                            .to_owned(),
                    }
                    .into());
                }
            }
        }
        let operation = match operation_name {
            Some(operation_name) => operations
                .into_iter()
                .find(|operation| {
                    operation
                        .name
                        .as_ref()
                        .is_some_and(|name| name.as_str() == operation_name)
                })
                .ok_or_else(|| {
                    invalid_selection(format!("No operation named \"{operation_name}\""))
                })?,
            None => match operations.as_slice() {
                [operation] => *operation,
                [] => return Err(invalid_selection("The document has no operation".to_owned())),
                _ => {
                    return Err(invalid_selection(
                        "An operation name is required when the document has several operations"
                            .to_owned(),
                    ));
                }
            },
        };

        let root_kind = SchemaRootDefinitionKind::from(operation.operation_type);
        let Some(root_type) = schema.root_type_name(root_kind) else {
            return Err(invalid_selection(format!(
                "Schema has no {root_kind} root type"
            )));
        };
        let selection_set = SelectionSet::from_ast(
            schema,
            root_type,
            &operation.selection_set,
            &fragments,
            &operation.variables,
            &mut Vec::new(),
        )?;
        let operation = Operation {
            root_kind,
            name: operation.name.clone(),
            variables: operation.variables.clone(),
            directives: DirectiveList::from(&operation.directives),
            selection_set,
        };
        operation.validate()?;
        Ok(operation)
    }

    /// An anonymous operation on `root_kind` with no variables.
    pub fn new(root_kind: SchemaRootDefinitionKind, selection_set: SelectionSet) -> Self {
        Self {
            root_kind,
            name: None,
            variables: Vec::new(),
            directives: DirectiveList::new(),
            selection_set,
        }
    }

    pub fn root_kind(&self) -> SchemaRootDefinitionKind {
        self.root_kind
    }

    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    pub fn variables(&self) -> &[Node<ast::VariableDefinition>] {
        &self.variables
    }

    pub fn selection_set(&self) -> &SelectionSet {
        &self.selection_set
    }

    /// Checks the selection set and that every variable it uses is declared.
    pub fn validate(&self) -> Result<(), FederationError> {
        self.selection_set.validate()?;
        let mut used = self.selection_set.used_variables();
        for directive in self.directives.iter() {
            let mut variables = Vec::new();
            for argument in &directive.arguments {
                collect_variables(&argument.value, &mut variables);
            }
            used.extend(variables.into_iter().cloned());
        }
        if let Some(undeclared) = used
            .iter()
            .find(|used| !self.variables.iter().any(|variable| variable.name == **used))
        {
            return Err(invalid_selection(format!(
                "Variable \"${undeclared}\" is not declared by the operation"
            )));
        }
        Ok(())
    }

    pub(crate) fn to_ast(&self) -> ast::OperationDefinition {
        ast::OperationDefinition {
            operation_type: self.root_kind.into(),
            name: self.name.clone(),
            variables: self.variables.clone(),
            directives: self.directives.to_ast(),
            selection_set: self.selection_set.to_ast(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut document = ast::Document::new();
        document
            .definitions
            .push(ast::Definition::OperationDefinition(Node::new(self.to_ast())));
        fmt::Display::fmt(&document, f)
    }
}
