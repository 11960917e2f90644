use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::ast;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::operation::DirectiveList;
use crate::operation::SelectionSet;
use crate::schema::FederationSchema;

/// An inline fragment element: `... on Condition @directives`, or `... @directives` when the
/// fragment has no type condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentElement {
    parent_type: Name,
    type_condition: Option<Name>,
    directives: DirectiveList,
}

impl FragmentElement {
    /// Checks that the type condition is a composite type that can overlap with `parent_type` at
    /// runtime.
    pub fn new(
        schema: &FederationSchema,
        parent_type: Name,
        type_condition: Option<Name>,
        directives: DirectiveList,
    ) -> Result<Self, FederationError> {
        let parent = schema.type_definition(&parent_type).ok_or_else(|| {
            SingleFederationError::UnknownReference {
                message: format!("Cannot find type \"{parent_type}\" in schema"),
            }
        })?;
        if !parent.is_composite() {
            return Err(SingleFederationError::InvalidSelection {
                message: format!(
                    "Cannot use a fragment on non-composite type \"{parent_type}\""
                ),
            }
            .into());
        }
        if let Some(condition) = &type_condition {
            let applies = schema
                .type_definition(condition)
                .is_some_and(|condition| condition.is_composite())
                && (*condition == parent_type
                    || schema
                        .possible_runtime_types(condition)
                        .iter()
                        .any(|runtime_type| {
                            schema.possible_runtime_types(&parent_type).contains(runtime_type)
                        }));
            if !applies {
                return Err(SingleFederationError::InvalidSelection {
                    message: format!(
                        "Fragment on \"{condition}\" can never apply to type \"{parent_type}\""
                    ),
                }
                .into());
            }
        }
        Ok(Self {
            parent_type,
            type_condition,
            directives,
        })
    }

    pub fn parent_type(&self) -> &Name {
        &self.parent_type
    }

    pub fn type_condition(&self) -> Option<&Name> {
        self.type_condition.as_ref()
    }

    /// The type its sub-selections are made on.
    pub fn casted_type(&self) -> &Name {
        self.type_condition.as_ref().unwrap_or(&self.parent_type)
    }

    pub fn directives(&self) -> &DirectiveList {
        &self.directives
    }

    pub(crate) fn rebase_on(
        &self,
        schema: &FederationSchema,
        parent_type: &Name,
    ) -> Result<Self, FederationError> {
        // Without a condition the fragment keeps selecting on its old parent type.
        let type_condition = self
            .type_condition
            .clone()
            .or_else(|| (self.parent_type != *parent_type).then(|| self.parent_type.clone()));
        Self::new(
            schema,
            parent_type.clone(),
            type_condition,
            self.directives.clone(),
        )
    }

    pub(crate) fn to_ast(&self, selection_set: Vec<ast::Selection>) -> ast::InlineFragment {
        ast::InlineFragment {
            type_condition: self.type_condition.clone(),
            directives: self.directives.to_ast(),
            selection_set,
        }
    }
}

impl fmt::Display for FragmentElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...")?;
        if let Some(condition) = &self.type_condition {
            write!(f, " on {condition}")?;
        }
        write!(f, "{}", self.directives)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragmentSelection {
    pub fragment: FragmentElement,
    pub selection_set: SelectionSet,
}

impl InlineFragmentSelection {
    /// A selection of `fragment` with no sub-selections yet.
    pub fn new(fragment: FragmentElement) -> Self {
        let selection_set = SelectionSet::new(fragment.casted_type().clone());
        Self {
            fragment,
            selection_set,
        }
    }
}

impl fmt::Display for InlineFragmentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fragment, self.selection_set)
    }
}
