//! Moving selections to a different parent type.

use apollo_compiler::Name;

use crate::error::FederationError;
use crate::operation::FieldSelection;
use crate::operation::InlineFragmentSelection;
use crate::operation::Selection;
use crate::operation::SelectionSet;
use crate::schema::FederationSchema;

impl Selection {
    fn rebase_on(
        &self,
        schema: &FederationSchema,
        parent_type: &Name,
    ) -> Result<Selection, FederationError> {
        match self {
            Selection::Field(selection) => {
                let field = selection.field.rebase_on(schema, parent_type)?;
                let selection_set = match &selection.selection_set {
                    Some(selection_set) => Some(
                        selection_set.rebase_on(field.output_type().inner_named_type(), schema)?,
                    ),
                    None => None,
                };
                Ok(FieldSelection::with_selection_set(field, selection_set).into())
            }
            Selection::InlineFragment(selection) => {
                let fragment = selection.fragment.rebase_on(schema, parent_type)?;
                let selection_set = selection
                    .selection_set
                    .rebase_on(fragment.casted_type(), schema)?;
                Ok(InlineFragmentSelection {
                    fragment,
                    selection_set,
                }
                .into())
            }
        }
    }
}

impl SelectionSet {
    /// A deep copy of this set, selected from `parent_type`.
    ///
    /// Every field is resolved again against its new parent, which fails if the parent has no
    /// such field.
    pub fn rebase_on(
        &self,
        parent_type: &Name,
        schema: &FederationSchema,
    ) -> Result<SelectionSet, FederationError> {
        let mut rebased = SelectionSet::new(parent_type.clone());
        for selection in self.iter() {
            rebased.add(selection.rebase_on(schema, parent_type)?)?;
        }
        Ok(rebased)
    }
}
