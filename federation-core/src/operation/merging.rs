//! Adding selections to a set, merging those that select the same thing.

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::operation::FieldSelection;
use crate::operation::InlineFragmentSelection;
use crate::operation::Selection;
use crate::operation::SelectionSet;

impl SelectionSet {
    /// Adds `selection` to this set.
    ///
    /// An existing selection under the same key and with equal directives is the same selection:
    /// its element must equal the new one, and the sub-selections of both are merged. Otherwise
    /// the new selection becomes a distinct entry. On error the set is left unchanged.
    pub fn add(&mut self, selection: Selection) -> Result<(), FederationError> {
        if selection.parent_type() != &self.parent_type {
            return Err(SingleFederationError::InvalidSelection {
                message: format!(
                    "Cannot add selection \"{selection}\" of type \"{}\" to a selection set of type \"{}\"",
                    selection.parent_type(),
                    self.parent_type
                ),
            }
            .into());
        }
        let key = selection.key();
        let Some(entries) = self.selections.get_mut(&key) else {
            self.selections.push(selection);
            return Ok(());
        };
        let Some(existing) = entries
            .iter_mut()
            .find(|existing| existing.directives() == selection.directives())
        else {
            entries.push(selection);
            return Ok(());
        };
        *existing = merged(existing, selection)?;
        Ok(())
    }

    /// Adds every selection of `other`, which must have the same parent type.
    pub fn add_all(&mut self, other: SelectionSet) -> Result<(), FederationError> {
        let mut merged_set = self.clone();
        for selection in other.into_selections() {
            merged_set.add(selection)?;
        }
        *self = merged_set;
        Ok(())
    }
}

fn merged(existing: &Selection, selection: Selection) -> Result<Selection, FederationError> {
    match (existing, selection) {
        (Selection::Field(existing), Selection::Field(selection)) => {
            if existing.field != selection.field {
                return Err(SingleFederationError::InvalidSelection {
                    message: format!(
                        "Cannot merge \"{}\" with \"{}\": same response name, different meaning",
                        existing.field, selection.field
                    ),
                }
                .into());
            }
            let selection_set = match (&existing.selection_set, selection.selection_set) {
                (Some(existing), Some(other)) => {
                    let mut merged_set = existing.clone();
                    merged_set.add_all(other)?;
                    Some(merged_set)
                }
                (existing, other) => other.or_else(|| existing.clone()),
            };
            Ok(FieldSelection::with_selection_set(existing.field.clone(), selection_set).into())
        }
        (Selection::InlineFragment(existing), Selection::InlineFragment(selection)) => {
            if existing.fragment != selection.fragment {
                return Err(SingleFederationError::InvalidSelection {
                    message: format!(
                        "Cannot merge \"{}\" with \"{}\"",
                        existing.fragment, selection.fragment
                    ),
                }
                .into());
            }
            let mut selection_set = existing.selection_set.clone();
            selection_set.add_all(selection.selection_set)?;
            Ok(InlineFragmentSelection {
                fragment: existing.fragment.clone(),
                selection_set,
            }
            .into())
        }
        (_, selection) => Err(SingleFederationError::Internal {
            message: format!("Selection \"{selection}\" has a key of a different kind"),
        }
        .into()),
    }
}
