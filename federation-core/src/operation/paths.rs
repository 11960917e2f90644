//! Conversion between selection trees and flat lists of root-to-leaf element paths.

use crate::error::FederationError;
use crate::operation::FieldSelection;
use crate::operation::InlineFragmentSelection;
use crate::operation::OperationElement;
use crate::operation::Selection;
use crate::operation::SelectionSet;

/// A sequence of elements leading from a selection set to one of its leaves.
pub type OperationPath = Vec<OperationElement>;

impl SelectionSet {
    /// Every root-to-leaf path of this set. An empty set has a single empty path, so a field
    /// with an empty sub-selection ends a path.
    pub fn to_operation_paths(&self) -> Vec<OperationPath> {
        if self.is_empty() {
            return vec![Vec::new()];
        }
        let mut paths = Vec::new();
        for selection in self.iter() {
            let (element, selection_set) = match selection {
                Selection::Field(selection) => (
                    OperationElement::Field(selection.field.clone()),
                    selection.selection_set.as_ref(),
                ),
                Selection::InlineFragment(selection) => (
                    OperationElement::InlineFragment(selection.fragment.clone()),
                    Some(&selection.selection_set),
                ),
            };
            match selection_set {
                None => paths.push(vec![element]),
                Some(selection_set) => {
                    for sub_path in selection_set.to_operation_paths() {
                        let mut path = Vec::with_capacity(sub_path.len() + 1);
                        path.push(element.clone());
                        path.extend(sub_path);
                        paths.push(path);
                    }
                }
            }
        }
        paths
    }

    /// Adds the selections of `path`, merging with what is already selected. An empty path
    /// adds nothing.
    pub fn add_path(&mut self, path: &[OperationElement]) -> Result<(), FederationError> {
        let Some((element, rest)) = path.split_first() else {
            return Ok(());
        };
        let selection: Selection = match element {
            OperationElement::Field(field) => {
                let mut selection = FieldSelection::new(field.clone());
                if !rest.is_empty() {
                    let Some(selection_set) = &mut selection.selection_set else {
                        return Err(crate::error::SingleFederationError::InvalidSelection {
                            message: format!("Cannot select anything below leaf field \"{field}\""),
                        }
                        .into());
                    };
                    selection_set.add_path(rest)?;
                }
                selection.into()
            }
            OperationElement::InlineFragment(fragment) => {
                let mut selection = InlineFragmentSelection::new(fragment.clone());
                selection.selection_set.add_path(rest)?;
                selection.into()
            }
        };
        self.add(selection)
    }

    /// Builds a selection set from paths, the inverse of [`SelectionSet::to_operation_paths`].
    pub fn from_operation_paths<'a>(
        parent_type: apollo_compiler::Name,
        paths: impl IntoIterator<Item = &'a OperationPath>,
    ) -> Result<SelectionSet, FederationError> {
        let mut selection_set = SelectionSet::new(parent_type);
        for path in paths {
            selection_set.add_path(path)?;
        }
        Ok(selection_set)
    }
}
