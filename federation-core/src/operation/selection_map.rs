use std::fmt;

use apollo_compiler::Name;
use indexmap::IndexMap;

use crate::operation::Selection;

/// A selection "key" (unrelated to the federation `@key` directive) groups the selections of a set
/// that may be merged with each other: fields by response name, inline fragments by type
/// condition.
///
/// Within one key, selections are only merged when they carry equal directives. Selections with
/// different directives under the same key coexist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SelectionKey {
    Field {
        /// The field alias (if specified) or field name in the resulting selection set.
        response_name: Name,
    },
    InlineFragment {
        /// The optional type condition of the fragment.
        type_condition: Option<Name>,
    },
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKey::Field { response_name } => write!(f, "{response_name}"),
            SelectionKey::InlineFragment {
                type_condition: Some(type_condition),
            } => write!(f, "... on {type_condition}"),
            SelectionKey::InlineFragment {
                type_condition: None,
            } => write!(f, "..."),
        }
    }
}

/// Selections of a set, grouped by key in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectionMap(IndexMap<SelectionKey, Vec<Selection>>);

impl SelectionMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub(crate) fn get(&self, key: &SelectionKey) -> &[Selection] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn get_mut(&mut self, key: &SelectionKey) -> Option<&mut Vec<Selection>> {
        self.0.get_mut(key)
    }

    /// Appends `selection` as a distinct entry under its key.
    pub(crate) fn push(&mut self, selection: Selection) {
        self.0.entry(selection.key()).or_default().push(selection);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.0.values().flatten()
    }
}
