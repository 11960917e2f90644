use std::cmp::Ordering;
use std::fmt;

use apollo_compiler::Node;
use apollo_compiler::ast;
use itertools::Itertools;

/// Directive applications of a selection.
///
/// Arguments of each directive are sorted by name on construction, and equality ignores the order
/// in which directives are applied: two lists are equal when they hold the same directives with
/// deep-equal arguments.
#[derive(Debug, Clone, Default)]
pub struct DirectiveList {
    // Mutable access should not be handed out because `sort_order` may get out of sync.
    inner: Vec<Node<ast::Directive>>,
    sort_order: Vec<usize>,
}

pub(crate) fn sort_arguments(arguments: &mut [Node<ast::Argument>]) {
    arguments.sort_by(|left, right| left.name.cmp(&right.name));
}

/// Orders sorted argument lists by name, then by the printed value.
pub(crate) fn compare_sorted_arguments(
    left: &[Node<ast::Argument>],
    right: &[Node<ast::Argument>],
) -> Ordering {
    left.len().cmp(&right.len()).then_with(|| {
        left.iter()
            .zip(right)
            .map(|(left, right)| {
                left.name
                    .cmp(&right.name)
                    .then_with(|| left.value.to_string().cmp(&right.value.to_string()))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

impl PartialEq for DirectiveList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().zip(other.iter()).all(|(left, right)| {
                left.name == right.name
                    && left.arguments.len() == right.arguments.len()
                    && left
                        .arguments
                        .iter()
                        .zip(&right.arguments)
                        .all(|(left, right)| left.name == right.name && left.value == right.value)
            })
    }
}

impl Eq for DirectiveList {}

impl From<Vec<Node<ast::Directive>>> for DirectiveList {
    fn from(mut directives: Vec<Node<ast::Directive>>) -> Self {
        for directive in directives.iter_mut() {
            sort_arguments(&mut directive.make_mut().arguments);
        }
        let sort_order = (0..directives.len())
            .sorted_by(|left, right| {
                let left = &directives[*left];
                let right = &directives[*right];
                left.name
                    .cmp(&right.name)
                    .then_with(|| compare_sorted_arguments(&left.arguments, &right.arguments))
            })
            .collect();
        Self {
            inner: directives,
            sort_order,
        }
    }
}

impl From<&ast::DirectiveList> for DirectiveList {
    fn from(directives: &ast::DirectiveList) -> Self {
        Self::from(directives.0.clone())
    }
}

impl FromIterator<Node<ast::Directive>> for DirectiveList {
    fn from_iter<T: IntoIterator<Item = Node<ast::Directive>>>(iter: T) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl DirectiveList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Directives in sorted order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Node<ast::Directive>> {
        self.sort_order.iter().map(|index| &self.inner[*index])
    }

    /// Directives in the order they were applied.
    pub fn iter_original_order(&self) -> impl ExactSizeIterator<Item = &Node<ast::Directive>> {
        self.inner.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Node<ast::Directive>> {
        self.inner.iter().find(|directive| directive.name == name)
    }

    pub(crate) fn to_ast(&self) -> ast::DirectiveList {
        ast::DirectiveList(self.inner.clone())
    }
}

impl fmt::Display for DirectiveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for directive in self.iter_original_order() {
            write!(f, " @{}", directive.name)?;
            if !directive.arguments.is_empty() {
                write!(
                    f,
                    "({})",
                    directive
                        .arguments
                        .iter()
                        .map(|argument| format!("{}: {}", argument.name, argument.value))
                        .join(", ")
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    fn directive(name: apollo_compiler::Name, arguments: &[(&str, ast::Value)]) -> Node<ast::Directive> {
        Node::new(ast::Directive {
            name,
            arguments: arguments
                .iter()
                .map(|(name, value)| {
                    Node::new(ast::Argument {
                        name: apollo_compiler::Name::new(name).unwrap(),
                        value: Node::new(value.clone()),
                    })
                })
                .collect(),
        })
    }

    #[test]
    fn equality_ignores_application_and_argument_order() {
        let left: DirectiveList = [
            directive(name!("skip"), &[("if", ast::Value::Boolean(true))]),
            directive(
                name!("custom"),
                &[("a", ast::Value::Int(1.into())), ("b", ast::Value::Int(2.into()))],
            ),
        ]
        .into_iter()
        .collect();
        let right: DirectiveList = [
            directive(
                name!("custom"),
                &[("b", ast::Value::Int(2.into())), ("a", ast::Value::Int(1.into()))],
            ),
            directive(name!("skip"), &[("if", ast::Value::Boolean(true))]),
        ]
        .into_iter()
        .collect();
        assert_eq!(left, right);
        assert_eq!(right.to_string(), " @custom(a: 1, b: 2) @skip(if: true)");
    }

    #[test]
    fn different_arguments_are_different_lists() {
        let left: DirectiveList = [directive(name!("skip"), &[("if", ast::Value::Boolean(true))])]
            .into_iter()
            .collect();
        let right: DirectiveList = [directive(name!("skip"), &[("if", ast::Value::Boolean(false))])]
            .into_iter()
            .collect();
        assert_ne!(left, right);
        assert_ne!(left, DirectiveList::new());
    }
}
