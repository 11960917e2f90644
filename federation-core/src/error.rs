use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write as _;

/// Create an internal error.
///
/// # Example
/// ```rust
/// use federation_core::internal_error;
/// use federation_core::error::FederationError;
/// # fn may_be_none() -> Option<()> { None }
///
/// const NAME: &str = "the thing";
/// let result: Result<(), FederationError> = may_be_none()
///     .ok_or_else(|| internal_error!("Expected {NAME} to be Some"));
/// ```
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::FederationError::internal(format!( $( $arg )+ ))
    }
}

/// Break out of the current function, returning an internal error.
///
/// # Example
/// ```rust
/// use federation_core::bail;
/// use federation_core::error::FederationError;
/// # fn may_be_none() -> Option<()> { None }
///
/// fn example() -> Result<(), FederationError> {
///     bail!("Something went horribly wrong");
///     unreachable!()
/// }
/// #
/// # _ = example();
/// ```
#[macro_export]
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::internal_error!( $( $arg )+ ).into())
    }
}

/// A safe assertion: in debug mode, it panics on failure, and in production, it returns an
/// internal error.
///
/// Treat this as an assertion. It must only be used for conditions that *should never happen*
/// in normal operation.
#[macro_export]
macro_rules! ensure {
    ( $expr:expr, $( $arg:tt )+ ) => {
        #[cfg(debug_assertions)]
        {
            if false {
                return Err($crate::error::FederationError::internal("ensure!() must be used in a function that returns a Result").into());
            }
            assert!($expr, $( $arg )+);
        }

        #[cfg(not(debug_assertions))]
        if !$expr {
            $crate::bail!( $( $arg )+ );
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SingleFederationError {
    #[error(
        "An internal error has occurred, please report this bug.\n\nDetails: {message}"
    )]
    Internal { message: String },
    #[error("{message}")]
    InvalidGraphQL { message: String },
    /// An element was attached to the wrong schema or parent, a name was registered twice, or a
    /// built-in was modified outside of the schema bootstrap.
    #[error("{message}")]
    InvalidAttachment { message: String },
    /// A type, directive or interface name could not be resolved.
    #[error("{message}")]
    UnknownReference { message: String },
    /// A field or fragment selection is invalid against the schema.
    #[error("{message}")]
    InvalidSelection { message: String },
    /// The supergraph lacks the join feature or declares an unsupported version of it.
    #[error("{message}")]
    InvalidFederationSupergraph { message: String },
    /// A field named by a `@key`/`@requires`/`@provides` field set exists in neither the
    /// subgraph nor the supergraph.
    #[error("{message}")]
    UnresolvableFieldSet { message: String },
    #[error("{message}")]
    UnsupportedFeature { message: String },
    #[error("[{subgraph}] {message}")]
    InvalidSubgraph { subgraph: String, message: String },
}

impl SingleFederationError {
    pub fn code(&self) -> &'static str {
        match self {
            SingleFederationError::Internal { .. } => "INTERNAL",
            SingleFederationError::InvalidGraphQL { .. } => "INVALID_GRAPHQL",
            SingleFederationError::InvalidAttachment { .. } => "INVALID_ATTACHMENT",
            SingleFederationError::UnknownReference { .. } => "UNKNOWN_REFERENCE",
            SingleFederationError::InvalidSelection { .. } => "INVALID_SELECTION",
            SingleFederationError::InvalidFederationSupergraph { .. } => {
                "INVALID_FEDERATION_SUPERGRAPH"
            }
            SingleFederationError::UnresolvableFieldSet { .. } => "UNRESOLVABLE_FIELD_SET",
            SingleFederationError::UnsupportedFeature { .. } => "UNSUPPORTED_FEATURE",
            SingleFederationError::InvalidSubgraph { .. } => "INVALID_SUBGRAPH",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, Default)]
pub struct MultipleFederationErrors {
    pub errors: Vec<SingleFederationError>,
}

impl MultipleFederationErrors {
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    pub fn push(&mut self, error: FederationError) {
        match error {
            FederationError::SingleFederationError(error) => {
                self.errors.push(error);
            }
            FederationError::MultipleFederationErrors(errors) => {
                self.errors.extend(errors.errors);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_result(self) -> Result<(), FederationError> {
        match self.errors.len().cmp(&1) {
            std::cmp::Ordering::Less => Ok(()),
            std::cmp::Ordering::Equal => Err(self.errors[0].clone().into()),
            std::cmp::Ordering::Greater => Err(self.into()),
        }
    }
}

impl Display for MultipleFederationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "The following errors occurred:")?;
        for error in &self.errors {
            write!(f, "\n  - ")?;
            for c in error.to_string().chars() {
                if c == '\n' {
                    write!(f, "\n    ")?;
                } else {
                    f.write_char(c)?;
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<SingleFederationError> for MultipleFederationErrors {
    fn from_iter<T: IntoIterator<Item = SingleFederationError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, thiserror::Error)]
pub enum FederationError {
    #[error(transparent)]
    SingleFederationError(#[from] SingleFederationError),
    #[error(transparent)]
    MultipleFederationErrors(#[from] MultipleFederationErrors),
}

impl Debug for FederationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleFederationError(inner) => Debug::fmt(inner, f),
            Self::MultipleFederationErrors(inner) => Debug::fmt(inner, f),
        }
    }
}

impl FederationError {
    pub fn internal(message: impl Into<String>) -> Self {
        SingleFederationError::Internal {
            message: message.into(),
        }
        .into()
    }

    /// Flattens this error into its individual errors.
    pub fn errors(&self) -> Vec<&SingleFederationError> {
        match self {
            FederationError::SingleFederationError(e) => vec![e],
            FederationError::MultipleFederationErrors(e) => e.errors.iter().collect(),
        }
    }

    pub(crate) fn into_errors(self) -> Vec<SingleFederationError> {
        match self {
            FederationError::SingleFederationError(e) => vec![e],
            FederationError::MultipleFederationErrors(e) => e.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_errors_render_as_a_list() {
        let errors = MultipleFederationErrors::from_iter([
            SingleFederationError::UnknownReference {
                message: "Unknown type \"Foo\"".to_owned(),
            },
            SingleFederationError::InvalidSubgraph {
                subgraph: "accounts".to_owned(),
                message: "first line\nsecond line".to_owned(),
            },
        ]);
        insta::assert_snapshot!(errors.to_string(), @r###"
        The following errors occurred:
          - Unknown type "Foo"
          - [accounts] first line
            second line
        "###);
    }

    #[test]
    fn single_error_results_are_not_wrapped() {
        let mut errors = MultipleFederationErrors::new();
        errors.push(FederationError::internal("boom"));
        let error = errors.into_result().expect_err("one error was pushed");
        assert!(matches!(error, FederationError::SingleFederationError(_)));
        assert_eq!(error.errors()[0].code(), "INTERNAL");
    }
}
