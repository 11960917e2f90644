//! Typed readers for the arguments of directive applications.

use apollo_compiler::Name;
use apollo_compiler::ast::Value;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::schema::definitions::AppliedDirective;

fn invalid_argument(
    application: &AppliedDirective,
    name: &Name,
    expected: &str,
) -> FederationError {
    SingleFederationError::InvalidFederationSupergraph {
        message: format!(
            "Argument \"{name}\" of directive \"@{}\" must be {expected}",
            application.name()
        ),
    }
    .into()
}

fn missing_argument(application: &AppliedDirective, name: &Name) -> FederationError {
    SingleFederationError::InvalidFederationSupergraph {
        message: format!(
            "Required argument \"{name}\" of directive \"@{}\" was not present",
            application.name()
        ),
    }
    .into()
}

/// The value of argument `name`, treating an explicit `null` like an absent argument.
fn argument_value<'doc>(application: &'doc AppliedDirective, name: &Name) -> Option<&'doc Value> {
    application
        .argument(name)
        .map(|value| &**value)
        .filter(|value| !matches!(value, Value::Null))
}

pub(crate) fn directive_optional_enum_argument(
    application: &AppliedDirective,
    name: &Name,
) -> Result<Option<Name>, FederationError> {
    match argument_value(application, name) {
        None => Ok(None),
        Some(Value::Enum(value)) => Ok(Some(value.clone())),
        Some(_) => Err(invalid_argument(application, name, "an enum value")),
    }
}

pub(crate) fn directive_required_enum_argument(
    application: &AppliedDirective,
    name: &Name,
) -> Result<Name, FederationError> {
    directive_optional_enum_argument(application, name)?
        .ok_or_else(|| missing_argument(application, name))
}

pub(crate) fn directive_optional_string_argument<'doc>(
    application: &'doc AppliedDirective,
    name: &Name,
) -> Result<Option<&'doc str>, FederationError> {
    match argument_value(application, name) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(invalid_argument(application, name, "a string")),
    }
}

pub(crate) fn directive_required_string_argument<'doc>(
    application: &'doc AppliedDirective,
    name: &Name,
) -> Result<&'doc str, FederationError> {
    directive_optional_string_argument(application, name)?
        .ok_or_else(|| missing_argument(application, name))
}

pub(crate) fn directive_optional_boolean_argument(
    application: &AppliedDirective,
    name: &Name,
) -> Result<Option<bool>, FederationError> {
    match argument_value(application, name) {
        None => Ok(None),
        Some(Value::Boolean(value)) => Ok(Some(*value)),
        Some(_) => Err(invalid_argument(application, name, "a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    fn application() -> AppliedDirective {
        AppliedDirective::new(
            name!("join__type"),
            [
                (name!("graph"), Value::Enum(name!("A"))),
                (name!("key"), Value::String("id".to_owned())),
                (name!("extension"), Value::Null),
            ],
        )
    }

    #[test]
    fn reads_typed_arguments() {
        let application = application();
        assert_eq!(
            directive_required_enum_argument(&application, &name!("graph"))
                .unwrap()
                .as_str(),
            "A"
        );
        assert_eq!(
            directive_optional_string_argument(&application, &name!("key")).unwrap(),
            Some("id")
        );
        assert_eq!(
            directive_optional_boolean_argument(&application, &name!("extension")).unwrap(),
            None
        );
    }

    #[test]
    fn reports_mistyped_and_missing_arguments() {
        let application = application();
        insta::assert_snapshot!(
            directive_required_string_argument(&application, &name!("graph")).unwrap_err(),
            @r###"Argument "graph" of directive "@join__type" must be a string"###
        );
        insta::assert_snapshot!(
            directive_required_string_argument(&application, &name!("url")).unwrap_err(),
            @r###"Required argument "url" of directive "@join__type" was not present"###
        );
    }
}
