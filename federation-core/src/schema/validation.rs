//! Whole-schema checks run by [`FederationSchema::validate`].
//!
//! Mutators only guarantee that references resolve. The checks in here cover what is allowed to
//! be temporarily wrong while a schema is being built: kinds of referenced types, interface
//! implementations, directive locations and argument values.

use apollo_compiler::Name;
use apollo_compiler::ast::DirectiveLocation;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::FederationError;
use crate::error::MultipleFederationErrors;
use crate::error::SingleFederationError;
use crate::schema::FederationSchema;
use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::ObjectOrInterfaceType;
use crate::schema::definitions::TypeDefinition;
use crate::schema::values::is_valid_input_value;

struct SchemaValidator<'schema> {
    schema: &'schema FederationSchema,
    errors: MultipleFederationErrors,
}

impl SchemaValidator<'_> {
    fn report(&mut self, message: String) {
        self.errors
            .push(SingleFederationError::InvalidGraphQL { message }.into());
    }

    fn validate_roots(&mut self) {
        let schema = self.schema;
        for (kind, root) in &schema.schema_definition.roots {
            if !matches!(
                schema.type_definition(&root.type_name),
                Some(TypeDefinition::Object(_))
            ) {
                self.report(format!(
                    "The {kind} root type must be an Object type, got \"{}\"",
                    root.type_name
                ));
            }
        }
    }

    fn validate_type(&mut self, type_: &TypeDefinition) {
        let schema = self.schema;
        let name = type_.name();
        if type_.is_empty() {
            self.report(format!("Type \"{name}\" must define one or more members"));
        }
        self.validate_directives(type_.directives(), &type_location(type_), name);
        match type_ {
            TypeDefinition::Scalar(_) => {}
            TypeDefinition::Object(object) | TypeDefinition::Interface(object) => {
                for field in object.fields.values() {
                    self.validate_field(name, field);
                }
                self.validate_implementations(object);
            }
            TypeDefinition::Union(union_) => {
                for member in union_.members.keys() {
                    if !matches!(
                        schema.type_definition(member),
                        Some(TypeDefinition::Object(_))
                    ) {
                        self.report(format!(
                            "Union type \"{name}\" can only include Object types, it cannot include \"{member}\""
                        ));
                    }
                }
            }
            TypeDefinition::Enum(enum_) => {
                for value in enum_.values.values() {
                    self.validate_directives(
                        &value.directives,
                        &DirectiveLocation::EnumValue,
                        &format!("{name}.{}", value.value),
                    );
                }
            }
            TypeDefinition::InputObject(input_object) => {
                for field in input_object.fields.values() {
                    self.validate_input_value(
                        field,
                        DirectiveLocation::InputFieldDefinition,
                        &format!("{name}.{}", field.name),
                    );
                }
            }
        }
    }

    fn validate_field(&mut self, type_name: &Name, field: &FieldDefinition) {
        let coordinate = format!("{type_name}.{}", field.name);
        match &field.ty {
            None => self.report(format!("Field \"{coordinate}\" has no type")),
            Some(ty) => {
                let is_output = self
                    .schema
                    .type_definition(ty.inner_named_type())
                    .is_some_and(|type_| type_.is_output_type());
                if !is_output {
                    self.report(format!(
                        "The type of \"{coordinate}\" must be Output Type but got \"{ty}\""
                    ));
                }
            }
        }
        self.validate_directives(
            &field.directives,
            &DirectiveLocation::FieldDefinition,
            &coordinate,
        );
        for argument in field.arguments.values() {
            self.validate_input_value(
                argument,
                DirectiveLocation::ArgumentDefinition,
                &format!("{coordinate}({}:)", argument.name),
            );
        }
    }

    fn validate_input_value(
        &mut self,
        value: &InputValueDefinition,
        location: DirectiveLocation,
        coordinate: &str,
    ) {
        let schema = self.schema;
        match &value.ty {
            None => self.report(format!("\"{coordinate}\" has no type")),
            Some(ty) => {
                let is_input = self
                    .schema
                    .type_definition(ty.inner_named_type())
                    .is_some_and(|type_| type_.is_input_type());
                if !is_input {
                    self.report(format!(
                        "The type of \"{coordinate}\" must be Input Type but got \"{ty}\""
                    ));
                } else if let Some(default_value) = &value.default_value {
                    if !is_valid_input_value(schema, default_value, ty) {
                        self.report(format!(
                            "Invalid default value {default_value} for \"{coordinate}\" of type \"{ty}\""
                        ));
                    }
                }
            }
        }
        self.validate_directives(&value.directives, &location, coordinate);
    }

    fn validate_implementations(&mut self, type_: &ObjectOrInterfaceType) {
        let schema = self.schema;
        for interface_name in type_.implements_interfaces.keys() {
            let Some(TypeDefinition::Interface(interface)) =
                schema.type_definition(interface_name)
            else {
                self.report(format!(
                    "Type \"{}\" can only implement Interface types, it cannot implement \"{interface_name}\"",
                    type_.name
                ));
                continue;
            };
            for interface_field in interface.fields.values() {
                let implemented = type_.fields.get(&interface_field.name);
                let compatible = match (implemented, &interface_field.ty) {
                    (Some(field), Some(expected)) => field.ty.as_ref().is_some_and(|ty| {
                        is_subtype(schema, ty.inner_named_type(), expected.inner_named_type())
                    }),
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if !compatible {
                    self.report(format!(
                        "Interface field \"{interface_name}.{}\" is not implemented by \"{}\"",
                        interface_field.name, type_.name
                    ));
                }
            }
        }
    }

    fn validate_directives(
        &mut self,
        directives: &[AppliedDirective],
        location: &DirectiveLocation,
        coordinate: &str,
    ) {
        let schema = self.schema;
        let mut seen: IndexMap<&Name, usize> = IndexMap::new();
        for directive in directives {
            let name = directive.name();
            *seen.entry(name).or_default() += 1;
            let Some(definition) = schema.directive_definition(name) else {
                self.report(format!(
                    "Cannot find directive \"@{name}\" applied on \"{coordinate}\""
                ));
                continue;
            };
            if !definition.locations.contains(location) {
                self.report(format!(
                    "Directive \"@{name}\" may not be used on {location} (applied on \"{coordinate}\")"
                ));
            }
            if !definition.repeatable && seen[name] == 2 {
                self.report(format!(
                    "Non-repeatable directive \"@{name}\" is applied more than once on \"{coordinate}\""
                ));
            }
            for argument in &directive.node.arguments {
                match definition.arguments.get(&argument.name) {
                    None => self.report(format!(
                        "Unknown argument \"{}\" in \"@{name}\" applied on \"{coordinate}\"",
                        argument.name
                    )),
                    Some(argument_definition) => {
                        if let Some(ty) = &argument_definition.ty {
                            if !is_valid_input_value(schema, &argument.value, ty) {
                                self.report(format!(
                                    "Invalid value {} for argument \"{}\" of \"@{name}\" applied on \"{coordinate}\": expected type \"{ty}\"",
                                    argument.value, argument.name
                                ));
                            }
                        }
                    }
                }
            }
            for argument_definition in definition.arguments.values() {
                if argument_definition.is_required()
                    && directive.argument(&argument_definition.name).is_none()
                {
                    self.report(format!(
                        "Missing required argument \"{}\" in \"@{name}\" applied on \"{coordinate}\"",
                        argument_definition.name
                    ));
                }
            }
        }
    }
}

/// Whether a field of type `named` may implement an interface field of type `expected`.
fn is_subtype(schema: &FederationSchema, named: &Name, expected: &Name) -> bool {
    if named == expected || schema.possible_runtime_types(expected).contains(named) {
        return true;
    }
    match schema.type_definition(named) {
        Some(TypeDefinition::Interface(interface)) => {
            interface.implements_interfaces.contains_key(expected)
        }
        _ => false,
    }
}

fn type_location(type_: &TypeDefinition) -> DirectiveLocation {
    match type_ {
        TypeDefinition::Scalar(_) => DirectiveLocation::Scalar,
        TypeDefinition::Object(_) => DirectiveLocation::Object,
        TypeDefinition::Interface(_) => DirectiveLocation::Interface,
        TypeDefinition::Union(_) => DirectiveLocation::Union,
        TypeDefinition::Enum(_) => DirectiveLocation::Enum,
        TypeDefinition::InputObject(_) => DirectiveLocation::InputObject,
    }
}

/// Checks the regular content of the schema, reporting every problem found.
pub(crate) fn validate_schema(schema: &FederationSchema) -> Result<(), FederationError> {
    let mut validator = SchemaValidator {
        schema,
        errors: MultipleFederationErrors::new(),
    };
    validator.validate_roots();
    validator.validate_directives(
        &schema.schema_definition.directives,
        &DirectiveLocation::Schema,
        "schema",
    );
    for type_ in schema.types.values() {
        validator.validate_type(type_);
    }
    for definition in schema.directive_definitions.values() {
        for argument in definition.arguments.values() {
            validator.validate_input_value(
                argument,
                DirectiveLocation::ArgumentDefinition,
                &format!("@{}({}:)", definition.name, argument.name),
            );
        }
    }
    if !validator.errors.is_empty() {
        debug!(
            "Schema validation failed with {} error(s)",
            validator.errors.errors.len()
        );
    }
    validator.errors.into_result()
}

#[cfg(test)]
mod tests {
    use crate::schema::FederationSchema;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;

    fn validate(sdl: &str) -> Result<(), crate::error::FederationError> {
        FederationSchema::parse(sdl, GRAPHQL_BUILT_INS)?.validate()?;
        Ok(())
    }

    #[test]
    fn valid_schema_passes() {
        validate(
            r#"
            type Query { node(id: ID!): Node search(limit: Int = 10): [Result!]! }
            interface Node { id: ID! }
            type User implements Node { id: ID! name: String @deprecated(reason: "use handle") }
            type Post implements Node { id: ID! }
            union Result = User | Post
            "#,
        )
        .unwrap();
    }

    #[test]
    fn all_problems_are_reported() {
        let error = validate(
            r#"
            type Query { a: In b: Int @deprecated(reason: 3) }
            input In { x: Int }
            interface I { id: ID! }
            type T implements I { name: String }
            "#,
        )
        .unwrap_err();
        insta::assert_snapshot!(error, @r###"
        The following errors occurred:
          - The type of "Query.a" must be Output Type but got "In"
          - Invalid value 3 for argument "reason" of "@deprecated" applied on "Query.b": expected type "String"
          - Interface field "I.id" is not implemented by "T"
        "###);
    }

    #[test]
    fn misplaced_directives_are_reported() {
        let error = validate(
            r#"
            type Query @deprecated { a: Int }
            "#,
        )
        .unwrap_err();
        insta::assert_snapshot!(
            error,
            @r###"Directive "@deprecated" may not be used on OBJECT (applied on "Query")"###
        );
    }
}
