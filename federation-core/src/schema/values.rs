use apollo_compiler::ast;
use apollo_compiler::ast::Value;

use crate::schema::FederationSchema;
use crate::schema::definitions::TypeDefinition;

/// Whether `value` can be given where `ty` is expected.
///
/// Variables are accepted as-is: checking them against their declaration is up to the caller. A
/// single value is accepted where a list is expected, like input coercion does. Custom scalars
/// accept anything.
pub(crate) fn is_valid_input_value(
    schema: &FederationSchema,
    value: &Value,
    ty: &ast::Type,
) -> bool {
    match value {
        Value::Variable(_) => return true,
        Value::Null => return !ty.is_non_null(),
        _ => {}
    }
    if ty.is_list() {
        return match value {
            Value::List(items) => items
                .iter()
                .all(|item| is_valid_input_value(schema, item, ty.item_type())),
            _ => is_valid_input_value(schema, value, ty.item_type()),
        };
    }
    let type_name = ty.inner_named_type();
    match schema.type_definition(type_name) {
        Some(TypeDefinition::Scalar(_)) => is_valid_scalar_value(type_name, value),
        Some(TypeDefinition::Enum(enum_)) => {
            matches!(value, Value::Enum(name) if enum_.values.contains_key(name))
        }
        Some(TypeDefinition::InputObject(input_object)) => {
            let Value::Object(fields) = value else {
                return false;
            };
            let known = fields.iter().all(|(name, field_value)| {
                input_object.fields.get(name).is_some_and(|field| {
                    field
                        .ty
                        .as_ref()
                        .is_some_and(|ty| is_valid_input_value(schema, field_value, ty))
                })
            });
            let complete = input_object
                .fields
                .values()
                .filter(|field| field.is_required())
                .all(|field| fields.iter().any(|(name, _)| *name == field.name));
            known && complete
        }
        _ => false,
    }
}

fn is_valid_scalar_value(type_name: &str, value: &Value) -> bool {
    match type_name {
        "Int" => matches!(value, Value::Int(int) if int.try_to_i32().is_ok()),
        "Float" => matches!(value, Value::Int(_) | Value::Float(_)),
        "String" => matches!(value, Value::String(_)),
        "Boolean" => matches!(value, Value::Boolean(_)),
        "ID" => matches!(value, Value::String(_) | Value::Int(_)),
        _ => true,
    }
}

/// Every variable referenced by `value`, in order of appearance.
pub(crate) fn collect_variables<'a>(
    value: &'a Value,
    variables: &mut Vec<&'a apollo_compiler::Name>,
) {
    match value {
        Value::Variable(name) => variables.push(name),
        Value::List(items) => {
            for item in items {
                collect_variables(item, variables);
            }
        }
        Value::Object(fields) => {
            for (_, field_value) in fields {
                collect_variables(field_value, variables);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::Node;
    use apollo_compiler::name;
    use rstest::rstest;

    use super::*;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;

    fn schema() -> FederationSchema {
        FederationSchema::parse(
            r#"
            type Query { a: Int }
            enum Color { RED GREEN }
            input Filter { color: Color! limit: Int = 10 }
            scalar JSON
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap()
    }

    fn named(name: &str) -> ast::Type {
        ast::Type::Named(apollo_compiler::Name::new(name).unwrap())
    }

    #[rstest]
    #[case(Value::Int(1.into()), named("Int"), true)]
    #[case(Value::Int(1.into()), named("Float"), true)]
    #[case(Value::Int(1.into()), named("ID"), true)]
    #[case(Value::Int(1.into()), named("String"), false)]
    #[case(Value::Boolean(true), named("Int"), false)]
    #[case(Value::Null, named("Int"), true)]
    #[case(Value::Null, named("Int").non_null(), false)]
    #[case(Value::Enum(name!("RED")), named("Color"), true)]
    #[case(Value::Enum(name!("BLUE")), named("Color"), false)]
    #[case(Value::Int(1.into()), named("Int").list(), true)]
    #[case(Value::Variable(name!("v")), named("Color").non_null(), true)]
    #[case(Value::Boolean(true), named("JSON"), true)]
    fn scalar_and_enum_values(#[case] value: Value, #[case] ty: ast::Type, #[case] valid: bool) {
        assert_eq!(is_valid_input_value(&schema(), &value, &ty), valid);
    }

    #[test]
    fn input_objects_need_required_fields_and_no_unknown_ones() {
        let schema = schema();
        let ty = named("Filter");
        let object = |fields: Vec<(apollo_compiler::Name, Value)>| {
            Value::Object(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, Node::new(value)))
                    .collect(),
            )
        };
        assert!(is_valid_input_value(
            &schema,
            &object(vec![(name!("color"), Value::Enum(name!("GREEN")))]),
            &ty
        ));
        assert!(!is_valid_input_value(
            &schema,
            &object(vec![(name!("limit"), Value::Int(3.into()))]),
            &ty
        ));
        assert!(!is_valid_input_value(
            &schema,
            &object(vec![
                (name!("color"), Value::Enum(name!("GREEN"))),
                (name!("other"), Value::Int(3.into())),
            ]),
            &ty
        ));
    }
}
