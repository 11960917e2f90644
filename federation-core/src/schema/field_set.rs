use apollo_compiler::Name;
use apollo_compiler::ast;
use indexmap::IndexMap;

use crate::error::FederationError;
use crate::error::MultipleFederationErrors;
use crate::error::SingleFederationError;
use crate::operation::Selection;
use crate::operation::SelectionSet;
use crate::operation::TYPENAME_FIELD;
use crate::schema::FederationSchema;
use crate::schema::position::FieldDefinitionPosition;
use crate::schema::position::TypeDefinitionPosition;

/// Called with every field a field set names, before the field set is resolved. The accessor may
/// add the field to the schema, or adjust it.
pub(crate) type FieldAccessor<'a> =
    dyn FnMut(&mut FederationSchema, &FieldDefinitionPosition) -> Result<(), FederationError> + 'a;

// Federation does not allow the alias syntax in field set strings, but the GraphQL parser does,
// so this is checked once the field set is resolved.
fn check_absence_of_aliases(selection_set: &SelectionSet) -> Result<(), FederationError> {
    fn visit_selection_set(errors: &mut MultipleFederationErrors, selection_set: &SelectionSet) {
        for selection in selection_set.iter() {
            match selection {
                Selection::InlineFragment(fragment) => {
                    visit_selection_set(errors, &fragment.selection_set)
                }
                Selection::Field(field) => {
                    if let Some(alias) = field.field.alias() {
                        errors.push(
                            SingleFederationError::UnsupportedFeature {
                                message: format!(
                                    r#"Cannot use alias "{alias}" in "{}": aliases are not currently supported in field sets"#,
                                    field.field
                                ),
                            }
                            .into(),
                        );
                    }
                    if let Some(selection_set) = &field.selection_set {
                        visit_selection_set(errors, selection_set);
                    }
                }
            }
        }
    }

    let mut errors = MultipleFederationErrors::new();
    visit_selection_set(&mut errors, selection_set);
    errors.into_result()
}

/// Parses the selections of a field set string. The braces around the selections are added here.
fn parse_selections(field_set: &str) -> Result<Vec<ast::Selection>, FederationError> {
    let document = ast::Document::parse(format!("{{ {field_set} }}"), "field_set.graphql")
        .map_err(|e| SingleFederationError::InvalidGraphQL {
            message: format!("Invalid field set \"{field_set}\": {}", e.errors),
        })?;
    let mut operations = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => Some(operation),
            _ => None,
        });
    match (operations.next(), operations.next()) {
        (Some(operation), None) if document.definitions.len() == 1 => {
            Ok(operation.selection_set.clone())
        }
        _ => Err(SingleFederationError::InvalidGraphQL {
            message: format!("Invalid field set \"{field_set}\": expected a single selection set"),
        }
        .into()),
    }
}

/// Parses a `@key`, `@requires` or `@provides` field set against `parent_type`.
pub(crate) fn parse_field_set(
    schema: &FederationSchema,
    parent_type: &Name,
    field_set: &str,
) -> Result<SelectionSet, FederationError> {
    let selections = parse_selections(field_set)?;
    // A field set cannot declare variables nor named fragments.
    let selection_set = SelectionSet::from_ast(
        schema,
        parent_type,
        &selections,
        &IndexMap::new(),
        &[],
        &mut Vec::new(),
    )?;
    selection_set.validate()?;
    check_absence_of_aliases(&selection_set)?;
    Ok(selection_set)
}

/// Like [`parse_field_set`], but first hands every field the field set names to `accessor`, so
/// that fields can be fetched or created on demand while a schema is being built.
pub(crate) fn parse_field_set_with_accessor(
    schema: &mut FederationSchema,
    parent_type: &Name,
    field_set: &str,
    accessor: &mut FieldAccessor<'_>,
) -> Result<SelectionSet, FederationError> {
    let selections = parse_selections(field_set)?;
    visit_fields(schema, parent_type, &selections, accessor)?;
    parse_field_set(schema, parent_type, field_set)
}

fn visit_fields(
    schema: &mut FederationSchema,
    parent_type: &Name,
    selections: &[ast::Selection],
    accessor: &mut FieldAccessor<'_>,
) -> Result<(), FederationError> {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => {
                if field.name == TYPENAME_FIELD {
                    continue;
                }
                let position =
                    TypeDefinitionPosition::new(parent_type.clone()).field(field.name.clone());
                accessor(schema, &position)?;
                if field.selection_set.is_empty() {
                    continue;
                }
                // Unresolved fields are reported when the field set is parsed.
                let Some(output_type) = position
                    .try_get(schema)
                    .and_then(|definition| definition.ty.as_ref())
                    .map(|ty| ty.inner_named_type().clone())
                else {
                    continue;
                };
                visit_fields(schema, &output_type, &field.selection_set, accessor)?;
            }
            ast::Selection::InlineFragment(fragment) => {
                let casted_type = fragment.type_condition.as_ref().unwrap_or(parent_type);
                visit_fields(schema, casted_type, &fragment.selection_set, accessor)?;
            }
            ast::Selection::FragmentSpread(_) => {}
        }
    }
    Ok(())
}

/// The schema fields a resolved field set selects, at any depth, in selection order.
pub(crate) fn collect_target_fields(selection_set: &SelectionSet) -> Vec<FieldDefinitionPosition> {
    fn visit(selection_set: &SelectionSet, fields: &mut Vec<FieldDefinitionPosition>) {
        for selection in selection_set.iter() {
            if let Selection::Field(field) = selection {
                fields.extend(field.field.field_position());
            }
            if let Some(selection_set) = selection.selection_set() {
                visit(selection_set, fields);
            }
        }
    }

    let mut fields = Vec::new();
    visit(selection_set, &mut fields);
    fields
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;
    use crate::schema::definitions::FieldDefinition;

    const SCHEMA: &str = r#"
    type Query {
      product: Product
    }

    type Product {
      upc: String!
      sku: String!
      dimensions: Dimensions
    }

    type Dimensions {
      weight: Int
    }
    "#;

    #[test]
    fn parses_nested_field_sets() {
        let schema = FederationSchema::parse(SCHEMA, GRAPHQL_BUILT_INS).unwrap();
        let selection_set =
            parse_field_set(&schema, &name!("Product"), "upc dimensions { weight }").unwrap();
        insta::assert_snapshot!(selection_set, @"{ upc dimensions { weight } }");
        let fields = collect_target_fields(&selection_set)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(fields, ["Product.upc", "Product.dimensions", "Dimensions.weight"]);
    }

    #[test]
    fn rejects_aliases_and_unknown_fields() {
        let schema = FederationSchema::parse(SCHEMA, GRAPHQL_BUILT_INS).unwrap();
        insta::assert_snapshot!(
            parse_field_set(&schema, &name!("Product"), "id: upc").unwrap_err(),
            @r###"Cannot use alias "id" in "id: upc": aliases are not currently supported in field sets"###
        );
        insta::assert_snapshot!(
            parse_field_set(&schema, &name!("Product"), "id").unwrap_err(),
            @r###"Cannot query field "id" on type "Product""###
        );
        insta::assert_snapshot!(
            parse_field_set(&schema, &name!("Product"), "dimensions").unwrap_err(),
            @r###"A selection set on type "Dimensions" must select at least one field"###
        );
    }

    #[test]
    fn accessor_sees_every_field_and_can_add_missing_ones() {
        let mut schema = FederationSchema::parse(SCHEMA, GRAPHQL_BUILT_INS).unwrap();
        let mut seen = Vec::new();
        let selection_set = parse_field_set_with_accessor(
            &mut schema,
            &name!("Product"),
            "sku dimensions { weight height }",
            &mut |schema, position| {
                seen.push(position.to_string());
                if position.try_get(schema).is_none() {
                    position.insert(
                        schema,
                        FieldDefinition::new(
                            position.field_name.clone(),
                            apollo_compiler::ty!(Int),
                        ),
                    )?;
                }
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(
            seen,
            [
                "Product.sku",
                "Product.dimensions",
                "Dimensions.weight",
                "Dimensions.height"
            ]
        );
        insta::assert_snapshot!(selection_set, @"{ sku dimensions { weight height } }");
    }
}
