use apollo_compiler::name;
use itertools::Itertools;
use pretty_assertions::assert_eq;

use super::Field;
use super::FieldData;
use super::FieldSelection;
use super::Operation;
use super::Selection;
use super::SelectionKey;
use super::SelectionSet;
use crate::schema::FederationSchema;
use crate::schema::built_ins::GRAPHQL_BUILT_INS;

const SCHEMA: &str = r#"
type Query {
  t: T
  ts(first: Int!): [T]
  node: Node
}

interface Node {
  id: ID!
}

type T implements Node {
  id: ID!
  name(upper: Boolean = false): String
  friends: [T]
}

type U {
  id: ID!
}
"#;

pub(super) fn parse_schema(sdl: &str) -> FederationSchema {
    FederationSchema::parse(sdl, GRAPHQL_BUILT_INS).unwrap()
}

pub(super) fn parse_operation(schema: &FederationSchema, query: &str) -> Operation {
    Operation::parse(schema, query, None).unwrap()
}

fn parse_error(query: &str) -> String {
    let schema = parse_schema(SCHEMA);
    Operation::parse(&schema, query, None)
        .unwrap_err()
        .to_string()
}

#[test]
fn parses_and_prints_selection_sets() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(&schema, "{ t { id name(upper: true) __typename } }");
    insta::assert_snapshot!(
        operation.selection_set(),
        @"{ t { id name(upper: true) __typename } }"
    );
}

#[test]
fn prints_operations() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(&schema, "query Q($n: Int!) { ts(first: $n) { id } }");
    insta::assert_snapshot!(operation, @r###"
    query Q($n: Int!) {
      ts(first: $n) {
        id
      }
    }
    "###);
}

#[test]
fn equality_ignores_selection_order() {
    let schema = parse_schema(SCHEMA);
    let left = parse_operation(&schema, "{ t { id name } node { id } }");
    let right = parse_operation(&schema, "{ node { id } t { name id } }");
    assert_eq!(left.selection_set(), right.selection_set());

    let different = parse_operation(&schema, "{ node { id } t { name } }");
    assert_ne!(left.selection_set(), different.selection_set());
}

#[test]
fn adding_the_same_selection_twice_is_idempotent() {
    let schema = parse_schema(SCHEMA);
    let once = parse_operation(&schema, "{ t { id friends { name } } }")
        .selection_set
        .clone();
    let mut twice = once.clone();
    twice.add_all(once.clone()).unwrap();
    assert_eq!(twice.len(), 1);
    assert_eq!(twice, once);
}

#[test]
fn merges_sub_selections_of_the_same_field() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(&schema, "{ t { id } t { name } t { id friends { id } } }");
    insta::assert_snapshot!(
        operation.selection_set(),
        @"{ t { id name friends { id } } }"
    );
}

#[test]
fn same_response_name_with_different_arguments_is_a_conflict() {
    insta::assert_snapshot!(
        parse_error("{ ts(first: 1) { id } ts(first: 2) { id } }"),
        @r###"Cannot merge "ts(first: 1)" with "ts(first: 2)": same response name, different meaning"###
    );
    insta::assert_snapshot!(
        parse_error("{ t { id id: name } }"),
        @r###"Cannot merge "id" with "id: name": same response name, different meaning"###
    );
}

#[test]
fn conflicting_additions_leave_the_set_unchanged() {
    let schema = parse_schema(SCHEMA);
    let mut selection_set = parse_operation(&schema, "{ t { id } }").selection_set.clone();
    let before = selection_set.clone();
    let other = parse_operation(&schema, "{ u: t { id } t: node { id } }").selection_set;
    assert!(selection_set.add_all(other).is_err());
    assert_eq!(selection_set, before);
    assert_eq!(selection_set.len(), 1);
}

#[test]
fn different_directives_keep_separate_branches() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(
        &schema,
        "query($c: Boolean!) { t @skip(if: $c) { id } t @include(if: $c) { name } t @skip(if: $c) { name } }",
    );
    let selection_set = operation.selection_set();
    assert_eq!(selection_set.len(), 2);
    assert_eq!(
        selection_set
            .get(&SelectionKey::Field {
                response_name: name!("t")
            })
            .len(),
        2
    );
    insta::assert_snapshot!(
        selection_set,
        @"{ t @skip(if: $c) { id name } t @include(if: $c) { name } }"
    );
}

#[test]
fn operation_paths_round_trip() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(
        &schema,
        "{ t { id friends { name } } node { ... on T { name } } }",
    );
    let paths = operation.selection_set().to_operation_paths();
    insta::assert_snapshot!(
        paths.iter().map(|path| path.iter().join(" -> ")).join("\n"),
        @r###"
    t -> id
    t -> friends -> name
    node -> ... on T -> name
    "###
    );
    let rebuilt = SelectionSet::from_operation_paths(name!("Query"), &paths).unwrap();
    assert_eq!(&rebuilt, operation.selection_set());
}

#[test]
fn empty_selection_set_has_one_empty_path() {
    let paths = SelectionSet::new(name!("Query")).to_operation_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].is_empty());
}

#[test]
fn add_path_merges_into_existing_selections() {
    let schema = parse_schema(SCHEMA);
    let mut selection_set = parse_operation(&schema, "{ t { id } }").selection_set.clone();
    let t = Field::new(&schema, FieldData::new(name!("Query"), name!("t")), &[]).unwrap();
    let name = Field::new(&schema, FieldData::new(name!("T"), name!("name")), &[]).unwrap();
    selection_set.add_path(&[t.into(), name.into()]).unwrap();
    insta::assert_snapshot!(selection_set, @"{ t { id name } }");
}

#[test]
fn builds_fields_programmatically() {
    let schema = parse_schema(SCHEMA);
    let include = apollo_compiler::Node::new(apollo_compiler::ast::Directive {
        name: name!("include"),
        arguments: vec![apollo_compiler::Node::new(apollo_compiler::ast::Argument {
            name: name!("if"),
            value: apollo_compiler::Node::new(apollo_compiler::ast::Value::Boolean(true)),
        })],
    });
    let data = FieldData::new(name!("T"), name!("name"))
        .with_alias(name!("loud"))
        .with_argument(name!("upper"), apollo_compiler::ast::Value::Boolean(true))
        .with_directives(std::iter::once(include).collect());
    let field = Field::new(&schema, data, &[]).unwrap();
    assert_eq!(field.response_name().as_str(), "loud");
    assert!(field.is_leaf());
    insta::assert_snapshot!(field, @"loud: name(upper: true) @include(if: true)");

    let mut selection_set = SelectionSet::new(name!("T"));
    selection_set
        .add(Selection::Field(FieldSelection::new(field.clone())))
        .unwrap();
    selection_set
        .add(Selection::Field(FieldSelection::new(field)))
        .unwrap();
    insta::assert_snapshot!(selection_set, @"{ loud: name(upper: true) @include(if: true) }");
}

#[test]
fn path_below_a_leaf_is_rejected() {
    let schema = parse_schema(SCHEMA);
    let id = Field::new(&schema, FieldData::new(name!("T"), name!("id")), &[]).unwrap();
    let name = Field::new(&schema, FieldData::new(name!("T"), name!("name")), &[]).unwrap();
    let error = SelectionSet::new(name!("T"))
        .add_path(&[id.into(), name.into()])
        .unwrap_err();
    insta::assert_snapshot!(error, @r###"Cannot select anything below leaf field "id""###);
}

#[test]
fn validates_field_arguments() {
    insta::assert_snapshot!(
        parse_error("{ ts { id } }"),
        @r###"Missing value for required argument "first" of field "Query.ts""###
    );
    insta::assert_snapshot!(
        parse_error(r#"{ ts(first: "ten") { id } }"#),
        @r###"Invalid value "ten" for argument "first" of field "Query.ts""###
    );
    insta::assert_snapshot!(
        parse_error("{ t(foo: 1) { id } }"),
        @r###"Unknown argument "foo" given to field "Query.t""###
    );
    insta::assert_snapshot!(
        parse_error("{ ts(first: null) { id } }"),
        @r###"Invalid value null for argument "first" of field "Query.ts""###
    );
}

#[test]
fn drops_undeclared_null_arguments() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(&schema, "{ t(foo: null) { name(upper: null) } }");
    insta::assert_snapshot!(operation.selection_set(), @"{ t { name(upper: null) } }");
}

#[test]
fn rejects_unknown_fields_and_bad_sub_selections() {
    insta::assert_snapshot!(
        parse_error("{ t { email } }"),
        @r###"Cannot query field "email" on type "T""###
    );
    insta::assert_snapshot!(
        parse_error("{ t { id { value } } }"),
        @r###"Leaf field "id" of type "ID!" cannot have a selection set"###
    );
    insta::assert_snapshot!(
        parse_error("{ t }"),
        @r###"A selection set on type "T" must select at least one field"###
    );
}

#[test]
fn checks_fragment_type_conditions() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(&schema, "{ node { id ... on T { name } } }");
    insta::assert_snapshot!(operation.selection_set(), @"{ node { id ... on T { name } } }");

    insta::assert_snapshot!(
        parse_error("{ t { ... on U { id } } }"),
        @r###"Fragment on "U" can never apply to type "T""###
    );
}

#[test]
fn expands_named_fragments() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(
        &schema,
        r#"
        query {
          node { ...NodeFields }
        }

        fragment NodeFields on T {
          id
          friends { id }
        }
        "#,
    );
    insta::assert_snapshot!(
        operation.selection_set(),
        @"{ node { ... on T { id friends { id } } } }"
    );
}

#[test]
fn rejects_fragment_cycles_and_unknown_fragments() {
    insta::assert_snapshot!(
        parse_error(
            r#"
            query { t { ...A } }
            fragment A on T { friends { ...B } }
            fragment B on T { ...A }
            "#
        ),
        @r###"Cannot spread fragment "A" within itself via A, B"###
    );
    insta::assert_snapshot!(
        parse_error("{ t { ...Missing } }"),
        @r###"Unknown fragment "Missing""###
    );
}

#[test]
fn tracks_variables() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(
        &schema,
        "query($c: Boolean!, $n: Int!) { ts(first: $n) @include(if: $c) { id } }",
    );
    assert_eq!(
        operation
            .selection_set()
            .used_variables()
            .iter()
            .map(|name| name.as_str())
            .collect::<Vec<_>>(),
        vec!["n", "c"]
    );

    insta::assert_snapshot!(
        parse_error("{ ts(first: $n) { id } }"),
        @r###"Variable "$n" used in "ts(first: $n)" is not declared"###
    );
    insta::assert_snapshot!(
        parse_error("{ t { ... @include(if: $c) { id } } }"),
        @r###"Variable "$c" is not declared by the operation"###
    );
}

#[test]
fn selects_operations_by_name() {
    let schema = parse_schema(SCHEMA);
    let document = "query A { t { id } } query B { node { id } }";
    let operation = Operation::parse(&schema, document, Some("B")).unwrap();
    assert_eq!(operation.name().map(|name| name.as_str()), Some("B"));

    insta::assert_snapshot!(
        Operation::parse(&schema, document, None).unwrap_err(),
        @"An operation name is required when the document has several operations"
    );
    insta::assert_snapshot!(
        Operation::parse(&schema, "mutation { t { id } }", None).unwrap_err(),
        @"Schema has no mutation root type"
    );
}

#[test]
fn rebases_selections_on_another_type() {
    let schema = parse_schema(SCHEMA);
    let operation = parse_operation(&schema, "{ t { id } }");
    let Some(t_selection) = operation.selection_set().iter().next() else {
        panic!("expected a selection");
    };
    let Some(on_t) = t_selection.selection_set() else {
        panic!("expected a sub-selection");
    };

    let on_u = on_t.rebase_on(&name!("U"), &schema).unwrap();
    assert_eq!(on_u.parent_type().as_str(), "U");
    insta::assert_snapshot!(on_u, @"{ id }");

    let with_name = parse_operation(&schema, "{ t { name } }");
    let Some(on_t) = with_name
        .selection_set()
        .iter()
        .next()
        .and_then(|selection| selection.selection_set())
    else {
        panic!("expected a sub-selection");
    };
    insta::assert_snapshot!(
        on_t.rebase_on(&name!("U"), &schema).unwrap_err(),
        @r###"Cannot query field "name" on type "U""###
    );
}

#[test]
fn rejects_selections_of_another_parent_type() {
    let schema = parse_schema(SCHEMA);
    let id = Field::new(&schema, FieldData::new(name!("U"), name!("id")), &[]).unwrap();
    let error = SelectionSet::new(name!("T"))
        .add(FieldSelection::new(id).into())
        .unwrap_err();
    insta::assert_snapshot!(
        error,
        @r###"Cannot add selection "id" of type "U" to a selection set of type "T""###
    );
}
