use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::name;
use federation_core::FederationSchema;
use federation_core::error::SingleFederationError;
use federation_core::schema::built_ins::GRAPHQL_BUILT_INS;
use federation_core::schema::definitions::AppliedDirective;
use federation_core::schema::definitions::TypeDefinition;
use federation_core::schema::definitions::TypeKind;
use federation_core::schema::position::DirectiveTargetPosition;
use federation_core::schema::position::FieldDefinitionPosition;
use federation_core::schema::position::TypeDefinitionPosition;
use federation_core::schema::position::TypeReferencer;
use federation_core::schema::position::UnionMemberPosition;
use indexmap::IndexSet;
use pretty_assertions::assert_eq;

const SCHEMA: &str = r#"
type Query {
  product(id: ID): Product
  search: [SearchResult]
}

interface Node {
  id: ID!
}

type Product implements Node {
  id: ID!
  related: [Product]
}

type Review {
  product: Product!
}

union SearchResult = Product | Review
"#;

fn schema() -> FederationSchema {
    FederationSchema::parse(SCHEMA, GRAPHQL_BUILT_INS).unwrap()
}

fn field(type_name: Name, field_name: Name) -> FieldDefinitionPosition {
    TypeDefinitionPosition::new(type_name).field(field_name)
}

fn referencers(schema: &FederationSchema, type_name: &str) -> IndexSet<TypeReferencer> {
    schema
        .referencers()
        .type_referencers(type_name)
        .cloned()
        .unwrap_or_default()
}

fn product_referencers() -> IndexSet<TypeReferencer> {
    IndexSet::from([
        field(name!("Query"), name!("product")).into(),
        field(name!("Product"), name!("related")).into(),
        field(name!("Review"), name!("product")).into(),
        UnionMemberPosition {
            union_name: name!("SearchResult"),
            member_name: name!("Product"),
        }
        .into(),
    ])
}

#[test]
fn referencers_follow_field_types() {
    let mut schema = schema();
    assert_eq!(referencers(&schema, "Product"), product_referencers());
    assert!(
        product_referencers()
            .iter()
            .all(|referencer| referencer.points_to(&schema, "Product"))
    );

    let review_product = field(name!("Review"), name!("product"));
    review_product
        .set_type(&mut schema, Some(ast::Type::Named(name!("String")).non_null()))
        .unwrap();
    assert!(!referencers(&schema, "Product").contains::<TypeReferencer>(&review_product.clone().into()));
    assert!(referencers(&schema, "String").contains::<TypeReferencer>(&review_product.clone().into()));

    review_product.set_type(&mut schema, None).unwrap();
    assert!(!referencers(&schema, "String").contains::<TypeReferencer>(&review_product.into()));
}

#[test]
fn removal_returns_every_referencer_and_clears_it() {
    let mut schema = schema();
    let removed = TypeDefinitionPosition::new(name!("Product"))
        .remove(&mut schema)
        .unwrap();
    assert!(!removed.iter().any(|referencer| referencer.points_to(&schema, "Product")));
    assert_eq!(removed.into_iter().collect::<IndexSet<_>>(), product_referencers());

    assert!(schema.type_definition("Product").is_none());
    assert!(referencers(&schema, "Product").is_empty());
    for (type_name, field_name) in [("Query", "product"), ("Review", "product")] {
        let position = field(Name::new(type_name).unwrap(), Name::new(field_name).unwrap());
        assert_eq!(position.get(&schema).unwrap().ty, None, "{position} still has a type");
    }
    let Some(TypeDefinition::Union(search_result)) = schema.type_definition("SearchResult")
    else {
        panic!("SearchResult should still be a union");
    };
    assert_eq!(
        search_result.members.keys().collect::<Vec<_>>(),
        [&name!("Review")]
    );
}

#[test]
fn directive_applications_are_tracked_per_element() {
    let mut schema = schema();
    let related = field(name!("Product"), name!("related"));
    assert!(schema.referencers().directive_referencers("deprecated").is_none());

    related
        .insert_directive(
            &mut schema,
            AppliedDirective::new(
                name!("deprecated"),
                [(name!("reason"), ast::Value::String("Use search".to_owned()))],
            ),
        )
        .unwrap();
    let target = DirectiveTargetPosition::from(related.clone());
    assert_eq!(
        schema.referencers().directive_referencers("deprecated"),
        Some(&IndexSet::from([target.clone()]))
    );
    insta::assert_snapshot!(
        schema.type_definition("Product").unwrap().to_string(),
        @r###"
    type Product implements Node {
      id: ID!
      related: [Product] @deprecated(reason: "Use search")
    }
    "###
    );

    related.remove_directive_name(&mut schema, "deprecated").unwrap();
    assert!(
        !schema
            .referencers()
            .directive_referencers("deprecated")
            .is_some_and(|targets| targets.contains(&target))
    );
}

#[test]
fn recursive_removal_cascades_to_emptied_types() {
    let mut schema = schema();
    TypeDefinitionPosition::new(name!("Review"))
        .remove_recursive(&mut schema)
        .unwrap();
    assert!(schema.type_definition("Review").is_none());
    let Some(TypeDefinition::Union(search_result)) = schema.type_definition("SearchResult")
    else {
        panic!("SearchResult should still be a union");
    };
    assert_eq!(
        search_result.members.keys().collect::<Vec<_>>(),
        [&name!("Product")]
    );

    TypeDefinitionPosition::new(name!("Product"))
        .remove_recursive(&mut schema)
        .unwrap();
    // The union lost its last member, and `Query.search` went with it.
    assert!(schema.type_definition("SearchResult").is_none());
    assert!(field(name!("Query"), name!("search")).try_get(&schema).is_none());
    assert!(field(name!("Query"), name!("product")).try_get(&schema).is_none());
    assert!(schema.type_definition("Query").is_none());
}

#[test]
fn types_are_attached_once_per_name() {
    let mut schema = schema();
    let review = schema.type_definition("Review").unwrap().clone();
    let position = schema.add_type(review).unwrap();
    assert_eq!(position, TypeDefinitionPosition::new(name!("Review")));

    let error = schema
        .add_type(TypeDefinition::new(TypeKind::Object, name!("Review")))
        .unwrap_err();
    assert!(matches!(
        error.errors()[..],
        [SingleFederationError::InvalidAttachment { .. }]
    ));

    let error = schema
        .add_type(TypeDefinition::new(TypeKind::Scalar, name!("String")))
        .unwrap_err();
    insta::assert_snapshot!(error, @r###"Type "String" is a built-in type of this schema"###);
}

#[test]
fn printing_round_trips_through_the_parser() {
    let schema = schema();
    let printed = schema.to_string();
    let reparsed = FederationSchema::parse(&printed, GRAPHQL_BUILT_INS).unwrap();
    assert_eq!(reparsed.to_string(), printed);
    assert!(schema.clone().validate().is_ok());
}
