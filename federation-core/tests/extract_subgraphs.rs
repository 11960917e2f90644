use apollo_compiler::Name;
use federation_core::ExtractSubgraphsOptions;
use federation_core::Supergraph;
use federation_core::ValidSubgraph;
use federation_core::error::SingleFederationError;
use federation_core::schema::definitions::AppliedDirective;
use federation_core::schema::definitions::FieldDefinition;
use federation_core::schema::definitions::TypeDefinition;
use federation_core::schema::position::TypeDefinitionPosition;
use pretty_assertions::assert_eq;
use rstest::rstest;

const JOIN_V0_1: &str = r#"
schema
  @core(feature: "https://specs.apollo.dev/core/v0.1")
  @core(feature: "https://specs.apollo.dev/join/v0.1")
{
  query: Query
}

directive @core(feature: String!, as: String) repeatable on SCHEMA
directive @join__field(graph: join__Graph, requires: join__FieldSet, provides: join__FieldSet) on FIELD_DEFINITION
directive @join__type(graph: join__Graph!, key: join__FieldSet) repeatable on OBJECT | INTERFACE
directive @join__owner(graph: join__Graph!) on OBJECT | INTERFACE | FIELD_DEFINITION
directive @join__graph(name: String!, url: String!) on ENUM_VALUE

scalar join__FieldSet

enum join__Graph {
  A @join__graph(name: "a", url: "http://a")
  B @join__graph(name: "b", url: "http://b")
}
"#;

fn supergraph(types: &str) -> Supergraph {
    Supergraph::new(&format!("{JOIN_V0_1}\n{types}")).unwrap()
}

fn type_definition<'a>(subgraph: &'a ValidSubgraph, type_name: &str) -> Option<&'a TypeDefinition> {
    subgraph.schema.type_definition(type_name)
}

fn field<'a>(
    subgraph: &'a ValidSubgraph,
    type_name: &str,
    field_name: &str,
) -> Option<&'a FieldDefinition> {
    TypeDefinitionPosition::new(Name::new(type_name).unwrap())
        .field(Name::new(field_name).unwrap())
        .try_get(&subgraph.schema)
}

fn directive_names(directives: &[AppliedDirective]) -> Vec<&str> {
    directives
        .iter()
        .map(|directive| directive.name().as_str())
        .collect()
}

fn key_field_sets(type_: &TypeDefinition) -> Vec<&str> {
    type_
        .directives()
        .iter()
        .filter(|directive| directive.name() == "key")
        .filter_map(|directive| directive.argument("fields")?.as_str())
        .collect()
}

fn entity_members(subgraph: &ValidSubgraph) -> Option<Vec<&str>> {
    match type_definition(subgraph, "_Entity")? {
        TypeDefinition::Union(union_) => {
            Some(union_.members.keys().map(|member| member.as_str()).collect())
        }
        _ => None,
    }
}

#[test]
fn fields_follow_their_join_field_graph() {
    let supergraph = supergraph(
        r#"
        type Query {
          products: [Product] @join__field(graph: A)
        }

        type Product @join__type(graph: A, key: "id") @join__type(graph: B, key: "id") {
          id: ID!
          price: Int @join__field(graph: A)
          reviewCount: Int @join__field(graph: B)
        }
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    assert_eq!(subgraphs.names().collect::<Vec<_>>(), ["a", "b"]);

    let a = subgraphs.get("a").unwrap();
    let b = subgraphs.get("b").unwrap();
    assert!(field(a, "Product", "price").is_some());
    assert!(field(a, "Product", "reviewCount").is_none());
    assert!(field(b, "Product", "price").is_none());
    assert!(field(b, "Product", "reviewCount").is_some());
    // Fields without provenance go wherever their type is.
    assert!(field(a, "Product", "id").is_some());
    assert!(field(b, "Product", "id").is_some());
    assert_eq!(key_field_sets(type_definition(b, "Product").unwrap()), ["id"]);

    insta::assert_snapshot!(a.schema.to_string(), @r###"
    type Query {
      products: [Product]
      _entities(representations: [_Any!]!): [_Entity]!
      _service: _Service!
    }

    type Product @key(fields: "id") {
      id: ID!
      price: Int
    }
    "###);
}

#[test]
fn legacy_owner_places_the_field_in_one_subgraph() {
    let supergraph = supergraph(
        r#"
        type Query {
          users: [User] @join__field(graph: A)
        }

        type User @join__type(graph: A, key: "id") @join__type(graph: B, key: "id") {
          id: ID!
          name: String @join__owner(graph: A)
          karma: Int @join__field(graph: B)
        }
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    let a = subgraphs.get("a").unwrap();
    let b = subgraphs.get("b").unwrap();
    assert!(field(a, "User", "name").is_some());
    assert!(field(b, "User", "name").is_none());
    assert!(field(b, "User", "karma").is_some());
}

#[test]
fn provided_and_required_fields_are_copied_as_external() {
    let supergraph = supergraph(
        r#"
        type Query {
          topReviews: [Review] @join__field(graph: B)
        }

        type Review @join__type(graph: B) {
          body: String
          product: Product @join__field(graph: B, provides: "name")
        }

        type Product @join__type(graph: A, key: "upc") @join__type(graph: B, key: "upc") {
          upc: String!
          name: String @join__field(graph: A)
          weight: Int @join__field(graph: A)
          shippingEstimate: Int @join__field(graph: B, requires: "weight")
        }
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    let a = subgraphs.get("a").unwrap();
    let b = subgraphs.get("b").unwrap();

    let name = field(b, "Product", "name").unwrap();
    assert_eq!(directive_names(&name.directives), ["external"]);
    let weight = field(b, "Product", "weight").unwrap();
    assert_eq!(directive_names(&weight.directives), ["external"]);
    let shipping_estimate = field(b, "Product", "shippingEstimate").unwrap();
    assert_eq!(directive_names(&shipping_estimate.directives), ["requires"]);
    let product = field(b, "Review", "product").unwrap();
    assert_eq!(directive_names(&product.directives), ["provides"]);

    // The owning subgraph resolves those fields itself.
    assert!(field(a, "Product", "name").unwrap().directives.is_empty());
    assert!(type_definition(a, "Review").is_none());

    assert_eq!(entity_members(a), Some(vec!["Product"]));
    assert_eq!(entity_members(b), Some(vec!["Product"]));
}

#[test]
fn subgraphs_without_keys_have_no_entities() {
    let supergraph = supergraph(
        r#"
        type Query {
          hello: String @join__field(graph: A)
          version: Int @join__field(graph: B)
        }
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    for subgraph in subgraphs.iter() {
        assert_eq!(entity_members(subgraph), None);
        assert!(field(subgraph, "Query", "_entities").is_none());
        assert!(field(subgraph, "Query", "_service").is_some());
    }
}

#[test]
fn extraction_is_deterministic() {
    let supergraph = supergraph(
        r#"
        type Query {
          products: [Product] @join__field(graph: A)
          reviews: [Review] @join__field(graph: B)
        }

        type Review @join__type(graph: B) {
          body: String
          product: Product @join__field(graph: B, provides: "name")
        }

        type Product @join__type(graph: A, key: "upc") @join__type(graph: B, key: "upc") {
          upc: String!
          name: String @join__field(graph: A)
        }

        enum Color {
          RED
          GREEN
        }

        union Searchable = Product | Review
        "#,
    );
    let first = supergraph.extract_subgraphs().unwrap();
    let second = supergraph.extract_subgraphs().unwrap();
    for (first, second) in first.iter().zip(second.iter()) {
        assert_eq!(first.schema.to_string(), second.schema.to_string());
    }
    assert_eq!(first, second);
}

#[test]
fn enum_values_and_union_members_go_to_every_subgraph_with_the_type() {
    let supergraph = supergraph(
        r#"
        type Query {
          search: [Searchable] @join__field(graph: A)
          favoriteColor: Color @join__field(graph: B)
        }

        type Review @join__type(graph: A) @join__type(graph: B) {
          body: String
        }

        type Product @join__type(graph: A) {
          upc: String!
        }

        enum Color {
          RED
          GREEN
        }

        union Searchable = Product | Review
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    let a = subgraphs.get("a").unwrap();
    let b = subgraphs.get("b").unwrap();

    let Some(TypeDefinition::Union(searchable)) = type_definition(a, "Searchable") else {
        panic!("subgraph a should have the Searchable union");
    };
    assert_eq!(
        searchable.members.keys().map(|m| m.as_str()).collect::<Vec<_>>(),
        ["Product", "Review"]
    );
    // Only the members b has.
    let Some(TypeDefinition::Union(searchable)) = type_definition(b, "Searchable") else {
        panic!("subgraph b should have the Searchable union");
    };
    assert_eq!(
        searchable.members.keys().map(|m| m.as_str()).collect::<Vec<_>>(),
        ["Review"]
    );
    for subgraph in [a, b] {
        let Some(TypeDefinition::Enum(color)) = type_definition(subgraph, "Color") else {
            panic!("subgraph {} should have the Color enum", subgraph.name);
        };
        assert_eq!(
            color.values.keys().map(|v| v.as_str()).collect::<Vec<_>>(),
            ["RED", "GREEN"]
        );
    }
}

#[test]
fn implements_clauses_are_copied_without_join_implements() {
    let supergraph = supergraph(
        r#"
        type Query {
          node: Node @join__field(graph: A)
          user: User @join__field(graph: A)
        }

        interface Node {
          id: ID!
        }

        type User implements Node @join__type(graph: A, key: "id") {
          id: ID!
          name: String
        }
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    let a = subgraphs.get("a").unwrap();
    let position = TypeDefinitionPosition::new(Name::new("User").unwrap())
        .implemented_interface(Name::new("Node").unwrap());
    assert!(position.exists(&a.schema));
    assert!(type_definition(subgraphs.get("b").unwrap(), "User").is_none());
}

#[test]
fn copied_fields_keep_arguments_descriptions_and_deprecations() {
    let supergraph = supergraph(
        r#"
        type Query {
          "The most popular products"
          topProducts(first: Int = 5): [String] @join__field(graph: A)
          oldTopProducts: [String] @deprecated(reason: "Use topProducts") @join__field(graph: A)
        }
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    insta::assert_snapshot!(subgraphs.get("a").unwrap().schema.to_string(), @r###"
    type Query {
      "The most popular products"
      topProducts(first: Int = 5): [String]
      oldTopProducts: [String] @deprecated(reason: "Use topProducts")
      _service: _Service!
    }
    "###);
}

#[test]
fn empty_types_are_pruned_unless_disabled() {
    let supergraph = supergraph(
        r#"
        type Query {
          reviews: [Review] @join__field(graph: A)
        }

        type Review {
          body: String @join__field(graph: A)
        }
        "#,
    );
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    assert!(type_definition(subgraphs.get("a").unwrap(), "Review").is_some());
    assert!(type_definition(subgraphs.get("b").unwrap(), "Review").is_none());

    let error = supergraph
        .extract_subgraphs_with_options(&ExtractSubgraphsOptions {
            prune_empty_types: false,
        })
        .unwrap_err();
    insta::assert_snapshot!(error, @r###"[b] Type "Review" must define one or more members"###);
}

#[test]
fn unresolvable_key_fields_are_reported() {
    let supergraph = supergraph(
        r#"
        type Query {
          products: [Product] @join__field(graph: A)
        }

        type Product @join__type(graph: A, key: "upc") @join__type(graph: B, key: "sku") {
          upc: String! @join__field(graph: A)
        }
        "#,
    );
    let error = supergraph.extract_subgraphs().unwrap_err();
    assert!(matches!(
        error.errors()[..],
        [SingleFederationError::UnresolvableFieldSet { .. }]
    ));
    insta::assert_snapshot!(
        error,
        @r###"Field "Product.sku" is used in a field set but exists in neither the subgraph nor the supergraph"###
    );
}

#[test]
fn renamed_join_feature_is_recognized() {
    let supergraph = Supergraph::new(
        r#"
        schema
          @core(feature: "https://specs.apollo.dev/core/v0.1")
          @core(feature: "https://specs.apollo.dev/join/v0.1", as: "myjoin")
        {
          query: Query
        }

        directive @core(feature: String!, as: String) repeatable on SCHEMA
        directive @myjoin__field(graph: myjoin__Graph, requires: myjoin__FieldSet, provides: myjoin__FieldSet) on FIELD_DEFINITION
        directive @myjoin__type(graph: myjoin__Graph!, key: myjoin__FieldSet) repeatable on OBJECT | INTERFACE
        directive @myjoin__graph(name: String!, url: String!) on ENUM_VALUE

        scalar myjoin__FieldSet

        enum myjoin__Graph {
          ONLY @myjoin__graph(name: "only", url: "http://only")
        }

        type Query {
          hello: String @myjoin__field(graph: ONLY)
        }
        "#,
    )
    .unwrap();
    let subgraphs = supergraph.extract_subgraphs().unwrap();
    let only = subgraphs.get("only").unwrap();
    assert_eq!(only.url, "http://only");
    assert!(field(only, "Query", "hello").is_some());
    assert!(type_definition(only, "myjoin__Graph").is_none());
    assert!(type_definition(only, "myjoin__FieldSet").is_none());
}

#[rstest]
#[case::not_a_core_schema(
    "type Query { hello: String }",
    "Invalid supergraph: must be a core schema"
)]
#[case::without_join(
    r#"
    schema @core(feature: "https://specs.apollo.dev/core/v0.1") { query: Query }
    directive @core(feature: String!, as: String) repeatable on SCHEMA
    type Query { hello: String }
    "#,
    "Invalid supergraph: must use the join spec"
)]
#[case::unsupported_join_version(
    r#"
    schema
      @core(feature: "https://specs.apollo.dev/core/v0.1")
      @core(feature: "https://specs.apollo.dev/join/v0.3")
    {
      query: Query
    }
    directive @core(feature: String!, as: String) repeatable on SCHEMA
    type Query { hello: String }
    "#,
    "Invalid supergraph: uses unsupported join spec version 0.3 (supported versions: 0.1, 0.2)"
)]
fn rejects_supergraphs_without_a_supported_join_feature(
    #[case] schema: &str,
    #[case] message: &str,
) {
    let error = Supergraph::new(schema).unwrap_err();
    assert_eq!(error.to_string(), message);
    assert_eq!(error.errors()[0].code(), "INVALID_FEDERATION_SUPERGRAPH");
}
