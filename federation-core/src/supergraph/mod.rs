//! Rebuilds the subgraph schemas a supergraph was composed from.
//!
//! The supergraph records where each element comes from with the join feature: one value of the
//! `join__Graph` enum per subgraph, and `@join__type`/`@join__field`/`@join__implements`
//! applications (or the legacy `@join__owner`) on the elements. Extraction goes in passes:
//!
//! 1. one empty subgraph per `join__Graph` value,
//! 2. an empty shell of each type in the subgraphs it belongs to, with its `@key`s,
//! 3. the content of each type (fields, `implements` clauses, values, members),
//! 4. fields that `@key`/`@requires`/`@provides` field sets need but the subgraph does not
//!    resolve itself are copied from the supergraph and marked `@external`,
//! 5. types left empty are removed, and every subgraph is validated.
//!
//! Any failure aborts the whole extraction.

use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast::Value;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::instrument;
use tracing::trace;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::link::Link;
use crate::link::LinksMetadata;
use crate::link::join_spec_definition::JOIN_VERSIONS;
use crate::link::join_spec_definition::JoinSpecDefinition;
use crate::link::links_metadata;
use crate::link::spec::Identity;
use crate::schema::FederationSchema;
use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::EnumValueDefinition;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::SchemaRootDefinitionKind;
use crate::schema::definitions::TypeDefinition;
use crate::schema::definitions::has_directive;
use crate::schema::field_set::collect_target_fields;
use crate::schema::field_set::parse_field_set_with_accessor;
use crate::schema::position::FieldDefinitionPosition;
use crate::schema::position::SchemaRootDefinitionPosition;
use crate::schema::position::TypeDefinitionPosition;
use crate::subgraph::Subgraph;
use crate::subgraph::Subgraphs;
use crate::subgraph::ValidSubgraphs;
use crate::subgraph::spec::EXTERNAL_DIRECTIVE_NAME;
use crate::subgraph::spec::FIELDS_ARGUMENT_NAME;
use crate::subgraph::spec::KEY_DIRECTIVE_NAME;
use crate::subgraph::spec::PROVIDES_DIRECTIVE_NAME;
use crate::subgraph::spec::REQUIRES_DIRECTIVE_NAME;
use crate::utils::logging::snapshot;

/// Options of [`extract_subgraphs_from_supergraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractSubgraphsOptions {
    /// Remove the object, interface, input object and union types left without fields or members.
    ///
    /// Types without `@join__type` are added to every subgraph, so most subgraphs end up with
    /// empty types that would not validate. Only turn this off to inspect the raw extraction.
    pub prune_empty_types: bool,
}

impl Default for ExtractSubgraphsOptions {
    fn default() -> Self {
        Self {
            prune_empty_types: true,
        }
    }
}

/// The join directives of one supergraph, under the names the supergraph gives them.
struct JoinDirectives {
    spec: &'static JoinSpecDefinition,
    type_directive: Name,
    field_directive: Name,
    owner_directive: Option<Name>,
    implements_directive: Option<Name>,
}

impl JoinDirectives {
    fn applications<'a>(
        directives: &'a [AppliedDirective],
        name: &'a Name,
    ) -> impl Iterator<Item = &'a AppliedDirective> + 'a {
        directives
            .iter()
            .filter(move |directive| directive.name() == name)
    }

    /// The graph named by a `@join__owner` application, if any.
    fn owner(&self, directives: &[AppliedDirective]) -> Result<Option<Name>, FederationError> {
        let Some(owner_directive) = &self.owner_directive else {
            return Ok(None);
        };
        Self::applications(directives, owner_directive)
            .next()
            .map(|application| {
                self.spec
                    .owner_directive_arguments(application)
                    .map(|arguments| arguments.graph)
            })
            .transpose()
    }
}

/// Subgraph names by `join__Graph` value.
type GraphNames = IndexMap<Name, Arc<str>>;

fn subgraph_for<'a>(
    subgraphs: &'a mut Subgraphs,
    graph_names: &GraphNames,
    graph: &Name,
) -> Result<&'a mut Subgraph, FederationError> {
    graph_names
        .get(graph)
        .and_then(|name| subgraphs.get_mut(name))
        .ok_or_else(|| {
            SingleFederationError::InvalidFederationSupergraph {
                message: format!("Invalid graph \"{graph}\": no such value in the join graph enum"),
            }
            .into()
        })
}

fn supergraph_error(message: String) -> FederationError {
    SingleFederationError::InvalidFederationSupergraph { message }.into()
}

/// Finds the join feature of the supergraph and the definition of its version.
pub(crate) fn join_feature(
    supergraph: &FederationSchema,
) -> Result<(LinksMetadata, Arc<Link>, &'static JoinSpecDefinition), FederationError> {
    let Some(metadata) = links_metadata(supergraph)? else {
        return Err(supergraph_error(
            "Invalid supergraph: must be a core schema".to_owned(),
        ));
    };
    let Some(link) = metadata.for_identity(&Identity::join_identity()) else {
        return Err(supergraph_error(
            "Invalid supergraph: must use the join spec".to_owned(),
        ));
    };
    let Some(spec) = JOIN_VERSIONS.find(&link.url.version) else {
        return Err(supergraph_error(format!(
            "Invalid supergraph: uses unsupported join spec version {} (supported versions: {})",
            link.url.version,
            JOIN_VERSIONS.versions().map(|version| version.to_string()).join(", ")
        )));
    };
    Ok((metadata, link, spec))
}

/// Extracts every subgraph of `supergraph`.
#[instrument(skip_all)]
pub fn extract_subgraphs_from_supergraph(
    supergraph: &FederationSchema,
    options: &ExtractSubgraphsOptions,
) -> Result<ValidSubgraphs, FederationError> {
    snapshot!(options, "extraction options");
    let (metadata, link, spec) = join_feature(supergraph)?;
    debug!("Extracting subgraphs with {}", link.url);
    let join = JoinDirectives {
        spec,
        type_directive: spec.type_directive_definition(supergraph, &link)?.name.clone(),
        field_directive: spec.field_directive_definition(supergraph, &link)?.name.clone(),
        owner_directive: spec
            .owner_directive_definition(supergraph, &link)
            .map(|definition| definition.name.clone()),
        implements_directive: spec
            .implements_directive_definition(supergraph, &link)?
            .map(|definition| definition.name.clone()),
    };

    let (mut subgraphs, graph_names) = collect_empty_subgraphs(supergraph, &link, spec)?;
    debug!(
        "Registered {} subgraph(s): {}",
        graph_names.len(),
        graph_names.values().join(", ")
    );

    // Types of the features themselves (join__Graph, core__Purpose...) are not copied.
    let types: Vec<&TypeDefinition> = supergraph
        .types()
        .filter(|type_| metadata.source_link_of_type(type_.name()).is_none())
        .collect();

    add_type_shells(&types, &join, &mut subgraphs, &graph_names)?;
    trace!("Added the shells of {} type(s)", types.len());
    for type_ in &types {
        add_type_content(supergraph, type_, &join, &mut subgraphs, &graph_names)?;
    }
    for subgraph in subgraphs.iter_mut() {
        snapshot!("Subgraph", subgraph.schema.to_string(), "populated subgraph");
        add_external_fields(supergraph, subgraph)?;
    }
    trace!("Added external fields");
    if options.prune_empty_types {
        for subgraph in subgraphs.iter_mut() {
            remove_empty_types(&mut subgraph.schema)?;
        }
        trace!("Removed empty types");
    }
    for subgraph in subgraphs.iter_mut() {
        bind_root_types(supergraph, &mut subgraph.schema)?;
    }
    subgraphs.validate()
}

/// One empty subgraph per value of the join graph enum.
fn collect_empty_subgraphs(
    supergraph: &FederationSchema,
    link: &Link,
    spec: &JoinSpecDefinition,
) -> Result<(Subgraphs, GraphNames), FederationError> {
    let graph_enum = spec.graph_enum_definition(supergraph, link)?;
    let graph_directive = spec.graph_directive_definition(supergraph, link)?;
    let mut subgraphs = Subgraphs::new();
    let mut graph_names = GraphNames::new();
    for value in graph_enum.values.values() {
        let Some(application) =
            JoinDirectives::applications(&value.directives, &graph_directive.name).next()
        else {
            return Err(supergraph_error(format!(
                "Value \"{}\" of the join graph enum has no @{} application",
                value.value, graph_directive.name
            )));
        };
        let arguments = spec.graph_directive_arguments(application)?;
        subgraphs.add(Subgraph::empty(arguments.name, arguments.url)?)?;
        graph_names.insert(value.value.clone(), Arc::from(arguments.name));
    }
    Ok((subgraphs, graph_names))
}

fn add_type_shells(
    types: &[&TypeDefinition],
    join: &JoinDirectives,
    subgraphs: &mut Subgraphs,
    graph_names: &GraphNames,
) -> Result<(), FederationError> {
    for type_ in types {
        let position = TypeDefinitionPosition::new(type_.name().clone());
        let applications: Vec<&AppliedDirective> =
            JoinDirectives::applications(type_.directives(), &join.type_directive).collect();
        if applications.is_empty() {
            // Without provenance the type may be anywhere. Subgraphs that do not use it end up
            // with an empty or unreachable type.
            for subgraph in subgraphs.iter_mut() {
                if !subgraph.schema.is_built_in_type(type_.name()) {
                    subgraph.schema.add_type(type_.shell())?;
                }
            }
            continue;
        }
        for application in applications {
            let arguments = join.spec.type_directive_arguments(application)?;
            let subgraph = subgraph_for(subgraphs, graph_names, &arguments.graph)?;
            let schema = &mut subgraph.schema;
            if schema.is_built_in_type(type_.name()) {
                continue;
            }
            if position.try_get(schema).is_none() {
                schema.add_type(type_.shell())?;
            }
            let Some(key) = arguments.key else {
                continue;
            };
            // Keys declared on a type extension keep their provenance: the key fields of such a
            // type are never marked external.
            let extension = if arguments.extension {
                Some(position.new_extension(schema)?)
            } else {
                None
            };
            position.insert_directive(
                schema,
                AppliedDirective::new(
                    KEY_DIRECTIVE_NAME,
                    [(FIELDS_ARGUMENT_NAME, Value::String(key.to_owned()))],
                )
                .in_extension(extension),
            )?;
        }
    }
    Ok(())
}

fn add_type_content(
    supergraph: &FederationSchema,
    type_: &TypeDefinition,
    join: &JoinDirectives,
    subgraphs: &mut Subgraphs,
    graph_names: &GraphNames,
) -> Result<(), FederationError> {
    let position = TypeDefinitionPosition::new(type_.name().clone());
    match type_ {
        TypeDefinition::Scalar(_) => {}
        TypeDefinition::Object(object) | TypeDefinition::Interface(object) => {
            add_implemented_interfaces(supergraph, type_, join, subgraphs, graph_names)?;
            let type_owner = join.owner(&object.directives)?;
            for field in object.fields.values() {
                add_field(&position, field, type_owner.as_ref(), join, subgraphs, graph_names)?;
            }
        }
        TypeDefinition::InputObject(input_object) => {
            for field in input_object.fields.values() {
                let applications: Vec<&AppliedDirective> =
                    JoinDirectives::applications(&field.directives, &join.field_directive)
                        .collect();
                let field_position = position.input_field(field.name.clone());
                if applications.is_empty() {
                    for subgraph in subgraphs.iter_mut() {
                        if position.try_get(&subgraph.schema).is_some() {
                            let copy = copy_input_value(&subgraph.schema, field);
                            field_position.insert(&mut subgraph.schema, copy)?;
                        }
                    }
                    continue;
                }
                for application in applications {
                    let arguments = join.spec.field_directive_arguments(application)?;
                    let Some(graph) = arguments.graph else {
                        continue;
                    };
                    let subgraph = subgraph_for(subgraphs, graph_names, &graph)?;
                    if field_position.try_get(&subgraph.schema).is_none() {
                        let copy = copy_input_value(&subgraph.schema, field);
                        field_position.insert(&mut subgraph.schema, copy)?;
                    }
                }
            }
        }
        // Values and members are not tracked per subgraph by the join feature: every subgraph
        // with the type gets all of them.
        TypeDefinition::Enum(enum_) => {
            for subgraph in subgraphs.iter_mut() {
                if !matches!(
                    position.try_get(&subgraph.schema),
                    Some(TypeDefinition::Enum(_))
                ) || subgraph.schema.is_built_in_type(type_.name())
                {
                    continue;
                }
                for value in enum_.values.values() {
                    let copy = EnumValueDefinition {
                        description: value.description.clone(),
                        value: value.value.clone(),
                        directives: copy_directives(&subgraph.schema, &value.directives),
                        extension: None,
                    };
                    position
                        .enum_value(value.value.clone())
                        .insert(&mut subgraph.schema, copy)?;
                }
            }
        }
        TypeDefinition::Union(union_) => {
            for subgraph in subgraphs.iter_mut() {
                if !matches!(
                    position.try_get(&subgraph.schema),
                    Some(TypeDefinition::Union(_))
                ) || subgraph.schema.is_built_in_type(type_.name())
                {
                    continue;
                }
                for member in union_.members.keys() {
                    if subgraph.schema.type_definition(member).is_some() {
                        position
                            .union_member(member.clone())
                            .insert(&mut subgraph.schema, None)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn add_implemented_interfaces(
    supergraph: &FederationSchema,
    type_: &TypeDefinition,
    join: &JoinDirectives,
    subgraphs: &mut Subgraphs,
    graph_names: &GraphNames,
) -> Result<(), FederationError> {
    let position = TypeDefinitionPosition::new(type_.name().clone());
    let Some(implements_directive) = &join.implements_directive else {
        // Without `@join__implements`, an interface is implemented wherever both types are.
        let (TypeDefinition::Object(object) | TypeDefinition::Interface(object)) = type_ else {
            return Ok(());
        };
        for subgraph in subgraphs.iter_mut() {
            if position.try_get(&subgraph.schema).is_none() {
                continue;
            }
            for interface_name in object.implements_interfaces.keys() {
                let implemented = position.implemented_interface(interface_name.clone());
                if subgraph.schema.type_definition(interface_name).is_some()
                    && !implemented.exists(&subgraph.schema)
                {
                    implemented.insert(&mut subgraph.schema, None)?;
                }
            }
        }
        return Ok(());
    };
    for application in JoinDirectives::applications(type_.directives(), implements_directive) {
        let arguments = join.spec.implements_directive_arguments(application)?;
        let interface_name = Name::new(arguments.interface).map_err(|_| {
            supergraph_error(format!(
                "Invalid interface name \"{}\" in @{implements_directive} on \"{}\"",
                arguments.interface,
                type_.name()
            ))
        })?;
        if supergraph.type_definition(&interface_name).is_none() {
            return Err(supergraph_error(format!(
                "Type \"{}\" implements unknown interface \"{interface_name}\"",
                type_.name()
            )));
        }
        let subgraph = subgraph_for(subgraphs, graph_names, &arguments.graph)?;
        let implemented = position.implemented_interface(interface_name);
        if !implemented.exists(&subgraph.schema) {
            implemented.insert(&mut subgraph.schema, None)?;
        }
    }
    Ok(())
}

fn add_field(
    parent: &TypeDefinitionPosition,
    field: &FieldDefinition,
    type_owner: Option<&Name>,
    join: &JoinDirectives,
    subgraphs: &mut Subgraphs,
    graph_names: &GraphNames,
) -> Result<(), FederationError> {
    let position = parent.field(field.name.clone());
    let applications: Vec<&AppliedDirective> =
        JoinDirectives::applications(&field.directives, &join.field_directive).collect();
    if applications.is_empty() {
        let owner = join.owner(&field.directives)?;
        match owner.as_ref().or(type_owner) {
            Some(owner) => {
                let subgraph = subgraph_for(subgraphs, graph_names, owner)?;
                add_subgraph_field(&mut subgraph.schema, &position, field)?;
            }
            None => {
                for subgraph in subgraphs.iter_mut() {
                    if parent.try_get(&subgraph.schema).is_some() {
                        add_subgraph_field(&mut subgraph.schema, &position, field)?;
                    }
                }
            }
        }
        return Ok(());
    }

    for application in applications {
        let arguments = join.spec.field_directive_arguments(application)?;
        let Some(graph) = arguments.graph else {
            continue;
        };
        let subgraph = subgraph_for(subgraphs, graph_names, &graph)?;
        if parent.try_get(&subgraph.schema).is_none() {
            return Err(supergraph_error(format!(
                "Field \"{position}\" is joined to subgraph \"{}\", which does not have type \"{parent}\"",
                subgraph.name
            )));
        }
        let schema = &mut subgraph.schema;
        if position.try_get(schema).is_none() {
            add_subgraph_field(schema, &position, field)?;
        }
        for (directive_name, field_set) in [
            (REQUIRES_DIRECTIVE_NAME, arguments.requires),
            (PROVIDES_DIRECTIVE_NAME, arguments.provides),
        ] {
            let Some(field_set) = field_set else {
                continue;
            };
            position.insert_directive(
                schema,
                AppliedDirective::new(
                    directive_name,
                    [(FIELDS_ARGUMENT_NAME, Value::String(field_set.to_owned()))],
                ),
            )?;
        }
    }
    Ok(())
}

/// Directive applications a subgraph knows the definition of. Join applications never qualify.
fn copy_directives(
    subgraph: &FederationSchema,
    directives: &[AppliedDirective],
) -> Vec<AppliedDirective> {
    directives
        .iter()
        .filter(|directive| subgraph.directive_definition(directive.name()).is_some())
        .map(|directive| AppliedDirective::from_node(directive.node.clone()))
        .collect()
}

fn copy_input_value(
    subgraph: &FederationSchema,
    value: &InputValueDefinition,
) -> InputValueDefinition {
    InputValueDefinition {
        description: value.description.clone(),
        name: value.name.clone(),
        ty: value.ty.clone(),
        default_value: value.default_value.clone(),
        directives: copy_directives(subgraph, &value.directives),
        extension: None,
    }
}

fn add_subgraph_field(
    subgraph: &mut FederationSchema,
    position: &FieldDefinitionPosition,
    field: &FieldDefinition,
) -> Result<(), FederationError> {
    let copy = FieldDefinition {
        description: field.description.clone(),
        name: field.name.clone(),
        arguments: field
            .arguments
            .iter()
            .map(|(name, argument)| (name.clone(), copy_input_value(subgraph, argument)))
            .collect(),
        ty: field.ty.clone(),
        directives: copy_directives(subgraph, &field.directives),
        extension: None,
    };
    position.insert(subgraph, copy)
}

/// A field set to resolve in a subgraph: `@key` on a type, or `@requires`/`@provides` on a field.
struct FieldSetUsage {
    parent_type: Name,
    field_set: String,
    /// Fields already present keep no `@external`, and fields copied over are not marked.
    force_non_external: bool,
}

fn field_set_argument(directive: &AppliedDirective) -> Option<String> {
    directive
        .argument(&FIELDS_ARGUMENT_NAME)
        .and_then(|value| value.as_str())
        .map(ToOwned::to_owned)
}

fn field_set_usages(schema: &FederationSchema) -> Vec<FieldSetUsage> {
    let mut usages = Vec::new();
    for type_ in schema.types() {
        let (TypeDefinition::Object(object) | TypeDefinition::Interface(object)) = type_ else {
            continue;
        };
        for key in JoinDirectives::applications(&object.directives, &KEY_DIRECTIVE_NAME) {
            if let Some(field_set) = field_set_argument(key) {
                usages.push(FieldSetUsage {
                    parent_type: object.name.clone(),
                    field_set,
                    force_non_external: key.extension.is_some(),
                });
            }
        }
        for field in object.fields.values() {
            for requires in JoinDirectives::applications(&field.directives, &REQUIRES_DIRECTIVE_NAME)
            {
                if let Some(field_set) = field_set_argument(requires) {
                    usages.push(FieldSetUsage {
                        parent_type: object.name.clone(),
                        field_set,
                        force_non_external: false,
                    });
                }
            }
            // Provided fields are selected on the field's own type.
            let Some(output_type) = field.ty.as_ref().map(|ty| ty.inner_named_type()) else {
                continue;
            };
            for provides in JoinDirectives::applications(&field.directives, &PROVIDES_DIRECTIVE_NAME)
            {
                if let Some(field_set) = field_set_argument(provides) {
                    usages.push(FieldSetUsage {
                        parent_type: output_type.clone(),
                        field_set,
                        force_non_external: false,
                    });
                }
            }
        }
    }
    usages
}

/// Makes every field named by a field set of the subgraph resolvable in it.
fn add_external_fields(
    supergraph: &FederationSchema,
    subgraph: &mut Subgraph,
) -> Result<(), FederationError> {
    for usage in field_set_usages(&subgraph.schema) {
        let force_non_external = usage.force_non_external;
        let mut accessor = |schema: &mut FederationSchema,
                            position: &FieldDefinitionPosition|
         -> Result<(), FederationError> {
            if let Some(field) = position.try_get(schema) {
                if force_non_external && has_directive(&field.directives, &EXTERNAL_DIRECTIVE_NAME)
                {
                    position.remove_directive_name(schema, &EXTERNAL_DIRECTIVE_NAME)?;
                }
                return Ok(());
            }
            let Some(supergraph_field) = position.try_get(supergraph) else {
                return Err(SingleFederationError::UnresolvableFieldSet {
                    message: format!(
                        "Field \"{position}\" is used in a field set but exists in neither the subgraph nor the supergraph"
                    ),
                }
                .into());
            };
            add_subgraph_field(schema, position, supergraph_field)?;
            if !force_non_external {
                position.insert_directive(
                    schema,
                    AppliedDirective::new(EXTERNAL_DIRECTIVE_NAME, []),
                )?;
            }
            Ok(())
        };
        let selection_set = parse_field_set_with_accessor(
            &mut subgraph.schema,
            &usage.parent_type,
            &usage.field_set,
            &mut accessor,
        )
        .map_err(|error| -> FederationError {
            match error {
                FederationError::SingleFederationError(
                    error @ SingleFederationError::UnresolvableFieldSet { .. },
                ) => error.into(),
                error => SingleFederationError::InvalidSubgraph {
                    subgraph: subgraph.name.clone(),
                    message: error.to_string(),
                }
                .into(),
            }
        })?;
        trace!(
            "Resolved field set \"{}\" on \"{}\" in subgraph \"{}\": {}",
            usage.field_set,
            usage.parent_type,
            subgraph.name,
            collect_target_fields(&selection_set).iter().join(", ")
        );
    }
    Ok(())
}

/// Binds the supergraph's root types the subgraph kept.
fn bind_root_types(
    supergraph: &FederationSchema,
    schema: &mut FederationSchema,
) -> Result<(), FederationError> {
    for root_kind in SchemaRootDefinitionKind::ALL {
        let Some(type_name) = supergraph.root_type_name(root_kind) else {
            continue;
        };
        let position = SchemaRootDefinitionPosition { root_kind };
        if schema.type_definition(type_name).is_some() && position.try_get(schema).is_none() {
            position.insert(schema, type_name.clone(), None)?;
        }
    }
    Ok(())
}

/// Removes the types left without fields or members, along with what referenced them.
fn remove_empty_types(schema: &mut FederationSchema) -> Result<(), FederationError> {
    for position in schema.get_types() {
        position.remove_if_empty(schema)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;

    const JOIN_V0_1_DEFINITIONS: &str = r#"
    directive @core(feature: String!, as: String) repeatable on SCHEMA
    directive @join__graph(name: String!, url: String!) on ENUM_VALUE
    directive @join__type(graph: join__Graph!, key: join__FieldSet) repeatable on OBJECT | INTERFACE
    directive @join__field(graph: join__Graph, requires: join__FieldSet, provides: join__FieldSet) on FIELD_DEFINITION
    directive @join__owner(graph: join__Graph!) on OBJECT | INTERFACE

    scalar join__FieldSet
    "#;

    fn supergraph(body: &str) -> FederationSchema {
        FederationSchema::parse(
            &format!(
                r#"
                schema
                  @core(feature: "https://specs.apollo.dev/core/v0.1")
                  @core(feature: "https://specs.apollo.dev/join/v0.1")
                {{
                  query: Query
                }}
                {JOIN_V0_1_DEFINITIONS}
                enum join__Graph {{
                  A @join__graph(name: "a", url: "http://a")
                  B @join__graph(name: "b", url: "http://b")
                }}
                {body}
                "#
            ),
            GRAPHQL_BUILT_INS,
        )
        .unwrap()
    }

    #[test]
    fn feature_types_are_not_extracted() {
        let supergraph = supergraph(
            r#"
            type Query {
              hello: String @join__field(graph: A)
            }
            "#,
        );
        let subgraphs =
            extract_subgraphs_from_supergraph(&supergraph, &ExtractSubgraphsOptions::default())
                .unwrap();
        assert_eq!(subgraphs.names().collect::<Vec<_>>(), ["a", "b"]);
        let a = subgraphs.get("a").unwrap();
        assert_eq!(a.url, "http://a");
        assert!(a.schema.type_definition("join__Graph").is_none());
        assert!(a.schema.type_definition("join__FieldSet").is_none());
        insta::assert_snapshot!(a.schema.to_string(), @r###"
        type Query {
          hello: String
          _service: _Service!
        }
        "###);
        insta::assert_snapshot!(subgraphs.get("b").unwrap().schema.to_string(), @r###"
        type Query {
          _service: _Service!
        }
        "###);
    }

    #[test]
    fn type_level_owner_places_unannotated_fields() {
        let supergraph = supergraph(
            r#"
            type Query {
              me: User @join__field(graph: A)
            }

            type User @join__owner(graph: A) @join__type(graph: A, key: "id") @join__type(graph: B, key: "id") {
              id: ID!
              name: String
              reviews: [String] @join__field(graph: B)
            }
            "#,
        );
        let subgraphs =
            extract_subgraphs_from_supergraph(&supergraph, &ExtractSubgraphsOptions::default())
                .unwrap();
        // The query root lost its fields to `a` and was recreated.
        insta::assert_snapshot!(subgraphs.get("b").unwrap().schema.to_string(), @r###"
        type User @key(fields: "id") {
          reviews: [String]
          id: ID! @external
        }

        type Query {
          _entities(representations: [_Any!]!): [_Entity]!
          _service: _Service!
        }
        "###);
    }

    #[test]
    fn extension_keys_are_not_external() {
        let supergraph = FederationSchema::parse(
            r#"
            schema
              @core(feature: "https://specs.apollo.dev/core/v0.2")
              @core(feature: "https://specs.apollo.dev/join/v0.2")
            {
              query: Query
            }

            directive @core(feature: String!, as: String) repeatable on SCHEMA
            directive @join__graph(name: String!, url: String!) on ENUM_VALUE
            directive @join__type(graph: join__Graph!, key: join__FieldSet, extension: Boolean = false) repeatable on OBJECT | INTERFACE
            directive @join__field(graph: join__Graph, requires: join__FieldSet, provides: join__FieldSet) repeatable on FIELD_DEFINITION
            directive @join__implements(graph: join__Graph!, interface: String!) repeatable on OBJECT | INTERFACE

            scalar join__FieldSet

            enum join__Graph {
              A @join__graph(name: "a", url: "http://a")
              B @join__graph(name: "b", url: "http://b")
            }

            type Query @join__type(graph: A) @join__type(graph: B) {
              product: Product @join__field(graph: A)
            }

            type Product @join__type(graph: A, key: "upc") @join__type(graph: B, key: "upc", extension: true) {
              upc: String! @join__field(graph: A)
              weight: Int @join__field(graph: B)
            }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        let subgraphs =
            extract_subgraphs_from_supergraph(&supergraph, &ExtractSubgraphsOptions::default())
                .unwrap();
        insta::assert_snapshot!(subgraphs.get("b").unwrap().schema.to_string(), @r###"
        type Product {
          weight: Int
          upc: String!
        }

        extend type Product @key(fields: "upc")

        type Query {
          _entities(representations: [_Any!]!): [_Entity]!
          _service: _Service!
        }
        "###);
    }

    #[test]
    fn rejects_supergraphs_without_join() {
        let supergraph = FederationSchema::parse(
            r#"
            schema @core(feature: "https://specs.apollo.dev/core/v0.1") { query: Query }
            directive @core(feature: String!, as: String) repeatable on SCHEMA
            type Query { hello: String }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        let error =
            extract_subgraphs_from_supergraph(&supergraph, &ExtractSubgraphsOptions::default())
                .unwrap_err();
        insta::assert_snapshot!(error, @"Invalid supergraph: must use the join spec");

        let plain = FederationSchema::parse("type Query { hello: String }", GRAPHQL_BUILT_INS)
            .unwrap();
        let error = extract_subgraphs_from_supergraph(&plain, &ExtractSubgraphsOptions::default())
            .unwrap_err();
        insta::assert_snapshot!(error, @"Invalid supergraph: must be a core schema");
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ExtractSubgraphsOptions = serde_json::from_str("{}").unwrap();
        assert!(options.prune_empty_types);
        let options: ExtractSubgraphsOptions =
            serde_json::from_str(r#"{ "pruneEmptyTypes": false }"#).unwrap();
        assert!(!options.prune_empty_types);
    }
}
