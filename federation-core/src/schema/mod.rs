use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast;
use indexmap::IndexMap;
use indexmap::IndexSet;
use referencer::Referencers;
use tracing::instrument;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::schema::built_ins::BuiltIns;
use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::DirectiveDefinition;
use crate::schema::definitions::ExtensionId;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::SchemaDefinition;
use crate::schema::definitions::SchemaRootDefinitionKind;
use crate::schema::definitions::TypeDefinition;
use crate::schema::position::DirectiveDefinitionPosition;
use crate::schema::position::SchemaDefinitionPosition;
use crate::schema::position::SchemaRootDefinitionPosition;
use crate::schema::position::TypeDefinitionPosition;
use crate::schema::position::TypeReferencer;

pub mod built_ins;
pub mod definitions;
pub(crate) mod field_set;
pub(crate) mod from_ast;
pub mod position;
mod printer;
pub mod referencer;
mod validation;
pub(crate) mod values;

/// A mutable GraphQL type system.
///
/// Types and directive definitions are kept in two registries each: the built-ins installed by
/// the schema's [`BuiltIns`] during bootstrap, and the regular definitions added afterwards. Once
/// bootstrap is over the schema is `constructed`, and built-ins can no longer be added or modified
/// except from within the built-ins' own validation hook.
///
/// Every element that names a type or applies a directive is recorded in the schema's
/// [`Referencers`], which is what allows [`TypeDefinitionPosition::remove`] to leave no dangling
/// reference behind.
#[derive(Debug, Clone)]
pub struct FederationSchema {
    built_ins: &'static dyn BuiltIns,
    built_in_types: IndexMap<Name, TypeDefinition>,
    types: IndexMap<Name, TypeDefinition>,
    built_in_directive_definitions: IndexMap<Name, DirectiveDefinition>,
    directive_definitions: IndexMap<Name, DirectiveDefinition>,
    schema_definition: SchemaDefinition,
    referencers: Referencers,
    constructed: bool,
    built_in_modification_allowed: bool,
    next_extension_id: u32,
}

impl PartialEq for FederationSchema {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
            && self.directive_definitions == other.directive_definitions
            && self.schema_definition == other.schema_definition
            && self.built_in_types == other.built_in_types
            && self.built_in_directive_definitions == other.built_in_directive_definitions
    }
}

impl FederationSchema {
    /// An empty schema holding only the given built-ins.
    pub fn new(built_ins: &'static dyn BuiltIns) -> Result<Self, FederationError> {
        let mut schema = FederationSchema {
            built_ins,
            built_in_types: IndexMap::new(),
            types: IndexMap::new(),
            built_in_directive_definitions: IndexMap::new(),
            directive_definitions: IndexMap::new(),
            schema_definition: SchemaDefinition::default(),
            referencers: Referencers::default(),
            constructed: false,
            built_in_modification_allowed: false,
            next_extension_id: 0,
        };
        built_ins.add_built_in_types(&mut schema)?;
        built_ins.add_built_in_directives(&mut schema)?;
        schema.constructed = true;
        Ok(schema)
    }

    /// Builds a schema from SDL on top of the given built-ins.
    pub fn parse(sdl: &str, built_ins: &'static dyn BuiltIns) -> Result<Self, FederationError> {
        let document = ast::Document::parse(sdl, "schema.graphql").map_err(|e| {
            SingleFederationError::InvalidGraphQL {
                message: e.errors.to_string(),
            }
        })?;
        let mut schema = FederationSchema::new(built_ins)?;
        from_ast::add_document(&mut schema, &document, from_ast::BuildMode::Regular)?;
        Ok(schema)
    }

    pub fn built_ins(&self) -> &'static dyn BuiltIns {
        self.built_ins
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn referencers(&self) -> &Referencers {
        &self.referencers
    }

    /// Looks a type up among the regular types, then among the built-ins.
    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types
            .get(name)
            .or_else(|| self.built_in_types.get(name))
    }

    pub fn is_built_in_type(&self, name: &str) -> bool {
        !self.types.contains_key(name) && self.built_in_types.contains_key(name)
    }

    /// The regular (non-built-in) types, in insertion order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn built_in_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.built_in_types.values()
    }

    pub fn get_types(&self) -> Vec<TypeDefinitionPosition> {
        self.types
            .keys()
            .map(|type_name| TypeDefinitionPosition::new(type_name.clone()))
            .collect()
    }

    /// Looks a directive definition up among the regular definitions, then among the built-ins.
    pub fn directive_definition(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.directive_definitions
            .get(name)
            .or_else(|| self.built_in_directive_definitions.get(name))
    }

    pub fn is_built_in_directive(&self, name: &str) -> bool {
        !self.directive_definitions.contains_key(name)
            && self.built_in_directive_definitions.contains_key(name)
    }

    pub fn directive_definitions(&self) -> impl Iterator<Item = &DirectiveDefinition> {
        self.directive_definitions.values()
    }

    pub fn built_in_directive_definitions(&self) -> impl Iterator<Item = &DirectiveDefinition> {
        self.built_in_directive_definitions.values()
    }

    pub fn schema_definition(&self) -> &SchemaDefinition {
        &self.schema_definition
    }

    pub fn root_type_name(&self, kind: SchemaRootDefinitionKind) -> Option<&Name> {
        self.schema_definition.root(kind)
    }

    /// Adds a regular type, along with everything it contains.
    ///
    /// Adding a definition identical to the one already registered under the same name is a
    /// no-op; any other name clash is an error.
    pub fn add_type(
        &mut self,
        type_: TypeDefinition,
    ) -> Result<TypeDefinitionPosition, FederationError> {
        let position = TypeDefinitionPosition::new(type_.name().clone());
        if let Some(existing) = self.types.get(type_.name()) {
            if *existing == type_ {
                return Ok(position);
            }
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Type \"{position}\" already exists in this schema"),
            }
            .into());
        }
        if self.built_in_types.contains_key(type_.name()) {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Type \"{position}\" is a built-in type of this schema"),
            }
            .into());
        }
        self.check_type_contents(&type_)?;
        self.reserve_extension_ids(type_.extensions());
        self.referencers.add_type_references(&type_);
        self.types.insert(type_.name().clone(), type_);
        Ok(position)
    }

    /// Adds a built-in type. Only allowed during bootstrap.
    pub fn add_built_in_type(
        &mut self,
        type_: TypeDefinition,
    ) -> Result<TypeDefinitionPosition, FederationError> {
        let position = TypeDefinitionPosition::new(type_.name().clone());
        if !self.built_in_updates_allowed() {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!(
                    "Cannot add built-in type \"{position}\" to a schema that is already constructed"
                ),
            }
            .into());
        }
        if self.type_definition(type_.name()).is_some() {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Type \"{position}\" already exists in this schema"),
            }
            .into());
        }
        self.check_type_contents(&type_)?;
        self.reserve_extension_ids(type_.extensions());
        self.referencers.add_type_references(&type_);
        self.built_in_types.insert(type_.name().clone(), type_);
        Ok(position)
    }

    pub fn add_directive_definition(
        &mut self,
        definition: DirectiveDefinition,
    ) -> Result<DirectiveDefinitionPosition, FederationError> {
        let position = DirectiveDefinitionPosition {
            directive_name: definition.name.clone(),
        };
        if let Some(existing) = self.directive_definitions.get(&definition.name) {
            if *existing == definition {
                return Ok(position);
            }
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Directive \"{position}\" already exists in this schema"),
            }
            .into());
        }
        if self.built_in_directive_definitions.contains_key(&definition.name) {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Directive \"{position}\" is a built-in directive of this schema"),
            }
            .into());
        }
        self.check_directive_definition(&definition)?;
        self.referencers
            .add_directive_definition_references(&definition);
        self.directive_definitions
            .insert(definition.name.clone(), definition);
        Ok(position)
    }

    /// Adds a built-in directive definition. Only allowed during bootstrap.
    pub fn add_built_in_directive_definition(
        &mut self,
        definition: DirectiveDefinition,
    ) -> Result<DirectiveDefinitionPosition, FederationError> {
        let position = DirectiveDefinitionPosition {
            directive_name: definition.name.clone(),
        };
        if !self.built_in_updates_allowed() {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!(
                    "Cannot add built-in directive \"{position}\" to a schema that is already constructed"
                ),
            }
            .into());
        }
        if self.directive_definition(&definition.name).is_some() {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Directive \"{position}\" already exists in this schema"),
            }
            .into());
        }
        self.check_directive_definition(&definition)?;
        self.referencers
            .add_directive_definition_references(&definition);
        self.built_in_directive_definitions
            .insert(definition.name.clone(), definition);
        Ok(position)
    }

    /// The object types a value of the given composite type can be at runtime.
    pub fn possible_runtime_types(&self, type_name: &str) -> IndexSet<Name> {
        let is_object =
            |name: &Name| matches!(self.type_definition(name), Some(TypeDefinition::Object(_)));
        match self.type_definition(type_name) {
            Some(TypeDefinition::Object(type_)) => IndexSet::from([type_.name.clone()]),
            Some(TypeDefinition::Interface(_)) => self
                .referencers
                .types
                .get(type_name)
                .into_iter()
                .flatten()
                .filter_map(|referencer| match referencer {
                    TypeReferencer::ImplementedInterface(position)
                        if is_object(&position.type_name) =>
                    {
                        Some(position.type_name.clone())
                    }
                    _ => None,
                })
                .collect(),
            Some(TypeDefinition::Union(type_)) => type_
                .members
                .keys()
                .filter(|name| is_object(name))
                .cloned()
                .collect(),
            _ => IndexSet::new(),
        }
    }

    /// Deep-copies this schema onto a fresh bootstrap of `built_ins`.
    ///
    /// Regular types and directive definitions whose names are built-ins of the target are
    /// skipped, the target's version wins. Extension identities are reallocated in the copy.
    pub fn clone_with_built_ins(
        &self,
        built_ins: &'static dyn BuiltIns,
    ) -> Result<FederationSchema, FederationError> {
        let mut target = FederationSchema::new(built_ins)?;
        let mut extensions: IndexMap<ExtensionId, ExtensionId> = IndexMap::new();
        let copied_types: Vec<&TypeDefinition> = self
            .types
            .values()
            .filter(|type_| !target.built_in_types.contains_key(type_.name()))
            .collect();

        for type_ in &copied_types {
            let position = target.add_type(type_.shell())?;
            for extension in type_.extensions() {
                extensions.insert(*extension, position.new_extension(&mut target)?);
            }
        }
        let copied_directives: Vec<&DirectiveDefinition> = self
            .directive_definitions
            .values()
            .filter(|definition| {
                !target
                    .built_in_directive_definitions
                    .contains_key(&definition.name)
            })
            .collect();
        copy_directive_definitions(&mut target, copied_directives.iter().copied(), false)?;

        let schema_position = SchemaDefinitionPosition;
        target.schema_definition.description = self.schema_definition.description.clone();
        for extension in &self.schema_definition.extensions {
            extensions.insert(*extension, schema_position.new_extension(&mut target));
        }
        for (kind, root) in &self.schema_definition.roots {
            SchemaRootDefinitionPosition { root_kind: *kind }.insert(
                &mut target,
                root.type_name.clone(),
                remap_extension(&extensions, root.extension),
            )?;
        }
        for directive in &self.schema_definition.directives {
            schema_position
                .insert_directive(&mut target, remap_directive(&extensions, directive))?;
        }

        for type_ in copied_types {
            populate_type(&mut target, type_, &extensions)?;
        }
        Ok(target)
    }

    /// Runs the built-ins' validation hook, then checks the whole schema.
    #[instrument(skip_all)]
    pub fn validate(mut self) -> Result<ValidFederationSchema, FederationError> {
        let built_ins = self.built_ins;
        built_ins.on_validation(&mut self)?;
        validation::validate_schema(&self)?;
        Ok(ValidFederationSchema(Arc::new(self)))
    }

    /// Runs `f` with built-in types and directives open for modification.
    pub(crate) fn with_built_in_modification_allowed<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, FederationError>,
    ) -> Result<T, FederationError> {
        let previous = std::mem::replace(&mut self.built_in_modification_allowed, true);
        let result = f(self);
        self.built_in_modification_allowed = previous;
        result
    }

    fn built_in_updates_allowed(&self) -> bool {
        !self.constructed || self.built_in_modification_allowed
    }

    pub(crate) fn allocate_extension_id(&mut self) -> ExtensionId {
        let extension = ExtensionId(self.next_extension_id);
        self.next_extension_id += 1;
        extension
    }

    fn reserve_extension_ids(&mut self, extensions: &IndexSet<ExtensionId>) {
        if let Some(max) = extensions.iter().map(|extension| extension.0).max() {
            self.next_extension_id = self.next_extension_id.max(max + 1);
        }
    }

    pub(crate) fn check_update_type(&self, type_name: &str) -> Result<(), FederationError> {
        if self.is_built_in_type(type_name) && !self.built_in_updates_allowed() {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Cannot modify built-in type \"{type_name}\""),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn check_update_directive(&self, name: &str) -> Result<(), FederationError> {
        if self.is_built_in_directive(name) && !self.built_in_updates_allowed() {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Cannot modify built-in directive \"@{name}\""),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn type_mut(&mut self, type_name: &str) -> Result<&mut TypeDefinition, FederationError> {
        self.check_update_type(type_name)?;
        if self.types.contains_key(type_name) {
            return self
                .types
                .get_mut(type_name)
                .ok_or_else(|| crate::internal_error!("Type \"{type_name}\" vanished"));
        }
        self.built_in_types.get_mut(type_name).ok_or_else(|| {
            SingleFederationError::UnknownReference {
                message: format!("Cannot find type \"{type_name}\" in schema"),
            }
            .into()
        })
    }

    pub(crate) fn directive_definition_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut DirectiveDefinition, FederationError> {
        self.check_update_directive(name)?;
        if self.directive_definitions.contains_key(name) {
            return self
                .directive_definitions
                .get_mut(name)
                .ok_or_else(|| crate::internal_error!("Directive \"@{name}\" vanished"));
        }
        self.built_in_directive_definitions
            .get_mut(name)
            .ok_or_else(|| {
                SingleFederationError::UnknownReference {
                    message: format!("Cannot find directive \"@{name}\" in schema"),
                }
                .into()
            })
    }

    pub(crate) fn replace_type_referencer(
        &mut self,
        previous: Option<ast::Type>,
        next: Option<ast::Type>,
        referencer: TypeReferencer,
    ) {
        if let Some(previous) = previous {
            self.referencers
                .remove_type_referencer(previous.inner_named_type(), &referencer);
        }
        if let Some(next) = next {
            self.referencers
                .add_type_referencer(next.inner_named_type(), referencer);
        }
    }

    /// Fails unless the base type of `ty` is in the schema (or is the type being added).
    pub(crate) fn check_type_reference(
        &self,
        ty: Option<&ast::Type>,
        pending: Option<&Name>,
    ) -> Result<(), FederationError> {
        let Some(ty) = ty else {
            return Ok(());
        };
        let type_name = ty.inner_named_type();
        if pending == Some(type_name) || self.type_definition(type_name).is_some() {
            return Ok(());
        }
        Err(SingleFederationError::UnknownReference {
            message: format!("Cannot find type \"{type_name}\" in schema"),
        }
        .into())
    }

    pub(crate) fn check_directive_applications(
        &self,
        directives: &[AppliedDirective],
        extensions: &IndexSet<ExtensionId>,
    ) -> Result<(), FederationError> {
        for directive in directives {
            if self.directive_definition(directive.name()).is_none() {
                return Err(SingleFederationError::UnknownReference {
                    message: format!(
                        "Cannot find directive \"@{}\" in schema",
                        directive.name()
                    ),
                }
                .into());
            }
            if let Some(extension) = directive.extension {
                if !extensions.contains(&extension) {
                    return Err(SingleFederationError::InvalidAttachment {
                        message: format!(
                            "Directive application \"@{}\" refers to an extension that does not belong to its parent",
                            directive.name()
                        ),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    pub(crate) fn check_input_value(
        &self,
        value: &InputValueDefinition,
        extensions: &IndexSet<ExtensionId>,
    ) -> Result<(), FederationError> {
        self.check_input_value_with_pending(value, extensions, None)
    }

    fn check_input_value_with_pending(
        &self,
        value: &InputValueDefinition,
        extensions: &IndexSet<ExtensionId>,
        pending: Option<&Name>,
    ) -> Result<(), FederationError> {
        if let Some(extension) = value.extension {
            if !extensions.contains(&extension) {
                return Err(SingleFederationError::InvalidAttachment {
                    message: format!(
                        "Input value \"{}\" refers to an extension that does not belong to its parent",
                        value.name
                    ),
                }
                .into());
            }
        }
        self.check_type_reference(value.ty.as_ref(), pending)?;
        self.check_directive_applications(&value.directives, &IndexSet::new())
    }

    fn check_field(
        &self,
        field: &FieldDefinition,
        extensions: &IndexSet<ExtensionId>,
        pending: &Name,
    ) -> Result<(), FederationError> {
        if let Some(extension) = field.extension {
            if !extensions.contains(&extension) {
                return Err(SingleFederationError::InvalidAttachment {
                    message: format!(
                        "Field \"{pending}.{}\" refers to an extension that does not belong to its parent",
                        field.name
                    ),
                }
                .into());
            }
        }
        self.check_type_reference(field.ty.as_ref(), Some(pending))?;
        self.check_directive_applications(&field.directives, extensions)?;
        for argument in field.arguments.values() {
            self.check_input_value_with_pending(argument, &IndexSet::new(), Some(pending))?;
        }
        Ok(())
    }

    fn check_type_contents(&self, type_: &TypeDefinition) -> Result<(), FederationError> {
        let name = type_.name();
        let extensions = type_.extensions();
        let check_member = |member: &Name, extension: &Option<ExtensionId>| {
            if let Some(extension) = extension {
                if !extensions.contains(extension) {
                    return Err(FederationError::from(
                        SingleFederationError::InvalidAttachment {
                            message: format!(
                                "\"{name}\" refers to an extension that does not belong to it"
                            ),
                        },
                    ));
                }
            }
            if member != name && self.type_definition(member).is_none() {
                return Err(SingleFederationError::UnknownReference {
                    message: format!("Cannot find type \"{member}\" in schema"),
                }
                .into());
            }
            Ok(())
        };
        self.check_directive_applications(type_.directives(), extensions)?;
        match type_ {
            TypeDefinition::Scalar(_) => {}
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                for (interface_name, extension) in &type_.implements_interfaces {
                    check_member(interface_name, extension)?;
                }
                for field in type_.fields.values() {
                    self.check_field(field, extensions, name)?;
                }
            }
            TypeDefinition::Union(type_) => {
                for (member_name, extension) in &type_.members {
                    check_member(member_name, extension)?;
                }
            }
            TypeDefinition::Enum(type_) => {
                for value in type_.values.values() {
                    check_member(name, &value.extension)?;
                    self.check_directive_applications(&value.directives, extensions)?;
                }
            }
            TypeDefinition::InputObject(type_) => {
                for field in type_.fields.values() {
                    self.check_input_value_with_pending(field, extensions, Some(name))?;
                }
            }
        }
        Ok(())
    }

    fn check_directive_definition(
        &self,
        definition: &DirectiveDefinition,
    ) -> Result<(), FederationError> {
        for argument in definition.arguments.values() {
            self.check_input_value(argument, &IndexSet::new())?;
        }
        Ok(())
    }
}

fn remap_extension(
    extensions: &IndexMap<ExtensionId, ExtensionId>,
    extension: Option<ExtensionId>,
) -> Option<ExtensionId> {
    extension.and_then(|extension| extensions.get(&extension).copied())
}

fn remap_directive(
    extensions: &IndexMap<ExtensionId, ExtensionId>,
    directive: &AppliedDirective,
) -> AppliedDirective {
    AppliedDirective {
        node: apollo_compiler::Node::new((*directive.node).clone()),
        extension: remap_extension(extensions, directive.extension),
    }
}

fn remap_input_value(
    extensions: &IndexMap<ExtensionId, ExtensionId>,
    value: &InputValueDefinition,
) -> InputValueDefinition {
    InputValueDefinition {
        extension: remap_extension(extensions, value.extension),
        directives: value
            .directives
            .iter()
            .map(|directive| remap_directive(extensions, directive))
            .collect(),
        ..value.clone()
    }
}

/// Adds directive definitions in two steps, shells first, so that arguments may carry
/// applications of any of the definitions.
pub(crate) fn copy_directive_definitions<'a>(
    schema: &mut FederationSchema,
    definitions: impl Iterator<Item = &'a DirectiveDefinition> + Clone,
    built_in: bool,
) -> Result<(), FederationError> {
    for definition in definitions.clone() {
        if built_in {
            schema.add_built_in_directive_definition(definition.shell())?;
        } else {
            schema.add_directive_definition(definition.shell())?;
        }
    }
    for definition in definitions {
        let position = DirectiveDefinitionPosition {
            directive_name: definition.name.clone(),
        };
        for argument in definition.arguments.values() {
            position
                .argument(argument.name.clone())
                .insert(schema, remap_input_value(&IndexMap::new(), argument))?;
        }
    }
    Ok(())
}

/// Inserts the content of `type_` into the shell of the same name already present in `schema`.
pub(crate) fn populate_type(
    schema: &mut FederationSchema,
    type_: &TypeDefinition,
    extensions: &IndexMap<ExtensionId, ExtensionId>,
) -> Result<(), FederationError> {
    let position = TypeDefinitionPosition::new(type_.name().clone());
    for directive in type_.directives() {
        position.insert_directive(schema, remap_directive(extensions, directive))?;
    }
    match type_ {
        TypeDefinition::Scalar(_) => {}
        TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
            for (interface_name, extension) in &type_.implements_interfaces {
                position
                    .implemented_interface(interface_name.clone())
                    .insert(schema, remap_extension(extensions, *extension))?;
            }
            for field in type_.fields.values() {
                let copy = FieldDefinition {
                    extension: remap_extension(extensions, field.extension),
                    directives: field
                        .directives
                        .iter()
                        .map(|directive| remap_directive(extensions, directive))
                        .collect(),
                    arguments: field
                        .arguments
                        .iter()
                        .map(|(name, argument)| {
                            (name.clone(), remap_input_value(extensions, argument))
                        })
                        .collect(),
                    ..field.clone()
                };
                position.field(field.name.clone()).insert(schema, copy)?;
            }
        }
        TypeDefinition::Union(type_) => {
            for (member_name, extension) in &type_.members {
                position
                    .union_member(member_name.clone())
                    .insert(schema, remap_extension(extensions, *extension))?;
            }
        }
        TypeDefinition::Enum(type_) => {
            for value in type_.values.values() {
                let mut copy = value.clone();
                copy.extension = remap_extension(extensions, value.extension);
                copy.directives = value
                    .directives
                    .iter()
                    .map(|directive| remap_directive(extensions, directive))
                    .collect();
                position.enum_value(value.value.clone()).insert(schema, copy)?;
            }
        }
        TypeDefinition::InputObject(type_) => {
            for field in type_.fields.values() {
                position
                    .input_field(field.name.clone())
                    .insert(schema, remap_input_value(extensions, field))?;
            }
        }
    }
    Ok(())
}

/// A schema that went through [`FederationSchema::validate`]. Cheap to clone and safe to share
/// between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFederationSchema(Arc<FederationSchema>);

impl ValidFederationSchema {
    /// A mutable copy of the validated schema.
    pub fn into_inner(self) -> FederationSchema {
        Arc::unwrap_or_clone(self.0)
    }
}

impl fmt::Display for ValidFederationSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Deref for ValidFederationSchema {
    type Target = FederationSchema;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::built_ins::GRAPHQL_BUILT_INS;
    use crate::schema::definitions::TypeKind;

    fn object_with_field(type_name: Name, field_name: Name, field_type: Name) -> TypeDefinition {
        let mut type_ = TypeDefinition::new(TypeKind::Object, type_name);
        if let TypeDefinition::Object(object) = &mut type_ {
            object.fields.insert(
                field_name.clone(),
                FieldDefinition::new(field_name, ast::Type::Named(field_type)),
            );
        }
        type_
    }

    #[test]
    fn bootstrap_installs_built_ins_and_freezes_them() {
        let mut schema = FederationSchema::new(GRAPHQL_BUILT_INS).unwrap();
        assert!(schema.is_constructed());
        assert!(schema.is_built_in_type("String"));
        assert!(schema.directive_definition("deprecated").is_some());
        let error = schema
            .add_built_in_type(TypeDefinition::new(TypeKind::Scalar, name!("Extra")))
            .unwrap_err();
        assert_eq!(error.errors()[0].code(), "INVALID_ATTACHMENT");
    }

    #[test]
    fn adding_the_same_type_twice_is_a_no_op() {
        let mut schema = FederationSchema::new(GRAPHQL_BUILT_INS).unwrap();
        let type_ = object_with_field(name!("Query"), name!("hello"), name!("String"));
        schema.add_type(type_.clone()).unwrap();
        schema.add_type(type_).unwrap();
        assert_eq!(schema.types().count(), 1);

        let conflicting = object_with_field(name!("Query"), name!("bye"), name!("String"));
        assert!(schema.add_type(conflicting).is_err());
    }

    #[test]
    fn unresolvable_field_types_are_rejected_before_mutation() {
        let mut schema = FederationSchema::new(GRAPHQL_BUILT_INS).unwrap();
        let string_referencers = schema.referencers().type_referencers("String").cloned();
        let mut type_ = object_with_field(name!("Query"), name!("id"), name!("String"));
        let TypeDefinition::Object(object) = &mut type_ else {
            panic!("expected an object type");
        };
        object.fields.insert(
            name!("me"),
            FieldDefinition::new(name!("me"), ast::Type::Named(name!("User"))),
        );
        let error = schema.add_type(type_).unwrap_err();
        assert_eq!(error.errors()[0].code(), "UNKNOWN_REFERENCE");
        assert_eq!(schema.types().count(), 0);
        // `Query.id` resolved but must not have been registered either.
        assert_eq!(
            schema.referencers().type_referencers("String").cloned(),
            string_referencers
        );
        assert!(
            schema
                .referencers()
                .type_referencers("User")
                .is_none_or(|referencers| referencers.is_empty())
        );
    }

    #[test]
    fn self_references_resolve_on_add() {
        let mut schema = FederationSchema::new(GRAPHQL_BUILT_INS).unwrap();
        let type_ = object_with_field(name!("Node"), name!("next"), name!("Node"));
        schema.add_type(type_).unwrap();
        let referencers = schema.referencers().type_referencers("Node").unwrap();
        assert_eq!(referencers.len(), 1);
    }

    #[test]
    fn interface_runtime_types_are_implementing_objects() {
        let schema = FederationSchema::parse(
            r#"
            type Query { node: Node }
            interface Node { id: ID! }
            type User implements Node { id: ID! }
            type Post implements Node { id: ID! }
            interface Named implements Node { id: ID! }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        let runtime_types: Vec<_> = schema
            .possible_runtime_types("Node")
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(runtime_types, vec!["User", "Post"]);
    }

    #[test]
    fn cloning_preserves_structure_and_extensions() {
        let mut schema = FederationSchema::parse(
            r#"
            type Query { t: T }
            type T { a: Int }
            "#,
            GRAPHQL_BUILT_INS,
        )
        .unwrap();
        let position = TypeDefinitionPosition::new(name!("T"));
        let extension = position.new_extension(&mut schema).unwrap();
        let mut field = FieldDefinition::new(name!("b"), ast::Type::Named(name!("String")));
        field.extension = Some(extension);
        position.field(name!("b")).insert(&mut schema, field).unwrap();

        let copy = schema.clone_with_built_ins(GRAPHQL_BUILT_INS).unwrap();
        let copied = position.field(name!("b")).get(&copy).unwrap();
        let copied_extension = copied.extension.unwrap();
        assert!(position.get(&copy).unwrap().extensions().contains(&copied_extension));
        assert_eq!(copy.to_string(), schema.to_string());
    }

    #[test]
    fn valid_schemas_print_like_their_source() {
        let schema = FederationSchema::parse("type Query { hello: String }", GRAPHQL_BUILT_INS)
            .unwrap();
        let printed = schema.to_string();
        let valid = schema.validate().unwrap();
        assert_eq!(valid.to_string(), printed);
        assert_eq!(format!("{valid}"), format!("{}", *valid));
    }
}
