//! Name-keyed handles for every element of a [`FederationSchema`].
//!
//! A position is a path of names (type, field, argument...) and does not borrow the schema. All
//! mutations of a schema go through these handles so that the referencer index stays consistent
//! with the definitions: each mutator checks everything it needs before touching the schema, so a
//! failed call leaves the schema unchanged.

use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::ast::DirectiveLocation;
use indexmap::IndexSet;

use crate::bail;
use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::schema::FederationSchema;
use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::DirectiveDefinition;
use crate::schema::definitions::EnumValueDefinition;
use crate::schema::definitions::ExtensionId;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::ObjectOrInterfaceType;
use crate::schema::definitions::SchemaDefinition;
use crate::schema::definitions::SchemaRootDefinition;
use crate::schema::definitions::SchemaRootDefinitionKind;
use crate::schema::definitions::TypeDefinition;
use crate::schema::definitions::TypeKind;

fn unknown_type(type_name: &str) -> FederationError {
    SingleFederationError::UnknownReference {
        message: format!("Cannot find type \"{type_name}\" in schema"),
    }
    .into()
}

fn unknown_element(element: impl fmt::Display) -> FederationError {
    SingleFederationError::UnknownReference {
        message: format!("Cannot find \"{element}\" in schema"),
    }
    .into()
}

fn already_exists(element: impl fmt::Display) -> FederationError {
    SingleFederationError::InvalidAttachment {
        message: format!("\"{element}\" already exists in schema"),
    }
    .into()
}

fn check_extension(
    element: impl fmt::Display,
    extension: Option<ExtensionId>,
    extensions: &IndexSet<ExtensionId>,
) -> Result<(), FederationError> {
    match extension {
        Some(extension) if !extensions.contains(&extension) => {
            Err(SingleFederationError::InvalidAttachment {
                message: format!(
                    "Cannot attach \"{element}\" to an extension that does not belong to its parent"
                ),
            }
            .into())
        }
        _ => Ok(()),
    }
}

fn object_or_interface<'schema>(
    schema: &'schema FederationSchema,
    type_name: &Name,
) -> Result<&'schema ObjectOrInterfaceType, FederationError> {
    match schema.type_definition(type_name) {
        Some(TypeDefinition::Object(type_) | TypeDefinition::Interface(type_)) => Ok(type_),
        Some(type_) => Err(SingleFederationError::InvalidAttachment {
            message: format!(
                "Type \"{type_name}\" is a {} type and cannot have fields",
                type_.kind()
            ),
        }
        .into()),
        None => Err(unknown_type(type_name)),
    }
}

fn object_or_interface_mut<'schema>(
    schema: &'schema mut FederationSchema,
    type_name: &Name,
) -> Result<&'schema mut ObjectOrInterfaceType, FederationError> {
    match schema.type_mut(type_name)? {
        TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => Ok(type_),
        _ => bail!("Type \"{type_name}\" unexpectedly has no fields"),
    }
}

/// Position of a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeDefinitionPosition {
    pub type_name: Name,
}

impl fmt::Display for TypeDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

impl TypeDefinitionPosition {
    pub fn new(type_name: Name) -> Self {
        Self { type_name }
    }

    pub fn field(&self, field_name: Name) -> FieldDefinitionPosition {
        FieldDefinitionPosition {
            type_name: self.type_name.clone(),
            field_name,
        }
    }

    pub fn input_field(&self, field_name: Name) -> InputFieldDefinitionPosition {
        InputFieldDefinitionPosition {
            type_name: self.type_name.clone(),
            field_name,
        }
    }

    pub fn enum_value(&self, value_name: Name) -> EnumValueDefinitionPosition {
        EnumValueDefinitionPosition {
            type_name: self.type_name.clone(),
            value_name,
        }
    }

    pub fn union_member(&self, member_name: Name) -> UnionMemberPosition {
        UnionMemberPosition {
            union_name: self.type_name.clone(),
            member_name,
        }
    }

    pub fn implemented_interface(&self, interface_name: Name) -> ImplementedInterfacePosition {
        ImplementedInterfacePosition {
            type_name: self.type_name.clone(),
            interface_name,
        }
    }

    pub fn get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema TypeDefinition, FederationError> {
        self.try_get(schema)
            .ok_or_else(|| unknown_type(&self.type_name))
    }

    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema TypeDefinition> {
        schema.type_definition(&self.type_name)
    }

    pub fn kind(&self, schema: &FederationSchema) -> Result<TypeKind, FederationError> {
        Ok(self.get(schema)?.kind())
    }

    /// Starts a new `extend` block on this type.
    pub fn new_extension(&self, schema: &mut FederationSchema) -> Result<ExtensionId, FederationError> {
        schema.type_mut(&self.type_name)?;
        let extension = schema.allocate_extension_id();
        schema
            .type_mut(&self.type_name)?
            .extensions_mut()
            .insert(extension);
        Ok(extension)
    }

    pub fn insert_directive(
        &self,
        schema: &mut FederationSchema,
        directive: AppliedDirective,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).insert_directive(schema, directive)
    }

    pub fn remove_directive_name(
        &self,
        schema: &mut FederationSchema,
        name: &str,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).remove_directive_name(schema, name)
    }

    /// Detaches this type from the schema.
    ///
    /// The type's own directive applications and inner elements are unregistered, then every
    /// element that pointed at the type has that pointer cleared: fields and arguments are left
    /// without a type, union memberships, `implements` clauses and root bindings are dropped.
    /// Those elements are returned so the caller can re-point or remove them.
    pub fn remove(
        &self,
        schema: &mut FederationSchema,
    ) -> Result<Vec<TypeReferencer>, FederationError> {
        if self.try_get(schema).is_none() {
            return Ok(Vec::new());
        }
        schema.check_update_type(&self.type_name)?;
        let referencers: Vec<TypeReferencer> = schema
            .referencers
            .types
            .get(&self.type_name)
            .map(|referencers| referencers.iter().cloned().collect())
            .unwrap_or_default();
        for referencer in &referencers {
            referencer.check_clearable(schema, &self.type_name)?;
        }

        let type_ = match schema.types.shift_remove(&self.type_name) {
            Some(type_) => type_,
            None => schema
                .built_in_types
                .shift_remove(&self.type_name)
                .ok_or_else(|| unknown_type(&self.type_name))?,
        };
        schema.referencers.remove_type_references(&type_);
        schema.referencers.types.shift_remove(&self.type_name);
        for referencer in &referencers {
            referencer.clear(schema);
        }
        Ok(referencers)
    }

    /// Removes this type, then every field, argument, input field and union membership that
    /// referenced it. Types left without fields or members by that are removed in turn.
    pub fn remove_recursive(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        for referencer in self.remove(schema)? {
            match referencer {
                TypeReferencer::SchemaRoot(_) | TypeReferencer::ImplementedInterface(_) => {}
                TypeReferencer::Field(position) => {
                    position.remove(schema)?;
                    position.parent().remove_if_empty(schema)?;
                }
                TypeReferencer::FieldArgument(position) => {
                    position.remove(schema)?;
                }
                TypeReferencer::InputField(position) => {
                    position.remove(schema)?;
                    position.parent().remove_if_empty(schema)?;
                }
                TypeReferencer::DirectiveArgument(position) => {
                    position.remove(schema)?;
                }
                TypeReferencer::UnionMember(position) => {
                    position.parent().remove_if_empty(schema)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn remove_if_empty(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if self.try_get(schema).is_some_and(|type_| type_.is_empty()) {
            self.remove_recursive(schema)?;
        }
        Ok(())
    }
}

/// Position of a field of an object or interface type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldDefinitionPosition {
    pub type_name: Name,
    pub field_name: Name,
}

impl fmt::Display for FieldDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

impl FieldDefinitionPosition {
    pub fn parent(&self) -> TypeDefinitionPosition {
        TypeDefinitionPosition {
            type_name: self.type_name.clone(),
        }
    }

    pub fn argument(&self, argument_name: Name) -> FieldArgumentDefinitionPosition {
        FieldArgumentDefinitionPosition {
            type_name: self.type_name.clone(),
            field_name: self.field_name.clone(),
            argument_name,
        }
    }

    pub fn get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema FieldDefinition, FederationError> {
        object_or_interface(schema, &self.type_name)?
            .fields
            .get(&self.field_name)
            .ok_or_else(|| unknown_element(self))
    }

    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema FieldDefinition> {
        self.get(schema).ok()
    }

    pub(crate) fn get_mut<'schema>(
        &self,
        schema: &'schema mut FederationSchema,
    ) -> Result<&'schema mut FieldDefinition, FederationError> {
        object_or_interface_mut(schema, &self.type_name)?
            .fields
            .get_mut(&self.field_name)
            .ok_or_else(|| unknown_element(self))
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        field: FieldDefinition,
    ) -> Result<(), FederationError> {
        if field.name != self.field_name {
            bail!("Field \"{self}\" given field named \"{}\"", field.name);
        }
        schema.check_update_type(&self.type_name)?;
        let parent = object_or_interface(schema, &self.type_name)?;
        if parent.fields.contains_key(&self.field_name) {
            return Err(already_exists(self));
        }
        check_extension(self, field.extension, &parent.extensions)?;
        schema.check_type_reference(field.ty.as_ref(), None)?;
        schema.check_directive_applications(&field.directives, &parent.extensions)?;
        for argument in field.arguments.values() {
            schema.check_input_value(argument, &IndexSet::new())?;
        }

        schema.referencers.add_field_references(self, &field);
        object_or_interface_mut(schema, &self.type_name)?
            .fields
            .insert(self.field_name.clone(), field);
        Ok(())
    }

    /// Removes the field and unregisters everything it pointed at. Absent fields are ignored.
    pub fn remove(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if self.try_get(schema).is_none() {
            return Ok(());
        }
        let Some(field) = object_or_interface_mut(schema, &self.type_name)?
            .fields
            .shift_remove(&self.field_name)
        else {
            return Ok(());
        };
        schema.referencers.remove_field_references(self, &field);
        Ok(())
    }

    /// Points the field at a new type, or at no type at all.
    pub fn set_type(
        &self,
        schema: &mut FederationSchema,
        ty: Option<ast::Type>,
    ) -> Result<(), FederationError> {
        schema.check_update_type(&self.type_name)?;
        self.get(schema)?;
        schema.check_type_reference(ty.as_ref(), None)?;
        let previous = std::mem::replace(&mut self.get_mut(schema)?.ty, ty.clone());
        let referencer = TypeReferencer::from(self.clone());
        if let Some(previous) = previous {
            schema
                .referencers
                .remove_type_referencer(previous.inner_named_type(), &referencer);
        }
        if let Some(ty) = ty {
            schema
                .referencers
                .add_type_referencer(ty.inner_named_type(), referencer);
        }
        Ok(())
    }

    pub fn insert_directive(
        &self,
        schema: &mut FederationSchema,
        directive: AppliedDirective,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).insert_directive(schema, directive)
    }

    pub fn remove_directive_name(
        &self,
        schema: &mut FederationSchema,
        name: &str,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).remove_directive_name(schema, name)
    }
}

/// Position of an argument of an object or interface field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldArgumentDefinitionPosition {
    pub type_name: Name,
    pub field_name: Name,
    pub argument_name: Name,
}

impl fmt::Display for FieldArgumentDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({}:)",
            self.type_name, self.field_name, self.argument_name
        )
    }
}

impl FieldArgumentDefinitionPosition {
    pub fn parent(&self) -> FieldDefinitionPosition {
        FieldDefinitionPosition {
            type_name: self.type_name.clone(),
            field_name: self.field_name.clone(),
        }
    }

    pub fn get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema InputValueDefinition, FederationError> {
        self.parent()
            .get(schema)?
            .arguments
            .get(&self.argument_name)
            .ok_or_else(|| unknown_element(self))
    }

    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema InputValueDefinition> {
        self.get(schema).ok()
    }

    pub(crate) fn get_mut<'schema>(
        &self,
        schema: &'schema mut FederationSchema,
    ) -> Result<&'schema mut InputValueDefinition, FederationError> {
        self.parent()
            .get_mut(schema)?
            .arguments
            .get_mut(&self.argument_name)
            .ok_or_else(|| unknown_element(self))
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        argument: InputValueDefinition,
    ) -> Result<(), FederationError> {
        if argument.name != self.argument_name {
            bail!("Argument \"{self}\" given argument named \"{}\"", argument.name);
        }
        schema.check_update_type(&self.type_name)?;
        if self.parent().get(schema)?.arguments.contains_key(&self.argument_name) {
            return Err(already_exists(self));
        }
        schema.check_input_value(&argument, &IndexSet::new())?;
        schema
            .referencers
            .add_field_argument_references(self, &argument);
        self.parent()
            .get_mut(schema)?
            .arguments
            .insert(self.argument_name.clone(), argument);
        Ok(())
    }

    pub fn remove(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if self.try_get(schema).is_none() {
            return Ok(());
        }
        let Some(argument) = self
            .parent()
            .get_mut(schema)?
            .arguments
            .shift_remove(&self.argument_name)
        else {
            return Ok(());
        };
        schema
            .referencers
            .remove_field_argument_references(self, &argument);
        Ok(())
    }

    pub fn set_type(
        &self,
        schema: &mut FederationSchema,
        ty: Option<ast::Type>,
    ) -> Result<(), FederationError> {
        schema.check_update_type(&self.type_name)?;
        self.get(schema)?;
        schema.check_type_reference(ty.as_ref(), None)?;
        let previous = std::mem::replace(&mut self.get_mut(schema)?.ty, ty.clone());
        schema.replace_type_referencer(previous, ty, self.clone().into());
        Ok(())
    }

    pub fn insert_directive(
        &self,
        schema: &mut FederationSchema,
        directive: AppliedDirective,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).insert_directive(schema, directive)
    }
}

/// Position of a field of an input object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputFieldDefinitionPosition {
    pub type_name: Name,
    pub field_name: Name,
}

impl fmt::Display for InputFieldDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

impl InputFieldDefinitionPosition {
    pub fn parent(&self) -> TypeDefinitionPosition {
        TypeDefinitionPosition {
            type_name: self.type_name.clone(),
        }
    }

    pub fn get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema InputValueDefinition, FederationError> {
        match schema.type_definition(&self.type_name) {
            Some(TypeDefinition::InputObject(type_)) => type_
                .fields
                .get(&self.field_name)
                .ok_or_else(|| unknown_element(self)),
            _ => Err(unknown_element(self)),
        }
    }

    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema InputValueDefinition> {
        self.get(schema).ok()
    }

    pub(crate) fn get_mut<'schema>(
        &self,
        schema: &'schema mut FederationSchema,
    ) -> Result<&'schema mut InputValueDefinition, FederationError> {
        match schema.type_mut(&self.type_name)? {
            TypeDefinition::InputObject(type_) => type_
                .fields
                .get_mut(&self.field_name)
                .ok_or_else(|| unknown_element(self)),
            _ => Err(unknown_element(self)),
        }
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        field: InputValueDefinition,
    ) -> Result<(), FederationError> {
        if field.name != self.field_name {
            bail!("Input field \"{self}\" given field named \"{}\"", field.name);
        }
        schema.check_update_type(&self.type_name)?;
        let Some(TypeDefinition::InputObject(parent)) = schema.type_definition(&self.type_name)
        else {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Cannot add input field \"{self}\": not an input object type"),
            }
            .into());
        };
        if parent.fields.contains_key(&self.field_name) {
            return Err(already_exists(self));
        }
        check_extension(self, field.extension, &parent.extensions)?;
        schema.check_input_value(&field, &parent.extensions)?;
        schema.referencers.add_input_field_references(self, &field);
        if let TypeDefinition::InputObject(parent) = schema.type_mut(&self.type_name)? {
            parent.fields.insert(self.field_name.clone(), field);
        }
        Ok(())
    }

    pub fn remove(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if self.try_get(schema).is_none() {
            return Ok(());
        }
        let TypeDefinition::InputObject(parent) = schema.type_mut(&self.type_name)? else {
            return Ok(());
        };
        if let Some(field) = parent.fields.shift_remove(&self.field_name) {
            schema.referencers.remove_input_field_references(self, &field);
        }
        Ok(())
    }

    pub fn set_type(
        &self,
        schema: &mut FederationSchema,
        ty: Option<ast::Type>,
    ) -> Result<(), FederationError> {
        schema.check_update_type(&self.type_name)?;
        self.get(schema)?;
        schema.check_type_reference(ty.as_ref(), None)?;
        let previous = std::mem::replace(&mut self.get_mut(schema)?.ty, ty.clone());
        schema.replace_type_referencer(previous, ty, self.clone().into());
        Ok(())
    }

    pub fn insert_directive(
        &self,
        schema: &mut FederationSchema,
        directive: AppliedDirective,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).insert_directive(schema, directive)
    }
}

/// Position of a value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumValueDefinitionPosition {
    pub type_name: Name,
    pub value_name: Name,
}

impl fmt::Display for EnumValueDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.value_name)
    }
}

impl EnumValueDefinitionPosition {
    pub fn get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema EnumValueDefinition, FederationError> {
        match schema.type_definition(&self.type_name) {
            Some(TypeDefinition::Enum(type_)) => type_
                .values
                .get(&self.value_name)
                .ok_or_else(|| unknown_element(self)),
            _ => Err(unknown_element(self)),
        }
    }

    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema EnumValueDefinition> {
        self.get(schema).ok()
    }

    pub(crate) fn get_mut<'schema>(
        &self,
        schema: &'schema mut FederationSchema,
    ) -> Result<&'schema mut EnumValueDefinition, FederationError> {
        match schema.type_mut(&self.type_name)? {
            TypeDefinition::Enum(type_) => type_
                .values
                .get_mut(&self.value_name)
                .ok_or_else(|| unknown_element(self)),
            _ => Err(unknown_element(self)),
        }
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        value: EnumValueDefinition,
    ) -> Result<(), FederationError> {
        if value.value != self.value_name {
            bail!("Enum value \"{self}\" given value named \"{}\"", value.value);
        }
        schema.check_update_type(&self.type_name)?;
        let Some(TypeDefinition::Enum(parent)) = schema.type_definition(&self.type_name) else {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Cannot add enum value \"{self}\": not an enum type"),
            }
            .into());
        };
        if parent.values.contains_key(&self.value_name) {
            return Err(already_exists(self));
        }
        check_extension(self, value.extension, &parent.extensions)?;
        schema.check_directive_applications(&value.directives, &parent.extensions)?;
        schema
            .referencers
            .add_directive_referencers(&value.directives, &self.clone().into());
        if let TypeDefinition::Enum(parent) = schema.type_mut(&self.type_name)? {
            parent.values.insert(self.value_name.clone(), value);
        }
        Ok(())
    }

    pub fn remove(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if self.try_get(schema).is_none() {
            return Ok(());
        }
        let TypeDefinition::Enum(parent) = schema.type_mut(&self.type_name)? else {
            return Ok(());
        };
        if let Some(value) = parent.values.shift_remove(&self.value_name) {
            schema
                .referencers
                .remove_directive_referencers(&value.directives, &self.clone().into());
        }
        Ok(())
    }
}

/// Position of the membership of an object type in a union.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnionMemberPosition {
    pub union_name: Name,
    pub member_name: Name,
}

impl fmt::Display for UnionMemberPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.union_name, self.member_name)
    }
}

impl UnionMemberPosition {
    pub fn parent(&self) -> TypeDefinitionPosition {
        TypeDefinitionPosition {
            type_name: self.union_name.clone(),
        }
    }

    pub fn exists(&self, schema: &FederationSchema) -> bool {
        matches!(
            schema.type_definition(&self.union_name),
            Some(TypeDefinition::Union(union_)) if union_.members.contains_key(&self.member_name)
        )
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        extension: Option<ExtensionId>,
    ) -> Result<(), FederationError> {
        schema.check_update_type(&self.union_name)?;
        let Some(TypeDefinition::Union(union_)) = schema.type_definition(&self.union_name) else {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!("Cannot add member \"{self}\": not a union type"),
            }
            .into());
        };
        if union_.members.contains_key(&self.member_name) {
            return Err(already_exists(self));
        }
        check_extension(self, extension, &union_.extensions)?;
        if schema.type_definition(&self.member_name).is_none() {
            return Err(unknown_type(&self.member_name));
        }
        schema
            .referencers
            .add_type_referencer(&self.member_name, self.clone().into());
        if let TypeDefinition::Union(union_) = schema.type_mut(&self.union_name)? {
            union_.members.insert(self.member_name.clone(), extension);
        }
        Ok(())
    }

    pub fn remove(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if !self.exists(schema) {
            return Ok(());
        }
        if let TypeDefinition::Union(union_) = schema.type_mut(&self.union_name)? {
            union_.members.shift_remove(&self.member_name);
        }
        schema
            .referencers
            .remove_type_referencer(&self.member_name, &self.clone().into());
        Ok(())
    }
}

/// Position of an `implements` clause of an object or interface type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImplementedInterfacePosition {
    pub type_name: Name,
    pub interface_name: Name,
}

impl fmt::Display for ImplementedInterfacePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} implements {}", self.type_name, self.interface_name)
    }
}

impl ImplementedInterfacePosition {
    pub fn exists(&self, schema: &FederationSchema) -> bool {
        object_or_interface(schema, &self.type_name)
            .is_ok_and(|type_| type_.implements_interfaces.contains_key(&self.interface_name))
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        extension: Option<ExtensionId>,
    ) -> Result<(), FederationError> {
        schema.check_update_type(&self.type_name)?;
        let type_ = object_or_interface(schema, &self.type_name)?;
        if type_.implements_interfaces.contains_key(&self.interface_name) {
            return Err(already_exists(self));
        }
        check_extension(self, extension, &type_.extensions)?;
        if schema.type_definition(&self.interface_name).is_none() {
            return Err(unknown_type(&self.interface_name));
        }
        schema
            .referencers
            .add_type_referencer(&self.interface_name, self.clone().into());
        object_or_interface_mut(schema, &self.type_name)?
            .implements_interfaces
            .insert(self.interface_name.clone(), extension);
        Ok(())
    }

    pub fn remove(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if !self.exists(schema) {
            return Ok(());
        }
        object_or_interface_mut(schema, &self.type_name)?
            .implements_interfaces
            .shift_remove(&self.interface_name);
        schema
            .referencers
            .remove_type_referencer(&self.interface_name, &self.clone().into());
        Ok(())
    }
}

/// Position of a directive definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectiveDefinitionPosition {
    pub directive_name: Name,
}

impl fmt::Display for DirectiveDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.directive_name)
    }
}

impl DirectiveDefinitionPosition {
    pub fn argument(&self, argument_name: Name) -> DirectiveArgumentDefinitionPosition {
        DirectiveArgumentDefinitionPosition {
            directive_name: self.directive_name.clone(),
            argument_name,
        }
    }

    pub fn get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema DirectiveDefinition, FederationError> {
        self.try_get(schema).ok_or_else(|| {
            SingleFederationError::UnknownReference {
                message: format!("Cannot find directive \"{self}\" in schema"),
            }
            .into()
        })
    }

    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema DirectiveDefinition> {
        schema.directive_definition(&self.directive_name)
    }

    /// Removes the definition and every application of it. The elements that carried an
    /// application are returned.
    pub fn remove(
        &self,
        schema: &mut FederationSchema,
    ) -> Result<Vec<DirectiveTargetPosition>, FederationError> {
        if self.try_get(schema).is_none() {
            return Ok(Vec::new());
        }
        schema.check_update_directive(&self.directive_name)?;
        let targets: Vec<DirectiveTargetPosition> = schema
            .referencers
            .directives
            .get(&self.directive_name)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default();
        for target in &targets {
            target.check_update(schema)?;
        }
        for target in &targets {
            target.remove_directive_name(schema, &self.directive_name)?;
        }
        let definition = match schema.directive_definitions.shift_remove(&self.directive_name) {
            Some(definition) => definition,
            None => schema
                .built_in_directive_definitions
                .shift_remove(&self.directive_name)
                .ok_or_else(|| unknown_element(self))?,
        };
        schema
            .referencers
            .remove_directive_definition_references(&definition);
        schema.referencers.directives.shift_remove(&self.directive_name);
        Ok(targets)
    }
}

/// Position of an argument of a directive definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectiveArgumentDefinitionPosition {
    pub directive_name: Name,
    pub argument_name: Name,
}

impl fmt::Display for DirectiveArgumentDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}({}:)", self.directive_name, self.argument_name)
    }
}

impl DirectiveArgumentDefinitionPosition {
    pub fn parent(&self) -> DirectiveDefinitionPosition {
        DirectiveDefinitionPosition {
            directive_name: self.directive_name.clone(),
        }
    }

    pub fn get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema InputValueDefinition, FederationError> {
        self.parent()
            .get(schema)?
            .arguments
            .get(&self.argument_name)
            .ok_or_else(|| unknown_element(self))
    }

    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema InputValueDefinition> {
        self.get(schema).ok()
    }

    pub(crate) fn get_mut<'schema>(
        &self,
        schema: &'schema mut FederationSchema,
    ) -> Result<&'schema mut InputValueDefinition, FederationError> {
        schema
            .directive_definition_mut(&self.directive_name)?
            .arguments
            .get_mut(&self.argument_name)
            .ok_or_else(|| unknown_element(self))
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        argument: InputValueDefinition,
    ) -> Result<(), FederationError> {
        if argument.name != self.argument_name {
            bail!("Argument \"{self}\" given argument named \"{}\"", argument.name);
        }
        schema.check_update_directive(&self.directive_name)?;
        if self.parent().get(schema)?.arguments.contains_key(&self.argument_name) {
            return Err(already_exists(self));
        }
        schema.check_input_value(&argument, &IndexSet::new())?;
        schema
            .referencers
            .add_directive_argument_references(self, &argument);
        schema
            .directive_definition_mut(&self.directive_name)?
            .arguments
            .insert(self.argument_name.clone(), argument);
        Ok(())
    }

    pub fn remove(&self, schema: &mut FederationSchema) -> Result<(), FederationError> {
        if self.try_get(schema).is_none() {
            return Ok(());
        }
        let Some(argument) = schema
            .directive_definition_mut(&self.directive_name)?
            .arguments
            .shift_remove(&self.argument_name)
        else {
            return Ok(());
        };
        schema
            .referencers
            .remove_directive_argument_references(self, &argument);
        Ok(())
    }

    pub fn set_type(
        &self,
        schema: &mut FederationSchema,
        ty: Option<ast::Type>,
    ) -> Result<(), FederationError> {
        schema.check_update_directive(&self.directive_name)?;
        self.get(schema)?;
        schema.check_type_reference(ty.as_ref(), None)?;
        let previous = std::mem::replace(&mut self.get_mut(schema)?.ty, ty.clone());
        schema.replace_type_referencer(previous, ty, self.clone().into());
        Ok(())
    }
}

/// Position of the schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaDefinitionPosition;

impl fmt::Display for SchemaDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema")
    }
}

impl SchemaDefinitionPosition {
    pub fn get<'schema>(&self, schema: &'schema FederationSchema) -> &'schema SchemaDefinition {
        &schema.schema_definition
    }

    pub fn new_extension(&self, schema: &mut FederationSchema) -> ExtensionId {
        let extension = schema.allocate_extension_id();
        schema.schema_definition.extensions.insert(extension);
        extension
    }

    pub fn insert_directive(
        &self,
        schema: &mut FederationSchema,
        directive: AppliedDirective,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).insert_directive(schema, directive)
    }

    pub fn remove_directive_name(
        &self,
        schema: &mut FederationSchema,
        name: &str,
    ) -> Result<(), FederationError> {
        DirectiveTargetPosition::from(self.clone()).remove_directive_name(schema, name)
    }
}

/// Position of a root operation binding of the schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaRootDefinitionPosition {
    pub root_kind: SchemaRootDefinitionKind,
}

impl fmt::Display for SchemaRootDefinitionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema.{}", self.root_kind)
    }
}

impl SchemaRootDefinitionPosition {
    pub fn try_get<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Option<&'schema SchemaRootDefinition> {
        schema.schema_definition.roots.get(&self.root_kind)
    }

    pub fn insert(
        &self,
        schema: &mut FederationSchema,
        type_name: Name,
        extension: Option<ExtensionId>,
    ) -> Result<(), FederationError> {
        if self.try_get(schema).is_some() {
            return Err(already_exists(self));
        }
        check_extension(self, extension, &schema.schema_definition.extensions)?;
        if schema.type_definition(&type_name).is_none() {
            return Err(unknown_type(&type_name));
        }
        schema
            .referencers
            .add_type_referencer(&type_name, self.clone().into());
        schema.schema_definition.roots.insert(
            self.root_kind,
            SchemaRootDefinition {
                type_name,
                extension,
            },
        );
        Ok(())
    }

    pub fn remove(&self, schema: &mut FederationSchema) {
        if let Some(root) = schema.schema_definition.roots.shift_remove(&self.root_kind) {
            schema
                .referencers
                .remove_type_referencer(&root.type_name, &self.clone().into());
        }
    }
}

/// An element that holds a reference to a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::From, derive_more::Display)]
pub enum TypeReferencer {
    SchemaRoot(SchemaRootDefinitionPosition),
    Field(FieldDefinitionPosition),
    FieldArgument(FieldArgumentDefinitionPosition),
    InputField(InputFieldDefinitionPosition),
    DirectiveArgument(DirectiveArgumentDefinitionPosition),
    UnionMember(UnionMemberPosition),
    ImplementedInterface(ImplementedInterfacePosition),
}

impl TypeReferencer {
    /// Name of the type holding the referencing element, when there is one.
    pub fn parent_type_name(&self) -> Option<&Name> {
        match self {
            TypeReferencer::SchemaRoot(_) | TypeReferencer::DirectiveArgument(_) => None,
            TypeReferencer::Field(position) => Some(&position.type_name),
            TypeReferencer::FieldArgument(position) => Some(&position.type_name),
            TypeReferencer::InputField(position) => Some(&position.type_name),
            TypeReferencer::UnionMember(position) => Some(&position.union_name),
            TypeReferencer::ImplementedInterface(position) => Some(&position.type_name),
        }
    }

    /// Whether the referencing element currently resolves to the named type.
    pub fn points_to(&self, schema: &FederationSchema, type_name: &str) -> bool {
        let base = |ty: Option<&ast::Type>| ty.is_some_and(|ty| ty.inner_named_type() == type_name);
        match self {
            TypeReferencer::SchemaRoot(position) => position
                .try_get(schema)
                .is_some_and(|root| root.type_name == type_name),
            TypeReferencer::Field(position) => {
                base(position.try_get(schema).and_then(|field| field.ty.as_ref()))
            }
            TypeReferencer::FieldArgument(position) => {
                base(position.try_get(schema).and_then(|arg| arg.ty.as_ref()))
            }
            TypeReferencer::InputField(position) => {
                base(position.try_get(schema).and_then(|field| field.ty.as_ref()))
            }
            TypeReferencer::DirectiveArgument(position) => {
                base(position.try_get(schema).and_then(|arg| arg.ty.as_ref()))
            }
            TypeReferencer::UnionMember(position) => {
                position.member_name == type_name && position.exists(schema)
            }
            TypeReferencer::ImplementedInterface(position) => {
                position.interface_name == type_name && position.exists(schema)
            }
        }
    }

    fn check_clearable(
        &self,
        schema: &FederationSchema,
        removed_type_name: &Name,
    ) -> Result<(), FederationError> {
        match self {
            TypeReferencer::SchemaRoot(_) => Ok(()),
            TypeReferencer::DirectiveArgument(position) => {
                schema.check_update_directive(&position.directive_name)
            }
            _ => match self.parent_type_name() {
                Some(type_name) if type_name != removed_type_name => {
                    schema.check_update_type(type_name)
                }
                _ => Ok(()),
            },
        }
    }

    /// Drops the reference this element holds. Elements that no longer exist are skipped.
    fn clear(&self, schema: &mut FederationSchema) {
        match self {
            TypeReferencer::SchemaRoot(position) => {
                schema.schema_definition.roots.shift_remove(&position.root_kind);
            }
            TypeReferencer::Field(position) => {
                if let Ok(field) = position.get_mut(schema) {
                    field.ty = None;
                }
            }
            TypeReferencer::FieldArgument(position) => {
                if let Ok(argument) = position.get_mut(schema) {
                    argument.ty = None;
                }
            }
            TypeReferencer::InputField(position) => {
                if let Ok(field) = position.get_mut(schema) {
                    field.ty = None;
                }
            }
            TypeReferencer::DirectiveArgument(position) => {
                if let Ok(argument) = position.get_mut(schema) {
                    argument.ty = None;
                }
            }
            TypeReferencer::UnionMember(position) => {
                if let Ok(TypeDefinition::Union(union_)) = schema.type_mut(&position.union_name) {
                    union_.members.shift_remove(&position.member_name);
                }
            }
            TypeReferencer::ImplementedInterface(position) => {
                if let Ok(type_) = object_or_interface_mut(schema, &position.type_name) {
                    type_.implements_interfaces.shift_remove(&position.interface_name);
                }
            }
        }
    }
}

/// An element that can carry directive applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::From, derive_more::Display)]
pub enum DirectiveTargetPosition {
    Schema(SchemaDefinitionPosition),
    Type(TypeDefinitionPosition),
    Field(FieldDefinitionPosition),
    FieldArgument(FieldArgumentDefinitionPosition),
    InputField(InputFieldDefinitionPosition),
    EnumValue(EnumValueDefinitionPosition),
    DirectiveArgument(DirectiveArgumentDefinitionPosition),
}

impl DirectiveTargetPosition {
    /// The location a directive must allow to be applied here.
    pub fn location(&self, schema: &FederationSchema) -> Result<DirectiveLocation, FederationError> {
        Ok(match self {
            DirectiveTargetPosition::Schema(_) => DirectiveLocation::Schema,
            DirectiveTargetPosition::Type(position) => match position.kind(schema)? {
                TypeKind::Scalar => DirectiveLocation::Scalar,
                TypeKind::Object => DirectiveLocation::Object,
                TypeKind::Interface => DirectiveLocation::Interface,
                TypeKind::Union => DirectiveLocation::Union,
                TypeKind::Enum => DirectiveLocation::Enum,
                TypeKind::InputObject => DirectiveLocation::InputObject,
            },
            DirectiveTargetPosition::Field(_) => DirectiveLocation::FieldDefinition,
            DirectiveTargetPosition::FieldArgument(_)
            | DirectiveTargetPosition::DirectiveArgument(_) => DirectiveLocation::ArgumentDefinition,
            DirectiveTargetPosition::InputField(_) => DirectiveLocation::InputFieldDefinition,
            DirectiveTargetPosition::EnumValue(_) => DirectiveLocation::EnumValue,
        })
    }

    pub fn directives<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<&'schema [AppliedDirective], FederationError> {
        Ok(match self {
            DirectiveTargetPosition::Schema(position) => &position.get(schema).directives,
            DirectiveTargetPosition::Type(position) => position.get(schema)?.directives(),
            DirectiveTargetPosition::Field(position) => &position.get(schema)?.directives,
            DirectiveTargetPosition::FieldArgument(position) => &position.get(schema)?.directives,
            DirectiveTargetPosition::InputField(position) => &position.get(schema)?.directives,
            DirectiveTargetPosition::EnumValue(position) => &position.get(schema)?.directives,
            DirectiveTargetPosition::DirectiveArgument(position) => {
                &position.get(schema)?.directives
            }
        })
    }

    fn directives_mut<'schema>(
        &self,
        schema: &'schema mut FederationSchema,
    ) -> Result<&'schema mut Vec<AppliedDirective>, FederationError> {
        Ok(match self {
            DirectiveTargetPosition::Schema(_) => &mut schema.schema_definition.directives,
            DirectiveTargetPosition::Type(position) => {
                schema.type_mut(&position.type_name)?.directives_mut()
            }
            DirectiveTargetPosition::Field(position) => &mut position.get_mut(schema)?.directives,
            DirectiveTargetPosition::FieldArgument(position) => {
                &mut position.get_mut(schema)?.directives
            }
            DirectiveTargetPosition::InputField(position) => {
                &mut position.get_mut(schema)?.directives
            }
            DirectiveTargetPosition::EnumValue(position) => {
                &mut position.get_mut(schema)?.directives
            }
            DirectiveTargetPosition::DirectiveArgument(position) => {
                &mut position.get_mut(schema)?.directives
            }
        })
    }

    /// Extensions the applications on this element may be tagged with.
    fn extensions<'schema>(
        &self,
        schema: &'schema FederationSchema,
    ) -> Result<Option<&'schema IndexSet<ExtensionId>>, FederationError> {
        Ok(match self {
            DirectiveTargetPosition::Schema(_) => Some(&schema.schema_definition.extensions),
            DirectiveTargetPosition::Type(position) => Some(position.get(schema)?.extensions()),
            DirectiveTargetPosition::Field(position) => {
                Some(&object_or_interface(schema, &position.type_name)?.extensions)
            }
            DirectiveTargetPosition::InputField(position) => {
                Some(position.parent().get(schema)?.extensions())
            }
            DirectiveTargetPosition::EnumValue(position) => Some(
                TypeDefinitionPosition::new(position.type_name.clone())
                    .get(schema)?
                    .extensions(),
            ),
            DirectiveTargetPosition::FieldArgument(_)
            | DirectiveTargetPosition::DirectiveArgument(_) => None,
        })
    }

    fn check_update(&self, schema: &FederationSchema) -> Result<(), FederationError> {
        match self {
            DirectiveTargetPosition::Schema(_) => Ok(()),
            DirectiveTargetPosition::Type(position) => schema.check_update_type(&position.type_name),
            DirectiveTargetPosition::Field(position) => {
                schema.check_update_type(&position.type_name)
            }
            DirectiveTargetPosition::FieldArgument(position) => {
                schema.check_update_type(&position.type_name)
            }
            DirectiveTargetPosition::InputField(position) => {
                schema.check_update_type(&position.type_name)
            }
            DirectiveTargetPosition::EnumValue(position) => {
                schema.check_update_type(&position.type_name)
            }
            DirectiveTargetPosition::DirectiveArgument(position) => {
                schema.check_update_directive(&position.directive_name)
            }
        }
    }

    /// Attaches a directive application. The definition is resolved by name against the schema,
    /// and an application instance that is already attached here is rejected.
    pub fn insert_directive(
        &self,
        schema: &mut FederationSchema,
        directive: AppliedDirective,
    ) -> Result<(), FederationError> {
        self.check_update(schema)?;
        let existing = self.directives(schema)?;
        if existing
            .iter()
            .any(|other| other.node.ptr_eq(&directive.node))
        {
            return Err(SingleFederationError::InvalidAttachment {
                message: format!(
                    "Directive application \"@{}\" is already attached to \"{self}\"",
                    directive.name()
                ),
            }
            .into());
        }
        let empty = IndexSet::new();
        let extensions = self.extensions(schema)?.unwrap_or(&empty);
        schema.check_directive_applications(std::slice::from_ref(&directive), extensions)?;

        schema
            .referencers
            .add_directive_referencers(std::slice::from_ref(&directive), self);
        self.directives_mut(schema)?.push(directive);
        Ok(())
    }

    /// Removes every application of the named directive from this element.
    pub fn remove_directive_name(
        &self,
        schema: &mut FederationSchema,
        name: &str,
    ) -> Result<(), FederationError> {
        if !self
            .directives(schema)?
            .iter()
            .any(|directive| directive.name() == name)
        {
            return Ok(());
        }
        self.check_update(schema)?;
        self.directives_mut(schema)?
            .retain(|directive| directive.name() != name);
        if let Some(targets) = schema.referencers.directives.get_mut(name) {
            targets.shift_remove(self);
        }
        Ok(())
    }
}
