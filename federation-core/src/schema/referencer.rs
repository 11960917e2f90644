use std::fmt;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;

use crate::schema::definitions::AppliedDirective;
use crate::schema::definitions::DirectiveDefinition;
use crate::schema::definitions::FieldDefinition;
use crate::schema::definitions::InputValueDefinition;
use crate::schema::definitions::TypeDefinition;
use crate::schema::position::DirectiveArgumentDefinitionPosition;
use crate::schema::position::DirectiveTargetPosition;
use crate::schema::position::EnumValueDefinitionPosition;
use crate::schema::position::FieldArgumentDefinitionPosition;
use crate::schema::position::FieldDefinitionPosition;
use crate::schema::position::ImplementedInterfacePosition;
use crate::schema::position::InputFieldDefinitionPosition;
use crate::schema::position::TypeDefinitionPosition;
use crate::schema::position::TypeReferencer;
use crate::schema::position::UnionMemberPosition;

/// Reverse index of the schema: for every named type, the elements whose type reference points
/// at it; for every directive definition, the elements carrying an application of it.
#[derive(Clone, Default)]
pub struct Referencers {
    pub(crate) types: IndexMap<Name, IndexSet<TypeReferencer>>,
    pub(crate) directives: IndexMap<Name, IndexSet<DirectiveTargetPosition>>,
}

impl fmt::Debug for Referencers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (name, refs) in &self.types {
            if !refs.is_empty() {
                parts.push(format!("{name}: [{}]", refs.iter().join(", ")));
            }
        }
        for (name, refs) in &self.directives {
            if !refs.is_empty() {
                parts.push(format!("@{name}: [{}]", refs.iter().join(", ")));
            }
        }
        write!(f, "Referencers {{ {} }}", parts.join(", "))
    }
}

impl Referencers {
    /// Elements currently pointing at the named type.
    pub fn type_referencers(&self, type_name: &str) -> Option<&IndexSet<TypeReferencer>> {
        self.types.get(type_name)
    }

    /// Elements currently carrying an application of the named directive.
    pub fn directive_referencers(&self, name: &str) -> Option<&IndexSet<DirectiveTargetPosition>> {
        self.directives.get(name)
    }

    pub(crate) fn add_type_referencer(&mut self, type_name: &Name, referencer: TypeReferencer) {
        self.types
            .entry(type_name.clone())
            .or_default()
            .insert(referencer);
    }

    pub(crate) fn remove_type_referencer(&mut self, type_name: &str, referencer: &TypeReferencer) {
        if let Some(referencers) = self.types.get_mut(type_name) {
            referencers.shift_remove(referencer);
        }
    }

    pub(crate) fn add_directive_referencers(
        &mut self,
        directives: &[AppliedDirective],
        target: &DirectiveTargetPosition,
    ) {
        for directive in directives {
            self.directives
                .entry(directive.name().clone())
                .or_default()
                .insert(target.clone());
        }
    }

    pub(crate) fn remove_directive_referencers(
        &mut self,
        directives: &[AppliedDirective],
        target: &DirectiveTargetPosition,
    ) {
        for directive in directives {
            if let Some(referencers) = self.directives.get_mut(directive.name().as_str()) {
                referencers.shift_remove(target);
            }
        }
    }

    fn add_input_value_references(
        &mut self,
        value: &InputValueDefinition,
        referencer: TypeReferencer,
        target: DirectiveTargetPosition,
    ) {
        if let Some(ty) = &value.ty {
            self.add_type_referencer(ty.inner_named_type(), referencer);
        }
        self.add_directive_referencers(&value.directives, &target);
    }

    fn remove_input_value_references(
        &mut self,
        value: &InputValueDefinition,
        referencer: &TypeReferencer,
        target: &DirectiveTargetPosition,
    ) {
        if let Some(ty) = &value.ty {
            self.remove_type_referencer(ty.inner_named_type(), referencer);
        }
        self.remove_directive_referencers(&value.directives, target);
    }

    pub(crate) fn add_field_argument_references(
        &mut self,
        position: &FieldArgumentDefinitionPosition,
        argument: &InputValueDefinition,
    ) {
        self.add_input_value_references(argument, position.clone().into(), position.clone().into());
    }

    pub(crate) fn remove_field_argument_references(
        &mut self,
        position: &FieldArgumentDefinitionPosition,
        argument: &InputValueDefinition,
    ) {
        self.remove_input_value_references(
            argument,
            &position.clone().into(),
            &position.clone().into(),
        );
    }

    pub(crate) fn add_input_field_references(
        &mut self,
        position: &InputFieldDefinitionPosition,
        field: &InputValueDefinition,
    ) {
        self.add_input_value_references(field, position.clone().into(), position.clone().into());
    }

    pub(crate) fn remove_input_field_references(
        &mut self,
        position: &InputFieldDefinitionPosition,
        field: &InputValueDefinition,
    ) {
        self.remove_input_value_references(field, &position.clone().into(), &position.clone().into());
    }

    pub(crate) fn add_directive_argument_references(
        &mut self,
        position: &DirectiveArgumentDefinitionPosition,
        argument: &InputValueDefinition,
    ) {
        self.add_input_value_references(argument, position.clone().into(), position.clone().into());
    }

    pub(crate) fn remove_directive_argument_references(
        &mut self,
        position: &DirectiveArgumentDefinitionPosition,
        argument: &InputValueDefinition,
    ) {
        self.remove_input_value_references(
            argument,
            &position.clone().into(),
            &position.clone().into(),
        );
    }

    pub(crate) fn add_field_references(
        &mut self,
        position: &FieldDefinitionPosition,
        field: &FieldDefinition,
    ) {
        if let Some(ty) = &field.ty {
            self.add_type_referencer(ty.inner_named_type(), position.clone().into());
        }
        self.add_directive_referencers(&field.directives, &position.clone().into());
        for argument in field.arguments.values() {
            self.add_field_argument_references(&position.argument(argument.name.clone()), argument);
        }
    }

    pub(crate) fn remove_field_references(
        &mut self,
        position: &FieldDefinitionPosition,
        field: &FieldDefinition,
    ) {
        if let Some(ty) = &field.ty {
            self.remove_type_referencer(ty.inner_named_type(), &position.clone().into());
        }
        self.remove_directive_referencers(&field.directives, &position.clone().into());
        for argument in field.arguments.values() {
            self.remove_field_argument_references(
                &position.argument(argument.name.clone()),
                argument,
            );
        }
    }

    /// Registers everything a type definition points at: its directive applications, implemented
    /// interfaces, union members, and the types of its fields and arguments.
    pub(crate) fn add_type_references(&mut self, type_: &TypeDefinition) {
        let position = TypeDefinitionPosition {
            type_name: type_.name().clone(),
        };
        self.types.entry(type_.name().clone()).or_default();
        self.add_directive_referencers(type_.directives(), &position.clone().into());
        match type_ {
            TypeDefinition::Scalar(_) => {}
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                for interface_name in type_.implements_interfaces.keys() {
                    self.add_type_referencer(
                        interface_name,
                        position.implemented_interface(interface_name.clone()).into(),
                    );
                }
                for field in type_.fields.values() {
                    self.add_field_references(&position.field(field.name.clone()), field);
                }
            }
            TypeDefinition::Union(type_) => {
                for member_name in type_.members.keys() {
                    self.add_type_referencer(
                        member_name,
                        position.union_member(member_name.clone()).into(),
                    );
                }
            }
            TypeDefinition::Enum(type_) => {
                for value in type_.values.values() {
                    self.add_directive_referencers(
                        &value.directives,
                        &position.enum_value(value.value.clone()).into(),
                    );
                }
            }
            TypeDefinition::InputObject(type_) => {
                for field in type_.fields.values() {
                    self.add_input_field_references(
                        &position.input_field(field.name.clone()),
                        field,
                    );
                }
            }
        }
    }

    /// Unregisters everything a type definition points at. The referencers of the type itself
    /// are left untouched.
    pub(crate) fn remove_type_references(&mut self, type_: &TypeDefinition) {
        let position = TypeDefinitionPosition {
            type_name: type_.name().clone(),
        };
        self.remove_directive_referencers(type_.directives(), &position.clone().into());
        match type_ {
            TypeDefinition::Scalar(_) => {}
            TypeDefinition::Object(type_) | TypeDefinition::Interface(type_) => {
                for interface_name in type_.implements_interfaces.keys() {
                    self.remove_type_referencer(
                        interface_name,
                        &ImplementedInterfacePosition {
                            type_name: position.type_name.clone(),
                            interface_name: interface_name.clone(),
                        }
                        .into(),
                    );
                }
                for field in type_.fields.values() {
                    self.remove_field_references(&position.field(field.name.clone()), field);
                }
            }
            TypeDefinition::Union(type_) => {
                for member_name in type_.members.keys() {
                    self.remove_type_referencer(
                        member_name,
                        &UnionMemberPosition {
                            union_name: position.type_name.clone(),
                            member_name: member_name.clone(),
                        }
                        .into(),
                    );
                }
            }
            TypeDefinition::Enum(type_) => {
                for value in type_.values.values() {
                    self.remove_directive_referencers(
                        &value.directives,
                        &EnumValueDefinitionPosition {
                            type_name: position.type_name.clone(),
                            value_name: value.value.clone(),
                        }
                        .into(),
                    );
                }
            }
            TypeDefinition::InputObject(type_) => {
                for field in type_.fields.values() {
                    self.remove_input_field_references(
                        &position.input_field(field.name.clone()),
                        field,
                    );
                }
            }
        }
    }

    pub(crate) fn add_directive_definition_references(&mut self, definition: &DirectiveDefinition) {
        self.directives.entry(definition.name.clone()).or_default();
        for argument in definition.arguments.values() {
            self.add_directive_argument_references(
                &DirectiveArgumentDefinitionPosition {
                    directive_name: definition.name.clone(),
                    argument_name: argument.name.clone(),
                },
                argument,
            );
        }
    }

    pub(crate) fn remove_directive_definition_references(
        &mut self,
        definition: &DirectiveDefinition,
    ) {
        for argument in definition.arguments.values() {
            self.remove_directive_argument_references(
                &DirectiveArgumentDefinitionPosition {
                    directive_name: definition.name.clone(),
                    argument_name: argument.name.clone(),
                },
                argument,
            );
        }
    }
}
