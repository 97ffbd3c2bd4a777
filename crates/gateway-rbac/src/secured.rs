//! Security declarations for secured operations.
//!
//! Declarations are registered explicitly at startup against a service name,
//! a method name, or an interface the service implements. Resolving an
//! operation merges every declaration in its hierarchy.

use crate::error::{RbacError, RbacResult};
use gateway_core::{EntityType, OperationType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Classification of a secured operation's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodStereotype {
    /// Saves a new entity or updates an existing one.
    SaveOrUpdate,
    /// Returns a collection of entities.
    FindEntities,
    /// Returns a single entity.
    FindEntity,
    /// Returns headers.
    FindHeaders,
    /// Deletes the entity passed as argument.
    DeleteEntity,
    /// Deletes an entity by id.
    DeleteById,
    /// Deletes an identity by provider id and identity id.
    DeleteIdentityById,
    /// Reads a property of an identity by provider id and identity id.
    GetIdentityPropertyById,
    /// Updates a property of an entity by id.
    SetPropertyById,
    /// Reads a property of an entity by id.
    GetPropertyById,
    /// Reads a property of the entity passed as argument.
    GetPropertyOfEntity,
    /// Updates a property of the entity passed as argument.
    SetPropertyOfEntity,
    /// Updates an entity identified by a unique attribute.
    SetPropertyByUniqueAttribute,
    /// Deletes an entity identified by a unique attribute.
    DeleteByUniqueAttribute,
    /// Deletes several entities.
    DeleteMulti,
    /// Runs a custom operation on the entity passed as argument.
    EntityOperation,
    /// Explicitly unchecked.
    UncheckedWideOpen,
}

/// Declared shape of a secured operation's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    /// Returns nothing.
    Unit,
    /// Returns a value the kernel cannot inspect.
    #[default]
    Value,
    /// Returns one entity.
    Entity,
    /// Returns one header.
    Header,
    /// Returns an array, list or set of entities.
    EntityCollection,
    /// Returns an array, list or set of headers.
    HeaderCollection,
    /// Returns a collection delta.
    CollectionUpdate,
}

impl ReturnShape {
    /// Returns true if the after-check can filter this shape element by element.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Self::EntityCollection | Self::HeaderCollection | Self::CollectionUpdate
        )
    }
}

/// A security declaration.
///
/// Unset fields are inherited from the next declaration in the hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secured {
    /// Entity types the operation touches.
    #[serde(default)]
    pub types: Vec<EntityType>,
    /// Stereotype.
    #[serde(default)]
    pub stereotype: Option<MethodStereotype>,
    /// Index of the argument the check applies to.
    #[serde(default)]
    pub relevant_arg: Option<usize>,
    /// Operation for stereotypes that do not imply one.
    #[serde(default)]
    pub operation: Option<OperationType>,
    /// Custom operation name for OTHER/NONE operations.
    #[serde(default)]
    pub other_operation: Option<String>,
    /// Return value shape.
    #[serde(default)]
    pub returns: Option<ReturnShape>,
}

impl Secured {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a declaration with a stereotype.
    #[must_use]
    pub fn stereotype(stereotype: MethodStereotype) -> Self {
        Self {
            stereotype: Some(stereotype),
            ..Self::default()
        }
    }

    /// Creates a declaration of entity types.
    pub fn types(types: impl IntoIterator<Item = EntityType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sets the entity types.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = EntityType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    /// Sets the stereotype.
    #[must_use]
    pub fn with_stereotype(mut self, stereotype: MethodStereotype) -> Self {
        self.stereotype = Some(stereotype);
        self
    }

    /// Sets the relevant argument index.
    #[must_use]
    pub fn with_relevant_arg(mut self, index: usize) -> Self {
        self.relevant_arg = Some(index);
        self
    }

    /// Sets the operation.
    #[must_use]
    pub fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Sets the custom operation name.
    #[must_use]
    pub fn with_other_operation(mut self, name: impl Into<String>) -> Self {
        self.other_operation = Some(name.into());
        self
    }

    /// Sets the return shape.
    #[must_use]
    pub fn returning(mut self, shape: ReturnShape) -> Self {
        self.returns = Some(shape);
        self
    }

    /// Fills fields left unset here from `fallback`.
    fn inherit(&mut self, fallback: &Secured) {
        if self.types.is_empty() {
            self.types.clone_from(&fallback.types);
        }
        self.stereotype = self.stereotype.or(fallback.stereotype);
        self.relevant_arg = self.relevant_arg.or(fallback.relevant_arg);
        self.operation = self.operation.or(fallback.operation);
        if self.other_operation.is_none() {
            self.other_operation.clone_from(&fallback.other_operation);
        }
        self.returns = self.returns.or(fallback.returns);
    }
}

/// Identifies a secured operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey {
    /// Service (or interface) name.
    pub service: String,
    /// Method name.
    pub method: String,
}

impl OperationKey {
    /// Creates a new key.
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.service, self.method)
    }
}

/// The merged declaration of one secured operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSecurity {
    /// The operation.
    pub key: OperationKey,
    /// Entity types the operation touches.
    pub types: Vec<EntityType>,
    /// Stereotype.
    pub stereotype: MethodStereotype,
    /// Index of the argument the check applies to.
    pub relevant_arg: Option<usize>,
    /// Declared operation.
    pub operation: Option<OperationType>,
    /// Custom operation name.
    pub other_operation: Option<String>,
    /// Return value shape.
    pub returns: ReturnShape,
}

/// Registry of security declarations.
#[derive(Debug, Default)]
pub struct SecuredRegistry {
    services: HashMap<String, Secured>,
    methods: HashMap<OperationKey, Secured>,
    interfaces: HashMap<String, Vec<String>>,
}

impl SecuredRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares defaults for every method of a service or interface.
    #[must_use]
    pub fn declare_service(mut self, service: impl Into<String>, secured: Secured) -> Self {
        self.services.insert(service.into(), secured);
        self
    }

    /// Declares a single method of a service or interface.
    #[must_use]
    pub fn declare_method(
        mut self,
        service: impl Into<String>,
        method: impl Into<String>,
        secured: Secured,
    ) -> Self {
        self.methods.insert(OperationKey::new(service, method), secured);
        self
    }

    /// Records that a service implements an interface.
    ///
    /// Interfaces are consulted in the order they were added.
    #[must_use]
    pub fn implements(mut self, service: impl Into<String>, interface: impl Into<String>) -> Self {
        self.interfaces
            .entry(service.into())
            .or_default()
            .push(interface.into());
        self
    }

    /// Resolves the merged declaration for an operation.
    ///
    /// The method on the service wins, then the method on each interface,
    /// then the service defaults, then the interface defaults.
    pub fn resolve(&self, key: &OperationKey) -> RbacResult<MethodSecurity> {
        let interfaces = self
            .interfaces
            .get(&key.service)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut chain: Vec<&Secured> = Vec::new();
        chain.extend(self.methods.get(key));
        chain.extend(
            interfaces
                .iter()
                .filter_map(|i| self.methods.get(&OperationKey::new(i.as_str(), key.method.as_str()))),
        );
        chain.extend(self.services.get(&key.service));
        chain.extend(interfaces.iter().filter_map(|i| self.services.get(i)));

        if chain.is_empty() {
            return Err(RbacError::configuration(format!(
                "no security declaration for {key}"
            )));
        }

        let mut merged = Secured::default();
        for declaration in chain {
            merged.inherit(declaration);
        }

        let stereotype = merged.stereotype.ok_or_else(|| {
            RbacError::configuration(format!("no stereotype declared for {key}"))
        })?;

        Ok(MethodSecurity {
            key: key.clone(),
            types: merged.types,
            stereotype,
            relevant_arg: merged.relevant_arg,
            operation: merged.operation,
            other_operation: merged.other_operation,
            returns: merged.returns.unwrap_or_default(),
        })
    }

    /// Returns true if anything is declared for the operation.
    #[must_use]
    pub fn is_declared(&self, key: &OperationKey) -> bool {
        self.resolve(key).is_ok()
    }
}
