//! Classification of a secured invocation into before and after checks.

use crate::error::{RbacError, RbacResult};
use crate::secured::{MethodSecurity, MethodStereotype, OperationKey, ReturnShape};
use crate::value::Arg;
use gateway_core::{EntityId, EntityRef, EntityResolver, EntityType, LookupError, OperationType};
use tracing::debug;

/// Check run before the secured operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckBefore {
    /// No check.
    None,
    /// Resolve an entity from an id argument, then check it.
    Id,
    /// Check an already known entity.
    Entity,
    /// Require a blanket permission on every declared type.
    All,
}

/// Check run on the secured operation's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAfter {
    /// No check.
    None,
    /// The return value must be a permitted entity.
    Entity,
    /// A single returned header is filtered like a collection.
    Header,
    /// Returned elements are filtered.
    Collection,
}

/// The checks to run for one invocation.
#[derive(Debug, Clone)]
pub struct CheckInfo {
    /// The secured operation.
    pub method: OperationKey,
    /// Declared entity types.
    pub types: Vec<EntityType>,
    /// Operation to check.
    pub operation: OperationType,
    /// Operations a `CheckBefore::All` check must find granted, in order.
    pub all_operations: Vec<OperationType>,
    /// Custom operation name.
    pub other_operation: Option<String>,
    /// Stereotype the checks were derived from.
    pub stereotype: MethodStereotype,
    /// Before-check.
    pub before: CheckBefore,
    /// After-check.
    pub after: CheckAfter,
    /// Entity for `CheckBefore::Entity`.
    pub entity: Option<EntityRef>,
    /// Id for `CheckBefore::Id`.
    pub id: Option<EntityId>,
}

impl CheckInfo {
    fn new(security: &MethodSecurity, operation: OperationType, before: CheckBefore, after: CheckAfter) -> Self {
        Self {
            method: security.key.clone(),
            types: security.types.clone(),
            operation,
            all_operations: vec![operation],
            other_operation: security.other_operation.clone(),
            stereotype: security.stereotype,
            before,
            after,
            entity: None,
            id: None,
        }
    }

    fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Derives the checks for an invocation from its declaration and arguments.
    ///
    /// Entities referenced by id are looked up here, so lookup failures
    /// surface before the secured operation runs.
    pub fn classify(
        security: &MethodSecurity,
        args: &[Arg],
        resolver: &dyn EntityResolver,
    ) -> RbacResult<Self> {
        use CheckAfter as After;
        use CheckBefore as Before;
        use MethodStereotype as S;
        use OperationType as Op;

        let info = match security.stereotype {
            S::SaveOrUpdate => match entity_arg(security, args) {
                Some(entity) => {
                    let operation = if entity.id().is_default() { Op::Create } else { Op::Update };
                    Self::new(security, operation, Before::Entity, After::None).with_entity(entity)
                }
                None => {
                    let mut info = Self::new(security, Op::Create, Before::All, After::None);
                    info.all_operations = vec![Op::Create, Op::Update];
                    info
                }
            },
            S::FindEntities => {
                if security.returns.is_collection() {
                    Self::new(security, Op::Read, Before::None, After::Collection)
                } else {
                    Self::new(security, Op::Read, Before::All, After::None)
                }
            }
            S::FindHeaders => match security.returns {
                ReturnShape::Header => Self::new(security, Op::Read, Before::None, After::Header),
                shape if shape.is_collection() => Self::new(security, Op::Read, Before::None, After::Collection),
                _ => Self::new(security, Op::Read, Before::All, After::None),
            },
            S::FindEntity => Self::new(security, Op::Read, Before::None, After::Entity),
            S::DeleteEntity => entity_check(security, args, Op::Delete)?,
            S::GetPropertyOfEntity => entity_check(security, args, Op::Read)?,
            S::SetPropertyOfEntity => entity_check(security, args, Op::Update)?,
            S::EntityOperation => {
                entity_check(security, args, security.operation.unwrap_or(Op::Other))?
            }
            S::DeleteById => {
                let id = id_arg(security, args, 0)?;
                let entity = find_by_declared_types(security, id, resolver)?;
                Self::new(security, Op::Delete, Before::Entity, After::None).with_entity(entity)
            }
            S::DeleteIdentityById => {
                let entity = find_identity(security, args, resolver)?;
                Self::new(security, Op::Delete, Before::Entity, After::None).with_entity(entity)
            }
            S::GetIdentityPropertyById => {
                let entity = find_identity(security, args, resolver)?;
                Self::new(security, Op::Read, Before::Entity, After::None).with_entity(entity)
            }
            S::SetPropertyById | S::GetPropertyById => {
                let operation = if security.stereotype == S::SetPropertyById { Op::Update } else { Op::Read };
                let mut info = Self::new(security, operation, Before::Id, After::None);
                info.id = Some(id_arg(security, args, 0)?);
                info
            }
            S::SetPropertyByUniqueAttribute => Self::new(security, Op::Update, Before::All, After::None),
            S::DeleteByUniqueAttribute | S::DeleteMulti => Self::new(security, Op::Delete, Before::All, After::None),
            S::UncheckedWideOpen => Self::new(security, Op::None, Before::None, After::None),
        };

        debug!(
            method = %info.method,
            stereotype = ?info.stereotype,
            operation = %info.operation,
            before = ?info.before,
            after = ?info.after,
            "Classified secured invocation"
        );
        Ok(info)
    }
}

fn entity_check(security: &MethodSecurity, args: &[Arg], operation: OperationType) -> RbacResult<CheckInfo> {
    let entity = entity_arg(security, args).ok_or_else(|| {
        RbacError::configuration(format!("{}: no entity argument", security.key))
    })?;
    Ok(CheckInfo::new(security, operation, CheckBefore::Entity, CheckAfter::None).with_entity(entity))
}

/// The declared argument if it is an entity, otherwise the first entity argument.
fn entity_arg(security: &MethodSecurity, args: &[Arg]) -> Option<EntityRef> {
    match security.relevant_arg {
        Some(index) => args.get(index).and_then(Arg::as_entity).cloned(),
        None => args.iter().find_map(Arg::as_entity).cloned(),
    }
}

/// The id at `offset` past the declared argument (or past the first argument).
fn id_arg(security: &MethodSecurity, args: &[Arg], offset: usize) -> RbacResult<EntityId> {
    let index = security.relevant_arg.unwrap_or(0) + offset;
    args.get(index).and_then(Arg::as_id).ok_or_else(|| {
        RbacError::configuration(format!("{}: argument {index} is not an entity id", security.key))
    })
}

/// Tries each declared type in order; the first that resolves wins.
fn find_by_declared_types(
    security: &MethodSecurity,
    id: EntityId,
    resolver: &dyn EntityResolver,
) -> RbacResult<EntityRef> {
    let Some(first) = security.types.first() else {
        return Err(RbacError::configuration(format!(
            "{}: no entity types declared",
            security.key
        )));
    };

    let mut last_error = None;
    for entity_type in &security.types {
        match resolver.find(*entity_type, id) {
            Ok(Some(entity)) => return Ok(entity),
            Ok(None) => {}
            Err(e) => {
                debug!(%entity_type, %id, error = %e, "Lookup failed, trying next declared type");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| LookupError::not_found(*first, id)).into())
}

/// Resolves an identity from (provider id, identity id) arguments.
fn find_identity(
    security: &MethodSecurity,
    args: &[Arg],
    resolver: &dyn EntityResolver,
) -> RbacResult<EntityRef> {
    let provider_id = id_arg(security, args, 0)?;
    let identity_id = id_arg(security, args, 1)?;
    let entity_type = security.types.first().copied().unwrap_or(EntityType::User);

    let header = resolver
        .find_identity_header(provider_id, identity_id)?
        .ok_or_else(|| LookupError::not_found(entity_type, identity_id))?;
    let entity = resolver
        .find_by_header(&header)?
        .ok_or_else(|| LookupError::not_found(header.entity_type, identity_id))?;
    Ok(entity)
}
