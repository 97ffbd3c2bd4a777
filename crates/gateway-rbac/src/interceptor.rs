//! Authorization wrapper around secured operations.
//!
//! [`SecuredMethodInterceptor::invoke`] classifies the invocation from its
//! declaration, runs the before-check, calls the wrapped operation and runs
//! the after-check on its return value.

use crate::audit::AccessAudit;
use crate::check::{CheckAfter, CheckBefore, CheckInfo};
use crate::error::{PermissionDeniedError, RbacError, RbacResult};
use crate::protection::ProtectionContext;
use crate::secured::{OperationKey, SecuredRegistry};
use crate::services::RbacServices;
use crate::source::CurrentUserContext;
use crate::value::{Arg, CollectionUpdate, Returned, Securable};
use gateway_core::{Entity, LookupError, User};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// A call to a secured operation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The operation being called.
    pub key: OperationKey,
    /// Call arguments.
    pub args: Vec<Arg>,
    /// Read-only protection state for this call.
    pub protection: ProtectionContext,
}

impl Invocation {
    /// Creates an invocation with enforced protection.
    pub fn new(key: OperationKey, args: Vec<Arg>) -> Self {
        Self {
            key,
            args,
            protection: ProtectionContext::enforcing(),
        }
    }

    /// Sets the protection context.
    #[must_use]
    pub fn with_protection(mut self, protection: ProtectionContext) -> Self {
        self.protection = protection;
        self
    }
}

/// Failure of a secured invocation.
#[derive(Error, Debug)]
pub enum InvocationError<E> {
    /// Authorization failed or could not be decided.
    #[error(transparent)]
    Rbac(#[from] RbacError),

    /// The wrapped operation failed.
    #[error("{0}")]
    Target(E),
}

impl<E> InvocationError<E> {
    /// Returns true for a permission denial.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Rbac(e) if e.is_denial())
    }

    /// Returns the authorization error, if any.
    pub fn as_rbac(&self) -> Option<&RbacError> {
        match self {
            Self::Rbac(e) => Some(e),
            Self::Target(_) => None,
        }
    }

    /// Returns the wrapped operation's error, if any.
    pub fn into_target(self) -> Option<E> {
        match self {
            Self::Target(e) => Some(e),
            Self::Rbac(_) => None,
        }
    }
}

/// Runs secured operations under their declared checks.
pub struct SecuredMethodInterceptor {
    registry: Arc<SecuredRegistry>,
    rbac: Arc<RbacServices>,
    current_user: Arc<dyn CurrentUserContext>,
    audit: Arc<AccessAudit>,
}

impl SecuredMethodInterceptor {
    /// Creates an interceptor without audit sinks.
    pub fn new(
        registry: Arc<SecuredRegistry>,
        rbac: Arc<RbacServices>,
        current_user: Arc<dyn CurrentUserContext>,
    ) -> Self {
        Self {
            registry,
            rbac,
            current_user,
            audit: Arc::new(AccessAudit::new()),
        }
    }

    /// Sets the audit service.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AccessAudit>) -> Self {
        self.audit = audit;
        self
    }

    /// Checks and runs a secured operation.
    ///
    /// `proceed` runs only if the before-check passes. Its error is returned
    /// unchanged as [`InvocationError::Target`].
    pub fn invoke<F, E>(&self, invocation: &Invocation, proceed: F) -> Result<Returned, InvocationError<E>>
    where
        F: FnOnce() -> Result<Returned, E>,
    {
        let key = &invocation.key;
        let Some(user) = self.current_user.current_user() else {
            let err = RbacError::configuration(format!("{key}: no current user"));
            error!(method = %key, "Secured operation called without a current user");
            self.audit.record_error(None, key, &err);
            return Err(err.into());
        };

        let info = self
            .classify(invocation)
            .and_then(|info| {
                self.check_before(&user, &info, &invocation.protection)?;
                Ok(info)
            })
            .map_err(|e| self.report(&user, key, e))?;

        let returned = proceed().map_err(InvocationError::Target)?;

        let returned = self
            .check_after(&user, &info, returned, &invocation.protection)
            .map_err(|e| self.report(&user, key, e))?;
        self.audit.record_allowed(&user.key(), key, info.operation);
        Ok(returned)
    }

    fn classify(&self, invocation: &Invocation) -> RbacResult<CheckInfo> {
        let security = self.registry.resolve(&invocation.key)?;
        CheckInfo::classify(&security, &invocation.args, self.rbac.resolver().as_ref())
    }

    fn check_before(&self, user: &User, info: &CheckInfo, context: &ProtectionContext) -> RbacResult<()> {
        match info.before {
            CheckBefore::None => Ok(()),
            CheckBefore::Entity => {
                let entity = info.entity.as_ref().ok_or_else(|| {
                    RbacError::configuration(format!("{}: entity check without an entity", info.method))
                })?;
                self.check_entity(user, info, entity.as_ref(), context)
            }
            CheckBefore::Id => {
                let [entity_type] = info.types.as_slice() else {
                    return Err(RbacError::configuration(format!(
                        "{}: id check needs exactly one entity type, found {}",
                        info.method,
                        info.types.len()
                    )));
                };
                let id = info.id.ok_or_else(|| {
                    RbacError::configuration(format!("{}: id check without an id", info.method))
                })?;
                let entity = self
                    .rbac
                    .resolver()
                    .find(*entity_type, id)?
                    .ok_or_else(|| LookupError::not_found(*entity_type, id))?;
                self.check_entity(user, info, entity.as_ref(), context)
            }
            CheckBefore::All => {
                if info.types.is_empty() {
                    return Err(RbacError::configuration(format!(
                        "{}: no entity types declared",
                        info.method
                    )));
                }
                for entity_type in &info.types {
                    for operation in &info.all_operations {
                        if !self
                            .rbac
                            .is_permitted_for_any_entity_of_type(user, *operation, *entity_type)?
                        {
                            return Err(PermissionDeniedError::for_type(*operation, *entity_type).into());
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn check_entity(
        &self,
        user: &User,
        info: &CheckInfo,
        entity: &dyn Entity,
        context: &ProtectionContext,
    ) -> RbacResult<()> {
        let other = info.other_operation.as_deref();
        if self
            .rbac
            .is_permitted_for_entity(user, entity, info.operation, other, context)?
        {
            Ok(())
        } else {
            Err(PermissionDeniedError::for_entity(info.operation, entity, other).into())
        }
    }

    fn check_after(
        &self,
        user: &User,
        info: &CheckInfo,
        returned: Returned,
        context: &ProtectionContext,
    ) -> RbacResult<Returned> {
        if returned.is_nothing() {
            return Ok(returned);
        }

        match info.after {
            CheckAfter::None => {
                debug!(method = %info.method, shape = returned.shape_name(), "No after-check");
                Ok(returned)
            }
            CheckAfter::Entity => match returned {
                Returned::Entity(entity) => {
                    self.check_entity(user, info, entity.as_ref(), context)?;
                    Ok(Returned::Entity(entity))
                }
                other => Err(RbacError::configuration(format!(
                    "{}: expected an entity, got {}",
                    info.method,
                    other.shape_name()
                ))),
            },
            CheckAfter::Header => match returned {
                Returned::Header(header) => {
                    let single = Returned::Array(vec![Securable::Header(header)]);
                    Ok(match self.check_collection(user, info, single, context)? {
                        Returned::Array(mut kept) => match kept.pop() {
                            Some(Securable::Header(header)) => Returned::Header(header),
                            Some(Securable::Entity(entity)) => Returned::Entity(entity),
                            None => Returned::Nothing,
                        },
                        other => other,
                    })
                }
                collection => self.check_collection(user, info, collection, context),
            },
            CheckAfter::Collection => self.check_collection(user, info, returned, context),
        }
    }

    fn check_collection(
        &self,
        user: &User,
        info: &CheckInfo,
        returned: Returned,
        context: &ProtectionContext,
    ) -> RbacResult<Returned> {
        if returned.items().is_none() {
            return Err(RbacError::configuration(format!(
                "{}: cannot filter a returned {}",
                info.method,
                returned.shape_name()
            )));
        }

        if self
            .rbac
            .is_permitted_for_entities_of_types(user, info.operation, &info.types)?
        {
            return Ok(returned);
        }

        Ok(match returned {
            Returned::Array(items) => Returned::Array(self.filter_collection(user, info, items, context)?),
            Returned::List(items) => Returned::List(self.filter_collection(user, info, items, context)?),
            Returned::Set(items) => Returned::Set(self.filter_collection(user, info, items, context)?),
            Returned::Update(update) => Returned::Update(CollectionUpdate {
                added: self.filter_collection(user, info, update.added, context)?,
                ..update
            }),
            other => other,
        })
    }

    fn filter_collection(
        &self,
        user: &User,
        info: &CheckInfo,
        items: Vec<Securable>,
        context: &ProtectionContext,
    ) -> RbacResult<Vec<Securable>> {
        self.rbac
            .filter_permitted(user, info.operation, info.other_operation.as_deref(), items, context)
    }

    fn report(&self, user: &User, key: &OperationKey, err: RbacError) -> RbacError {
        match &err {
            RbacError::PermissionDenied(denial) => {
                debug!(method = %key, user = %user.login, %denial, "Permission denied");
                self.audit.record_denial(&user.key(), key, denial);
            }
            RbacError::Configuration(message) => {
                error!(method = %key, %message, "Secured operation is misconfigured");
                self.audit.record_error(Some(&user.key()), key, &err);
            }
            RbacError::Lookup(lookup) => {
                debug!(method = %key, error = %lookup, "Entity lookup failed during authorization");
            }
        }
        err
    }
}
