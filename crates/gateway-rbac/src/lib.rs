//! Stereotype-driven role-based authorization for gateway administration.
//!
//! This crate provides:
//! - Roles, permissions and scope predicates with a shared evaluator cache
//! - Permission matching with read-only entity protection
//! - User-level decisions and collection filtering (`RbacServices`)
//! - A declaration registry and an interceptor that checks secured
//!   operations before and after they run
//! - Decision auditing, configuration and telemetry setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod role;
pub mod scope;
pub mod protection;
pub mod cache;
pub mod source;
pub mod matcher;
pub mod value;
pub mod secured;
pub mod check;
pub mod services;
pub mod interceptor;
pub mod audit;
pub mod config;
pub mod telemetry;

pub use error::{DeniedEntity, PermissionDeniedError, RbacError, RbacResult};
pub use role::{Permission, Role, RoleTag};
pub use scope::{AttributeMode, ScopeEvaluator, ScopeEvaluatorCache, ScopeKind, ScopePredicate};
pub use protection::{
    ProtectedEntityOracle, ProtectedEntityTracker, ProtectionContext, ProtectionGuard, ProtectionInfo,
};
pub use cache::{CacheConfig, CacheStats, TtlCache};
pub use source::{CachedRoleSource, CurrentUserContext, InMemoryRoleSource, RoleAssignmentSource, SessionUser};
pub use matcher::PermissionMatcher;
pub use value::{Arg, CollectionUpdate, Returned, Securable};
pub use secured::{MethodSecurity, MethodStereotype, OperationKey, ReturnShape, Secured, SecuredRegistry};
pub use check::{CheckAfter, CheckBefore, CheckInfo};
pub use services::RbacServices;
pub use interceptor::{Invocation, InvocationError, SecuredMethodInterceptor};
pub use audit::{AccessAudit, AuditDecision, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::{RbacConfig, TelemetryConfig};
pub use telemetry::init_telemetry;
