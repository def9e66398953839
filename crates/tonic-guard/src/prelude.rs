pub use crate::errors::{GuardError, GuardResult};
pub use crate::interceptor::Guard;
pub use crate::policy::{Policies, Policy, PolicyFn};
pub use crate::rules::{
    AuthenticatedAccess, Match, Method, PolicyBased, RoleBased, Rule, Rules, Service,
};
pub use crate::service::{Guarded, GuardedService};
pub use crate::subject::{CallContext, Input, ResolverFn, Subject, SubjectResolver};
