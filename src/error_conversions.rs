//! Error conversion glue between layers.
//!
//! The domain layer and the forecast engine stay free of service and
//! repository error types; the conversions live here instead.

use crate::domain::types::TypeConstraintError;
use crate::forecast::condition::ConditionError;
use crate::forms::FormError;
use crate::repository::errors::RepositoryError;
use crate::services::ServiceError;

impl From<TypeConstraintError> for ServiceError {
    fn from(val: TypeConstraintError) -> Self {
        ServiceError::TypeConstraint(val.to_string())
    }
}

impl From<TypeConstraintError> for RepositoryError {
    fn from(val: TypeConstraintError) -> Self {
        RepositoryError::ValidationError(val.to_string())
    }
}

impl From<FormError> for ServiceError {
    fn from(val: FormError) -> Self {
        ServiceError::Form(val.to_string())
    }
}

impl From<ConditionError> for ServiceError {
    fn from(val: ConditionError) -> Self {
        ServiceError::Condition(val.to_string())
    }
}
