use crate::error::CommonError;
use crate::observable::Propagation;

/// Result carrying a [`CommonError`] on failure
pub type CommonResult<T> = Result<T, CommonError>;

/// What an event listener returns: whether to keep propagating, or the
/// error the bus logs before moving on to the next listener
pub type ListenerResult = CommonResult<Propagation>;
