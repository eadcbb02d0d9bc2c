//! Bridges policy decisions into application errors.

use crewplan_core::{AppError, AppResult};
use crewplan_domain::{AccessRequest, Actor, Decision, DenialReason, evaluate};

/// Converts a denial into the matching application error.
///
/// A missing session maps to [`AppError::Unauthorized`]; every other reason
/// is an authenticated-but-blocked [`AppError::Forbidden`]. The reason's
/// user-facing message is carried through for the presentation layer.
#[must_use]
pub fn denial_to_error(reason: DenialReason) -> AppError {
    match reason {
        DenialReason::Unauthenticated => AppError::Unauthorized(reason.to_string()),
        _ => AppError::Forbidden(reason.to_string()),
    }
}

/// Requires a session without consulting any resource rule.
pub fn ensure_authenticated(actor: Option<&Actor>) -> AppResult<&Actor> {
    actor.ok_or_else(|| denial_to_error(DenialReason::Unauthenticated))
}

/// Evaluates the policy and returns the actor on an allow.
///
/// Returning the actor keeps call sites honest: everything after the check
/// works with an identity the policy has actually seen.
pub fn ensure_allowed<'a>(
    actor: Option<&'a Actor>,
    request: &AccessRequest,
) -> AppResult<&'a Actor> {
    let present = ensure_authenticated(actor)?;

    match evaluate(Some(present), request) {
        Decision::Allow => Ok(present),
        Decision::Deny(reason) => Err(denial_to_error(reason)),
    }
}
