use crate::error::Error;
use crate::principal::{Principal, Role};

/// Admission check used by every admin-only operation: the caller must be
/// present and must hold the admin role. Read-only.
pub fn require_admin(principal: Option<&Principal>) -> Result<&Principal, Error> {
    let principal = principal.ok_or_else(Error::not_authenticated)?;
    if principal.role != Role::Admin {
        return Err(Error::Forbidden(
            "Admin privileges required".to_string(),
        ));
    }
    Ok(principal)
}
