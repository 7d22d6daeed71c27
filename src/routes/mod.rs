/// Router Module Index
///
/// Organizes the routing surface into security-segregated modules so access
/// control is applied explicitly at the module level rather than per route.
///
/// The three modules map directly to the access tiers of the API.

/// Routes accessible to any client: registration, login, article reads,
/// health.
pub mod public;

/// Routes requiring a valid bearer principal (profile, article create and
/// update). Wrapped by the authentication middleware layer.
pub mod authenticated;

/// Routes restricted to the ADMIN role (article delete). The role gate runs
/// inside the handler, before any existence check.
pub mod admin;
