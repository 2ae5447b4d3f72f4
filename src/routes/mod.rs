/// Router Module Index
///
/// Splits the route table into two security tiers. The public tier serves
/// the landing site (contact form, division list, gallery) and the login
/// gateway; the authenticated tier carries the whole admin panel behind the
/// `AuthUser` extractor. Fine-grained authorization happens inside each
/// handler against the role's permission matrix, not at the router level,
/// because the matrix is editable at runtime.

/// Routes accessible without a session token.
pub mod public;

/// Routes requiring a valid bearer token. Each handler additionally checks
/// the group of (module, action) grants it needs.
pub mod authenticated;
