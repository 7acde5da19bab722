pub mod jwt;
pub mod one_time_code;
pub mod org_cache;
pub mod profile;
pub mod saml;
pub mod session;

pub use jwt::{JwtService, ProfileClaims};
pub use one_time_code::CodeStore;
pub use org_cache::{derive_key, DashboardFetcher, OrgCache, OrganizationFetcher};
pub use profile::normalize_profile;
pub use saml::{AssertionOutcome, AssertionService, MockAssertionService, SamlGateway};
pub use session::{LoginState, SessionStore};
