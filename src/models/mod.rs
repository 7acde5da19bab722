pub mod organization;
pub mod user;

pub use organization::{OrganizationRecord, RawOrganization};
pub use user::UserProfile;
