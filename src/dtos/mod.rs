pub mod auth;
pub mod orgs;
