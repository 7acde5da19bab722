use std::collections::HashMap;

use crate::models::UserProfile;

// Ordered synonym lists per profile field. IdPs disagree on attribute
// naming, so each field tries its candidates in order and takes the first
// non-empty match.
const NAME_KEYS: &[&str] = &["displayName", "displayname", "name", "cn"];
const FIRST_NAME_KEYS: &[&str] = &["firstName", "firstname", "givenName", "givenname"];
const LAST_NAME_KEYS: &[&str] = &["sn", "surname", "lastName", "lastname"];
const ORGANIZATION_KEYS: &[&str] = &["organization", "o", "company"];
const ROLE_KEYS: &[&str] = &["role", "groups"];

const DEFAULT_ROLE: &str = "user";

/// Build a canonical profile from the validated assertion's attribute bag.
///
/// Pure and infallible: absent or empty attributes degrade to field defaults
/// (the subject identifier for the display name, `"user"` for the role,
/// empty strings otherwise).
pub fn normalize_profile(
    attributes: &HashMap<String, Vec<String>>,
    subject: &str,
    session_index: Option<String>,
) -> UserProfile {
    UserProfile {
        email: subject.to_string(),
        name: first_attribute(attributes, NAME_KEYS).unwrap_or_else(|| subject.to_string()),
        first_name: first_attribute(attributes, FIRST_NAME_KEYS).unwrap_or_default(),
        last_name: first_attribute(attributes, LAST_NAME_KEYS).unwrap_or_default(),
        organization: first_attribute(attributes, ORGANIZATION_KEYS).unwrap_or_default(),
        role: first_attribute(attributes, ROLE_KEYS).unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        session_index,
    }
}

/// Try candidate attribute names in order; return the first element of the
/// first non-empty match. Assertion attributes are multi-valued by shape.
fn first_attribute(attributes: &HashMap<String, Vec<String>>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(values) = attributes.get(*key) {
            if let Some(value) = values.first() {
                if !value.is_empty() {
                    return Some(value.clone());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn prefers_display_name_and_defaults_role() {
        let attributes = attrs(&[
            ("displayName", &["Jane Doe"]),
            ("mail", &["jane@x.com"]),
        ]);

        let profile = normalize_profile(&attributes, "jane@x.com", None);

        assert_eq!(profile.email, "jane@x.com");
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.first_name, "");
        assert_eq!(profile.last_name, "");
        assert_eq!(profile.organization, "");
        assert_eq!(profile.role, "user");
    }

    #[test]
    fn falls_back_to_subject_for_name() {
        let profile = normalize_profile(&HashMap::new(), "ops@example.com", None);
        assert_eq!(profile.name, "ops@example.com");
    }

    #[test]
    fn tries_synonyms_in_order() {
        // No displayName; "cn" is further down the candidate list.
        let attributes = attrs(&[("cn", &["J. Doe"]), ("givenname", &["Jane"])]);
        let profile = normalize_profile(&attributes, "jane@x.com", None);
        assert_eq!(profile.name, "J. Doe");
        assert_eq!(profile.first_name, "Jane");
    }

    #[test]
    fn takes_first_element_of_multi_valued_attributes() {
        let attributes = attrs(&[("groups", &["netadmin", "observer"])]);
        let profile = normalize_profile(&attributes, "jane@x.com", None);
        assert_eq!(profile.role, "netadmin");
    }

    #[test]
    fn skips_empty_values() {
        let attributes = attrs(&[("displayName", &[""]), ("name", &["Jane"])]);
        let profile = normalize_profile(&attributes, "jane@x.com", None);
        assert_eq!(profile.name, "Jane");
    }

    #[test]
    fn carries_session_index_through() {
        let profile = normalize_profile(
            &HashMap::new(),
            "jane@x.com",
            Some("_idx123".to_string()),
        );
        assert_eq!(profile.session_index.as_deref(), Some("_idx123"));
        // The public shape strips it.
        assert_eq!(profile.public().session_index, None);
    }
}
