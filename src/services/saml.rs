use std::collections::HashMap;
use std::io::Write;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use flate2::{write::DeflateEncoder, Compression};
use samael::metadata::EntityDescriptor;
use samael::schema::{Issuer, LogoutRequest, NameID};
use samael::service_provider::ServiceProviderBuilder;
use samael::traits::ToXml;
use uuid::Uuid;

use crate::config::SamlConfig;
use crate::error::AppError;

const DEFAULT_NAME_ID_FORMAT: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";

/// What a validated assertion yields: the subject identifier, the raw
/// multi-valued attribute bag, and the IdP's session index when present.
#[derive(Debug, Clone, Default)]
pub struct AssertionOutcome {
    pub subject: String,
    pub attributes: HashMap<String, Vec<String>>,
    pub session_index: Option<String>,
}

/// Boundary to the identity provider. Implementations own request
/// generation and response validation; callers never touch raw XML.
pub trait AssertionService: Send + Sync {
    /// Build the IdP redirect URL for a new login attempt. Returns the URL
    /// and the outbound request id, which the response must reference.
    fn login_redirect(&self, relay_state: &str) -> Result<(String, String), AppError>;

    /// Decode and validate a base64 response document, checking its
    /// signature against the IdP certificate and, when given, that it
    /// answers the expected request.
    fn validate_response(
        &self,
        saml_response_b64: &str,
        expected_request_id: Option<&str>,
    ) -> Result<AssertionOutcome, AppError>;

    /// Build the IdP single-logout redirect URL, or `None` when the IdP has
    /// no logout endpoint configured.
    fn logout_redirect(
        &self,
        name_id: &str,
        session_index: Option<&str>,
        relay_state: &str,
    ) -> Result<Option<String>, AppError>;

    /// SP metadata document for IdP-side configuration.
    fn sp_metadata(&self) -> String;
}

/// SP-initiated SSO against a single statically configured IdP.
pub struct SamlGateway {
    config: SamlConfig,
}

impl SamlGateway {
    pub fn new(config: SamlConfig) -> Self {
        Self { config }
    }

    /// Build an EntityDescriptor for the IdP from the configured fields.
    fn build_idp_metadata(&self) -> Result<EntityDescriptor, AppError> {
        let slo_element = self
            .config
            .idp_slo_url
            .as_ref()
            .map(|url| {
                format!(
                    r#"<md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="{}"/>"#,
                    url
                )
            })
            .unwrap_or_default();

        let xml = format!(
            r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
    <md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
        <md:KeyDescriptor use="signing">
            <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
                <ds:X509Data>
                    <ds:X509Certificate>{}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>
        <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="{}"/>
        {}
    </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
            self.config.idp_entity_id,
            strip_pem_headers(&self.config.idp_certificate),
            self.config.idp_sso_url,
            slo_element,
        );

        samael::metadata::de::from_str(&xml).map_err(|e| {
            tracing::error!(error = %e, "Failed to build IdP metadata from config");
            AppError::InternalError(anyhow::anyhow!("Failed to build IdP metadata: {}", e))
        })
    }

    fn build_service_provider(&self) -> Result<samael::service_provider::ServiceProvider, AppError> {
        ServiceProviderBuilder::default()
            .entity_id(self.config.sp_entity_id.clone())
            .acs_url(self.config.sp_acs_url.clone())
            .idp_metadata(self.build_idp_metadata()?)
            .authn_name_id_format(self.config.name_id_format.clone().unwrap_or_default())
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build service provider");
                AppError::InternalError(anyhow::anyhow!("Failed to build service provider: {}", e))
            })
    }

    fn name_id_format(&self) -> String {
        self.config
            .name_id_format
            .clone()
            .unwrap_or_else(|| DEFAULT_NAME_ID_FORMAT.to_string())
    }
}

impl AssertionService for SamlGateway {
    fn login_redirect(&self, relay_state: &str) -> Result<(String, String), AppError> {
        let sp = self.build_service_provider()?;

        let authn_request = sp
            .make_authentication_request(&self.config.idp_sso_url)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create authentication request");
                AppError::InternalError(anyhow::anyhow!(
                    "Failed to create authentication request: {}",
                    e
                ))
            })?;

        let request_id = authn_request.id.clone();

        let url = authn_request
            .redirect(relay_state)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to encode authentication request");
                AppError::InternalError(anyhow::anyhow!(
                    "Failed to encode authentication request: {}",
                    e
                ))
            })?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Authentication request has no destination"))
            })?;

        Ok((url.to_string(), request_id))
    }

    fn validate_response(
        &self,
        saml_response_b64: &str,
        expected_request_id: Option<&str>,
    ) -> Result<AssertionOutcome, AppError> {
        let sp = self.build_service_provider()?;

        // Failure detail stays in the log; callers see a uniform
        // authentication failure regardless of what was wrong.
        let possible_request_ids: Vec<&str> = expected_request_id.into_iter().collect();
        let assertion = sp
            .parse_base64_response(saml_response_b64, Some(&possible_request_ids))
            .map_err(|e| {
                tracing::error!(error = %e, "Assertion validation failed");
                AppError::AuthenticationFailed
            })?;

        let subject = assertion
            .subject
            .as_ref()
            .and_then(|s| s.name_id.as_ref())
            .map(|n| n.value.clone())
            .ok_or_else(|| {
                tracing::error!("Assertion is missing a NameID subject");
                AppError::AuthenticationFailed
            })?;

        let mut attributes: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(statements) = assertion.attribute_statements.as_ref() {
            for statement in statements {
                for attr in &statement.attributes {
                    let values: Vec<String> =
                        attr.values.iter().filter_map(|v| v.value.clone()).collect();
                    // Index under both the formal name and the friendly name
                    // so lookups work however the IdP labels things.
                    for key in [attr.name.as_deref(), attr.friendly_name.as_deref()]
                        .into_iter()
                        .flatten()
                    {
                        attributes.insert(key.to_string(), values.clone());
                    }
                }
            }
        }

        let session_index = assertion
            .authn_statements
            .as_ref()
            .and_then(|stmts| stmts.first())
            .and_then(|stmt| stmt.session_index.clone());

        Ok(AssertionOutcome {
            subject,
            attributes,
            session_index,
        })
    }

    fn logout_redirect(
        &self,
        name_id: &str,
        session_index: Option<&str>,
        relay_state: &str,
    ) -> Result<Option<String>, AppError> {
        let idp_slo_url = match &self.config.idp_slo_url {
            Some(url) => url,
            None => return Ok(None),
        };

        let logout_request = LogoutRequest {
            id: Some(format!("_logout_{}", Uuid::new_v4())),
            version: Some("2.0".to_string()),
            issue_instant: Some(Utc::now()),
            destination: Some(idp_slo_url.clone()),
            issuer: Some(Issuer {
                value: Some(self.config.sp_entity_id.clone()),
                ..Default::default()
            }),
            name_id: Some(NameID {
                value: name_id.to_string(),
                format: Some(self.name_id_format()),
            }),
            session_index: session_index.map(|s| s.to_string()),
            signature: None,
        };

        let xml = logout_request.to_string().map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to serialize logout request: {:?}", e))
        })?;

        // HTTP-Redirect binding: DEFLATE, then base64, then query param.
        let mut compressed = vec![];
        {
            let mut encoder = DeflateEncoder::new(&mut compressed, Compression::default());
            encoder.write_all(xml.as_bytes()).map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to compress logout request: {}", e))
            })?;
        }
        let encoded = STANDARD.encode(&compressed);

        let mut url: reqwest::Url = idp_slo_url.parse().map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to parse IdP SLO URL: {}", e))
        })?;
        url.query_pairs_mut().append_pair("SAMLRequest", &encoded);
        if !relay_state.is_empty() {
            url.query_pairs_mut().append_pair("RelayState", relay_state);
        }

        tracing::debug!(idp_slo_url = %idp_slo_url, "Generated single-logout redirect");

        Ok(Some(url.to_string()))
    }

    fn sp_metadata(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
  <md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:NameIDFormat>{}</md:NameIDFormat>
    <md:AssertionConsumerService
        Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
        Location="{}"
        index="0"/>
  </md:SPSSODescriptor>
</md:EntityDescriptor>"#,
            self.config.sp_entity_id,
            self.name_id_format(),
            self.config.sp_acs_url,
        )
    }
}

fn strip_pem_headers(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----BEGIN") && !line.starts_with("-----END"))
        .collect::<Vec<_>>()
        .join("")
}

/// Scripted stand-in for tests: hands out a fixed redirect and either a
/// canned assertion outcome or a validation failure.
pub struct MockAssertionService {
    pub outcome: Option<AssertionOutcome>,
    pub slo_url: Option<String>,
}

impl MockAssertionService {
    pub fn accepting(outcome: AssertionOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            slo_url: None,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            outcome: None,
            slo_url: None,
        }
    }
}

impl AssertionService for MockAssertionService {
    fn login_redirect(&self, relay_state: &str) -> Result<(String, String), AppError> {
        Ok((
            format!(
                "https://idp.example.com/sso?SAMLRequest=stub&RelayState={}",
                relay_state
            ),
            "_mock_request_id".to_string(),
        ))
    }

    fn validate_response(
        &self,
        _saml_response_b64: &str,
        _expected_request_id: Option<&str>,
    ) -> Result<AssertionOutcome, AppError> {
        self.outcome.clone().ok_or(AppError::AuthenticationFailed)
    }

    fn logout_redirect(
        &self,
        _name_id: &str,
        _session_index: Option<&str>,
        relay_state: &str,
    ) -> Result<Option<String>, AppError> {
        Ok(self
            .slo_url
            .as_ref()
            .map(|url| format!("{}?SAMLRequest=stub&RelayState={}", url, relay_state)))
    }

    fn sp_metadata(&self) -> String {
        String::new()
    }
}
