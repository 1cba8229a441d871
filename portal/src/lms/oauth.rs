use serde::Deserialize;
use url::Url;
use zeroize::Zeroize;

use crate::lms::{LmsClient, LmsError, Traced};

const AUTHORIZE_PATH: &str = "/login/oauth2/auth";
const TOKEN_PATH: &str = "/login/oauth2/token";

/// OAuth2 client credentials issued by the LMS.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer token.
#[derive(Clone, PartialEq, Eq, Zeroize, Deserialize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// User the token was issued for, as reported by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LmsUser {
    pub id: u64,
    pub name: String,
}

/// Successful response of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: AccessToken,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds. Informational, expiry is not tracked.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<LmsUser>,
}

impl LmsClient {
    /// Builds the URL the browser is sent to in order to obtain an authorization code.
    ///
    /// `state` must be freshly generated for every call and remembered by the caller,
    /// the callback is only valid if it carries the same value back.
    pub fn authorization_url(
        &self,
        credentials: &ClientCredentials,
        redirect_uri: &str,
        state: &str,
    ) -> Result<Url, LmsError> {
        let mut url = self.resolve(AUTHORIZE_PATH, &[])?;

        url.query_pairs_mut()
            .append_pair("client_id", &credentials.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);

        Ok(url)
    }

    /// Trades an authorization code for an access token.
    ///
    /// `redirect_uri` must be identical to the one used for [`Self::authorization_url`].
    /// A non-2xx answer fails with [`LmsError::TokenExchange`], nothing is retried.
    pub async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Traced<TokenGrant>, LmsError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ];

        self.post_form(TOKEN_PATH, &form)
            .await
            .map_err(|e| match e {
                LmsError::Upstream { status, body, url } => {
                    LmsError::TokenExchange { status, body, url }
                }
                e => e,
            })
    }
}
