use serde::Deserialize;

/// Query parameters received on the OAuth2 callback.
///
/// Either `code` or `error` is present, `state` is echoed back in both cases.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
