use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::LOCATION;
use reqwest::{redirect, Client, Method, Response, Url};
use tracing::debug;

use super::html;
use crate::api::ApiError;

/// Login-initiation page for the Oma Helen web service
const LOGIN_INIT_URL: &str = "https://www.helen.fi/hcc/TupasLoginFrame?service=account&locale=fi";

/// Identity-provider host the credential form posts against
const LOGIN_HOST: &str = "https://login.helen.fi";

/// HTTP read timeout per individual request. Bounds total login latency
/// together with the redirect hop budget.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum `Location` hops followed in one chain. The identity provider
/// issues a handful per step; anything past this is a redirect loop.
const MAX_REDIRECT_HOPS: u32 = 20;

/// Session validity heuristic in minutes. The token carries no inspectable
/// expiry; within an hour of login it is assumed good.
const SESSION_VALID_MINUTES: i64 = 60;

/// Cookie the portal session deposits on a successful login
const ACCESS_TOKEN_COOKIE: &str = "access-token";

/// A logged-in portal session: the bearer token and when it was acquired.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub acquired_at: DateTime<Utc>,
}

impl Session {
    /// Expiry is checked lazily on use, not by a timer.
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.acquired_at > Duration::minutes(SESSION_VALID_MINUTES)
    }
}

/// Login-flow entry points, overridable for tests.
#[derive(Debug, Clone)]
pub struct AuthEndpoints {
    pub init_url: String,
    pub login_host: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            init_url: LOGIN_INIT_URL.to_string(),
            login_host: LOGIN_HOST.to_string(),
        }
    }
}

/// Drives the multi-step web login and yields a [`Session`].
///
/// The flow walks the portal's redirect/form choreography: initiation page,
/// authorization redirect chain, credential POST against the identity
/// provider, then two code/state continuation hops. Success is detected
/// solely by the `access-token` cookie landing in the jar. Redirects are
/// followed manually so that each hop counts against a fixed budget.
pub struct Authenticator {
    client: Client,
    jar: Arc<Jar>,
    endpoints: AuthEndpoints,
}

impl Authenticator {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_endpoints(AuthEndpoints::default())
    }

    pub fn with_endpoints(endpoints: AuthEndpoints) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_provider(jar.clone())
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            jar,
            endpoints,
        })
    }

    /// Run the login choreography. The first failing step aborts the whole
    /// attempt; nothing is retried.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        debug!("logging in to Oma Helen");

        // Step 1: initiation page carries the authorization form.
        let init_page = self
            .request(Method::GET, &self.endpoints.init_url, None, None)
            .await?;
        ensure_success("login initiation", &init_page)?;
        let init_html = init_page.text().await?;
        let authorization_url = html::form_action(&init_html)
            .ok_or_else(|| auth_error("login initiation page has no form"))?;
        let authorization_method = html::form_method(&init_html)
            .and_then(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .ok_or_else(|| auth_error("login initiation form has no usable method"))?;

        // Step 2: authorization request, following its redirect chain to
        // the credential form.
        let authorization_page = self
            .request(authorization_method, &authorization_url, None, None)
            .await?;
        ensure_success("authorization", &authorization_page)?;
        let authorization_html = authorization_page.text().await?;

        // Step 3: POST the credentials to the identity provider.
        let login_action = html::form_action(&authorization_html)
            .ok_or_else(|| auth_error("authorization page has no login form"))?;
        let login_url = format!("{}{}", self.endpoints.login_host, login_action);
        let granted_page = self
            .request(
                Method::POST,
                &login_url,
                Some(&[("username", username), ("password", password)]),
                None,
            )
            .await?;
        ensure_success("credential check", &granted_page)?;
        let granted_html = granted_page.text().await?;

        // Step 4: access-granted page, continue with its code/state.
        let (continue_url, code, state) =
            extract_continuation(&granted_html, "access granted page")?;
        let proceed_page = self
            .request(
                Method::GET,
                &continue_url,
                None,
                Some(&[("code", code.as_str()), ("state", state.as_str())]),
            )
            .await?;
        ensure_success("login continuation", &proceed_page)?;
        let proceed_url = proceed_page.url().clone();
        let proceed_html = proceed_page.text().await?;

        // Step 5: follow the proceed link.
        let link = html::first_anchor_href(&proceed_html)
            .ok_or_else(|| auth_error("proceed page has no link"))?;
        let link = resolve_href(&proceed_url, &link)?;
        let auth_page = self
            .request(Method::GET, link.as_str(), None, None)
            .await?;
        ensure_success("proceed link", &auth_page)?;
        let auth_html = auth_page.text().await?;

        // Step 6: second code/state hop finalizes the portal session.
        let (finish_url, code, state) =
            extract_continuation(&auth_html, "authorization response page")?;
        let final_page = self
            .request(
                Method::GET,
                &finish_url,
                None,
                Some(&[("code", code.as_str()), ("state", state.as_str())]),
            )
            .await?;
        ensure_success("session finalization", &final_page)?;
        let final_url = final_page.url().clone();

        // Step 7: the jar must now hold the access token.
        let access_token = self
            .cookie_value(&final_url, ACCESS_TOKEN_COOKIE)
            .ok_or_else(|| auth_error("no access token"))?;

        debug!("logged in to Oma Helen");
        Ok(Session {
            access_token,
            acquired_at: Utc::now(),
        })
    }

    /// Issue one request and follow its `Location` chain to the final
    /// response.
    async fn request(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(&str, &str)]>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<Response, ApiError> {
        let mut builder = self.client.request(method, url);
        if let Some(form) = form {
            builder = builder.form(form);
        }
        if let Some(query) = query {
            builder = builder.query(query);
        }
        let response = builder.send().await?;
        self.follow_redirects(response).await
    }

    /// Follow `Location` headers with a GET until a response carries none,
    /// bounded by the hop budget.
    async fn follow_redirects(&self, mut response: Response) -> Result<Response, ApiError> {
        let mut hops = 0u32;
        while let Some(location) = response.headers().get(LOCATION) {
            hops += 1;
            if hops > MAX_REDIRECT_HOPS {
                return Err(ApiError::TooManyRedirects(MAX_REDIRECT_HOPS));
            }
            let location = location
                .to_str()
                .map_err(|_| auth_error("redirect location is not valid UTF-8"))?;
            let next = resolve_href(response.url(), location)?;
            debug!(hop = hops, location = %next, "following redirect");
            response = self.client.get(next).send().await?;
        }
        Ok(response)
    }

    fn cookie_value(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.jar.cookies(url)?;
        let cookies = header.to_str().ok()?;
        cookies.split("; ").find_map(|cookie| {
            let (cookie_name, value) = cookie.split_once('=')?;
            (cookie_name == name).then(|| value.to_string())
        })
    }
}

fn auth_error(step: &str) -> ApiError {
    ApiError::Authentication(step.to_string())
}

fn ensure_success(step: &str, response: &Response) -> Result<(), ApiError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(ApiError::Authentication(format!(
            "{} failed with status {}",
            step,
            response.status()
        )))
    }
}

/// Resolve a possibly relative href against the page it appeared on.
fn resolve_href(base: &Url, href: &str) -> Result<Url, ApiError> {
    base.join(href)
        .map_err(|_| ApiError::Authentication(format!("invalid target url: {}", href)))
}

/// Form action plus the hidden `code`/`state` inputs of a continuation
/// page.
fn extract_continuation(page: &str, step: &str) -> Result<(String, String, String), ApiError> {
    let action =
        html::form_action(page).ok_or_else(|| auth_error(&format!("{} has no form", step)))?;
    let code = html::input_value(page, "code")
        .ok_or_else(|| auth_error(&format!("{} has no code input", step)))?;
    let state = html::input_value(page, "state")
        .ok_or_else(|| auth_error(&format!("{} has no state input", step)))?;
    Ok((action, code, state))
}
