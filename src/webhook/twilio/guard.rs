//! Callback verification for TwiML views
//!
//! [`twiml`] wraps a view so it only runs for genuine callbacks. The checks
//! run in order and stop at the first failure:
//!
//! 1. Only `POST` is a callback, anything else is `405 Method Not Allowed`
//! 2. With a secret key configured, basic auth must carry the `twilio` user
//!    and a fresh token minted by [`call_for`](super::Twilio::call_for),
//!    otherwise `401 Unauthorized` with a challenge
//! 3. The `X-Twilio-Signature` header must match the url and form fields,
//!    otherwise `403 Forbidden`
//!
//! Trusted mode skips all three. The token check proves the call was started
//! by this application, the signature check proves the request comes from
//! Twilio. Both travel in clear text over plain HTTP, so callbacks should be
//! served over HTTPS.

use super::{CallbackError, Twilio, TwimlResponse, VoiceResponse};
use crate::{consts, metric};
use base64::{Engine, prelude::BASE64_STANDARD};
use ntex::{
    http::{Method, header},
    web,
};

/// The parts of an inbound request the callback checks look at
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    pub method: Method,
    /// Absolute url the request was sent to, query string included
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// `X-Twilio-Signature` header value
    pub signature: Option<String>,
    /// `Authorization` header value
    pub authorization: Option<String>,
}

impl CallbackRequest {
    pub fn new(method: Method, url: &str) -> Self {
        let query = url::Url::parse(url)
            .map(|parsed| {
                parsed
                    .query_pairs()
                    .map(|(name, value)| (name.into_owned(), value.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            method,
            url: url.to_string(),
            query,
            form: Vec::new(),
            body: Vec::new(),
            signature: None,
            authorization: None,
        }
    }

    /// Collects the callback parts of an ntex request and its raw body
    pub fn from_http(req: &web::HttpRequest, body: &[u8]) -> Self {
        let url = {
            let info = req.connection_info();
            let path = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            format!("{}://{}{}", info.scheme(), info.host(), path)
        };

        let header_value = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let is_form = is_form_content_type(header_value(header::CONTENT_TYPE.as_str()).as_deref());

        let mut request = Self::new(req.method().clone(), &url);
        if is_form {
            request.form = url::form_urlencoded::parse(body).into_owned().collect();
        }
        request.body = body.to_vec();
        request.signature = header_value(consts::TWILIO_SIGNATURE_HEADER);
        request.authorization = header_value(header::AUTHORIZATION.as_str());
        request
    }

    pub fn with_form(mut self, name: &str, value: &str) -> Self {
        self.form.push((name.to_string(), value.to_string()));
        self.body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.form)
            .finish()
            .into_bytes();
        self
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        let credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));
        self.authorization = Some(format!("Basic {credentials}"));
        self
    }

    /// Looks a value up in the query string first, then in the form body
    pub fn value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .chain(self.form.iter())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Username and password of a `Basic` authorization header
    pub fn credentials(&self) -> Option<(String, String)> {
        let (scheme, encoded) = self.authorization.as_deref()?.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some((username.to_string(), password.to_string()))
    }
}

/// Whether a body with this `Content-Type` carries form fields, media type
/// names are case-insensitive and parameters such as `charset` are ignored
fn is_form_content_type(content_type: Option<&str>) -> bool {
    content_type.is_none_or(|content_type| {
        content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .eq_ignore_ascii_case("application/x-www-form-urlencoded")
    })
}

/// Decides whether `request` is a genuine, freshly issued Twilio callback
pub fn verify(twilio: &Twilio, request: &CallbackRequest) -> Result<(), CallbackError> {
    if twilio.is_trusted() {
        return Ok(());
    }

    if request.method != Method::POST {
        metric::incr_callback_statds("method_not_allowed");
        return Err(CallbackError::MethodNotAllowed);
    }

    if let Some(signer) = twilio.signer() {
        let max_age = twilio.settings().token_max_age;
        let authorized = request.credentials().is_some_and(|(username, password)| {
            username == consts::BASIC_AUTH_USERNAME && signer.verify(&password, max_age)
        });
        if !authorized {
            metric::incr_callback_statds("unauthorized");
            return Err(CallbackError::AuthenticationFailure);
        }
    }

    let valid = twilio.validator().validate(
        &request.url,
        &request.form,
        &request.body,
        request.signature.as_deref().unwrap_or_default(),
    );
    if !valid {
        metric::incr_callback_statds("forbidden");
        return Err(CallbackError::SignatureMismatch);
    }

    metric::incr_callback_statds("allowed");
    Ok(())
}

/// A view that only runs once [`verify`] lets the request through
pub struct TwimlView<V> {
    view: V,
}

/// Marks `view` as producing TwiML for Twilio callbacks
pub fn twiml<V>(view: V) -> TwimlView<V>
where
    V: Fn(&CallbackRequest) -> VoiceResponse,
{
    TwimlView { view }
}

impl<V> TwimlView<V>
where
    V: Fn(&CallbackRequest) -> VoiceResponse,
{
    pub fn handle(
        &self,
        twilio: &Twilio,
        request: &CallbackRequest,
    ) -> Result<TwimlResponse, CallbackError> {
        verify(twilio, request)?;
        Ok(TwimlResponse::from((self.view)(request)))
    }

    /// Runs the view for an ntex request, rejections become error responses
    pub fn respond(
        &self,
        twilio: &Twilio,
        req: &web::HttpRequest,
        body: &[u8],
    ) -> Result<web::HttpResponse, web::Error> {
        let _span = tracing::info_span!("twilio_callback").entered();

        let request = CallbackRequest::from_http(req, body);
        let response = self.handle(twilio, &request)?;
        Ok(response.into_http_response())
    }
}
