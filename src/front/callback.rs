//! TwiML fetched by the calls placed from the demo form

use ntex::{util::Bytes, web};

use crate::{
    consts,
    front::{AppState, server},
    webhook::twilio::{CallbackRequest, VoiceResponse, twiml, twiml::Say},
};

/// Speaks a greeting and sends an SMS, each unless turned off with `0`
pub fn test_call(request: &CallbackRequest) -> VoiceResponse {
    let mut resp = VoiceResponse::new();
    if server::flag(request.value("say")) {
        resp.say(Say::new(consts::DEMO_CALL_TEXT).voice("female"));
    }
    if server::flag(request.value("sms")) {
        resp.sms(consts::DEMO_SMS_TEXT);
    }
    resp
}

pub async fn test_call_twiml(
    req: web::HttpRequest,
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<web::HttpResponse, web::Error> {
    let twilio = app_state.twilio();
    twiml(test_call).respond(&twilio, &req, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TwilioSettings,
        front::routes,
        webhook::twilio::{Twilio, client::MockVoiceProvider},
    };
    use base64::{Engine, prelude::BASE64_STANDARD};
    use ntex::{
        http::{self, Method, header},
        web::test,
    };

    const HOST: &str = "calls.example.com";
    const CALLBACK_URL: &str = "http://calls.example.com/twiml?say=1&sms=0";

    fn settings() -> TwilioSettings {
        TwilioSettings::new("sid", "token", consts::DEFAULT_NUMBER)
    }

    fn signature(settings: &TwilioSettings, form: &[(String, String)]) -> String {
        Twilio::with_provider(settings, Box::new(MockVoiceProvider::new()))
            .validator()
            .compute_signature(CALLBACK_URL, form)
            .unwrap()
    }

    fn call_sid_form() -> Vec<(String, String)> {
        vec![("CallSid".to_string(), "CA123".to_string())]
    }

    #[test]
    fn test_view_follows_flags() {
        let request = CallbackRequest::new(Method::POST, "https://calls.example.com/twiml");
        let xml = test_call(&request).to_xml();
        assert!(xml.contains(r#"<Say voice="female">This is a voice call from Twilio!</Say>"#));
        assert!(xml.contains("<Sms>This is an SMS message from Twilio!</Sms>"));

        let request =
            CallbackRequest::new(Method::POST, "https://calls.example.com/twiml?say=0&sms=1");
        let xml = test_call(&request).to_xml();
        assert!(!xml.contains("<Say"));
        assert!(xml.contains("<Sms>"));
    }

    #[ntex::test]
    async fn test_get_not_allowed() {
        let app = test::init_service(
            web::App::new()
                .state(AppState::new(settings(), "http://calls.example.com"))
                .configure(routes::demo),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/twiml")
            .header(header::HOST, HOST)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[ntex::test]
    async fn test_unsigned_post_forbidden() {
        let app = test::init_service(
            web::App::new()
                .state(AppState::new(settings(), "http://calls.example.com"))
                .configure(routes::demo),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/twiml?say=1&sms=0")
            .header(header::HOST, HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .set_payload("CallSid=CA123")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);
    }

    #[ntex::test]
    async fn test_signed_post_returns_twiml() {
        let settings = settings();
        let signature = signature(&settings, &call_sid_form());
        let app = test::init_service(
            web::App::new()
                .state(AppState::new(settings, "http://calls.example.com"))
                .configure(routes::demo),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/twiml?say=1&sms=0")
            .header(header::HOST, HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(consts::TWILIO_SIGNATURE_HEADER, signature.as_str())
            .set_payload("CallSid=CA123")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap(),
            consts::TWIML_CONTENT_TYPE
        );

        let body = test::read_body(resp).await;
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("<Say voice=\"female\">"));
        assert!(!body.contains("<Sms>"));
    }

    #[ntex::test]
    async fn test_missing_token_challenged() {
        let settings = settings().with_secret_key("secret");
        let signature = signature(&settings, &call_sid_form());
        let app = test::init_service(
            web::App::new()
                .state(AppState::new(settings, "http://calls.example.com"))
                .configure(routes::demo),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/twiml?say=1&sms=0")
            .header(header::HOST, HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(consts::TWILIO_SIGNATURE_HEADER, signature.as_str())
            .set_payload("CallSid=CA123")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap().to_str().unwrap(),
            consts::BASIC_AUTH_CHALLENGE
        );
    }

    #[ntex::test]
    async fn test_token_from_callback_url_accepted() {
        let settings = settings().with_secret_key("secret");
        let signature = signature(&settings, &call_sid_form());

        let twilio = Twilio::with_provider(&settings, Box::new(MockVoiceProvider::new()));
        let query = vec![
            ("say".to_string(), "1".to_string()),
            ("sms".to_string(), "0".to_string()),
        ];
        let callback_url = twilio
            .callback_url(
                &routes::endpoints("http://calls.example.com"),
                routes::TEST_CALL_ENDPOINT,
                &query,
            )
            .unwrap();
        let mut parsed = url::Url::parse(&callback_url).unwrap();
        let username = parsed.username().to_string();
        let token = parsed.password().unwrap().to_string();
        parsed.set_username("").unwrap();
        parsed.set_password(None).unwrap();
        assert_eq!(parsed.as_str(), CALLBACK_URL);

        let app = test::init_service(
            web::App::new()
                .state(AppState::new(settings, "http://calls.example.com"))
                .configure(routes::demo),
        )
        .await;

        let authorization = format!(
            "Basic {}",
            BASE64_STANDARD.encode(format!("{username}:{token}"))
        );
        let req = test::TestRequest::post()
            .uri("/twiml?say=1&sms=0")
            .header(header::HOST, HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::AUTHORIZATION, authorization.as_str())
            .header(consts::TWILIO_SIGNATURE_HEADER, signature.as_str())
            .set_payload("CallSid=CA123")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap(),
            consts::TWIML_CONTENT_TYPE
        );

        let forged = format!(
            "Basic {}",
            BASE64_STANDARD.encode(format!("{username}:{token}x"))
        );
        let req = test::TestRequest::post()
            .uri("/twiml?say=1&sms=0")
            .header(header::HOST, HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::AUTHORIZATION, forged.as_str())
            .header(consts::TWILIO_SIGNATURE_HEADER, signature.as_str())
            .set_payload("CallSid=CA123")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap().to_str().unwrap(),
            consts::BASIC_AUTH_CHALLENGE
        );
    }

    #[ntex::test]
    async fn test_trusted_mode_skips_checks() {
        let settings = settings().with_secret_key("secret").with_trusted_mode(true);
        let app = test::init_service(
            web::App::new()
                .state(AppState::new(settings, "http://calls.example.com"))
                .configure(routes::demo),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/twiml")
            .header(header::HOST, HOST)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
    }
}
