//! Call form handlers

use ntex::web;
use serde::{Deserialize, Serialize};

use crate::{
    consts,
    front::{AppState, errors, routes, templates},
    webhook::twilio::CallOptions,
};

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallForm {
    pub say: Option<String>,
    pub sms: Option<String>,
    pub to: Option<String>,
}

/// Bootstrap alert shown above the form
#[derive(Debug, Serialize)]
struct Alert {
    category: &'static str,
    message: String,
}

/// Reads a `0`/`1` form flag, anything missing or unparsable counts as set
pub fn flag(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .is_none_or(|v| v != 0)
}

fn render_index(to: &str, alerts: &[Alert]) -> Result<web::HttpResponse, web::Error> {
    let mut context = tera::Context::new();
    context.insert("to", to);
    context.insert("alerts", alerts);

    Ok(web::HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(
            templates::WEB_TEMPLATES
                .render("index.html", &context)
                .map_err(|e| {
                    errors::ServerError::TemplateError(format!(
                        "at / endpoint the template couldnt be rendered: {e}"
                    ))
                })?,
        ))
}

/// Return a [UrlNotFound](errors::UserError::UrlNotFound) error for urls not defined
pub async fn serve_not_found() -> Result<web::HttpResponse, web::Error> {
    Err(errors::UserError::UrlNotFound.into())
}

/// Endpoint to render the call form
#[web::get("/")]
pub async fn index(query: web::types::Query<IndexQuery>) -> Result<impl web::Responder, web::Error> {
    render_index(
        query.to.as_deref().unwrap_or(consts::DEFAULT_NUMBER),
        &[],
    )
}

/// Places a test call, or only sends the SMS text when `say` is off
#[web::post("/")]
pub async fn place_call(
    app_state: web::types::State<AppState>,
    form: web::types::Form<CallForm>,
) -> Result<impl web::Responder, web::Error> {
    let say = flag(form.say.as_deref());
    let sms = flag(form.sms.as_deref());
    let to = form.to.clone().unwrap_or_default();

    let twilio = app_state.twilio();
    let result = if say {
        let options = CallOptions::new()
            .query("say", &u8::from(say).to_string())
            .query("sms", &u8::from(sms).to_string());
        twilio
            .call_for(&app_state.endpoints, routes::TEST_CALL_ENDPOINT, &to, options)
            .await
            .map(|_| ())
    } else {
        twilio
            .message(consts::DEMO_SMS_TEXT, &to, CallOptions::new())
            .await
            .map(|_| ())
    };

    let alert = match result {
        Ok(()) => Alert {
            category: "success",
            message: "Request was successfully sent to Twilio.".to_string(),
        },
        Err(e) => {
            tracing::error!("Failed to place demo request: {}", e);
            Alert {
                category: "danger",
                message: format!("Failed to make call: {e}"),
            }
        }
    };

    let to = if to.is_empty() {
        consts::DEFAULT_NUMBER
    } else {
        to.as_str()
    };
    render_index(to, &[alert])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TwilioSettings;
    use ntex::{http, web::test};

    fn app_state() -> AppState {
        AppState::new(
            TwilioSettings::new("sid", "token", consts::DEFAULT_NUMBER),
            "https://calls.example.com",
        )
    }

    #[test]
    fn test_flag() {
        assert!(flag(None));
        assert!(flag(Some("1")));
        assert!(flag(Some("2")));
        assert!(flag(Some("yes")));
        assert!(!flag(Some("0")));
        assert!(!flag(Some(" 0 ")));
    }

    #[ntex::test]
    async fn test_index_renders_default_number() {
        let app = test::init_service(
            web::App::new()
                .state(app_state())
                .configure(routes::demo),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);

        let body = test::read_body(resp).await;
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains(r#"value="+15005550006""#));
        assert!(!body.contains("alert-"));
    }

    #[ntex::test]
    async fn test_failed_call_shows_danger_alert() {
        let app = test::init_service(
            web::App::new()
                .state(app_state())
                .configure(routes::demo),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .set_form(&[("say", "1"), ("sms", "1"), ("to", "")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);

        let body = test::read_body(resp).await;
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("alert-danger"));
        assert!(body.contains("Failed to make call: a destination number is required"));
    }
}
