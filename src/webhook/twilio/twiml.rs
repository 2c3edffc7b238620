//! # TwiML documents
//!
//! Views answer Twilio callbacks with a TwiML document: a `<Response>` element
//! holding verbs that Twilio executes in order. [`VoiceResponse`] builds the
//! document, [`TwimlResponse`] turns the serialized markup into an HTTP
//! response tagged with the TwiML content type.
//!
//! ```
//! use ntex_twilio::webhook::twilio::twiml::{Say, VoiceResponse};
//!
//! let mut resp = VoiceResponse::new();
//! resp.say(Say::new("Testing, 1, 2, 3.").voice("female"));
//! assert!(resp.to_xml().contains("<Say voice=\"female\">Testing, 1, 2, 3.</Say>"));
//! ```

use crate::consts;
use ntex::web;
use std::fmt::Write;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Speak text to the caller
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Say {
    pub text: String,
    pub voice: Option<String>,
    pub language: Option<String>,
    pub loop_count: Option<u32>,
}

impl Say {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn voice(mut self, voice: &str) -> Self {
        self.voice = Some(voice.to_string());
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = Some(loop_count);
        self
    }
}

impl From<&str> for Say {
    fn from(text: &str) -> Self {
        Say::new(text)
    }
}

/// Send an SMS during a call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sms {
    pub body: String,
    pub to: Option<String>,
    pub from: Option<String>,
    pub action: Option<String>,
}

impl Sms {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn to(mut self, to: &str) -> Self {
        self.to = Some(to.to_string());
        self
    }

    pub fn from_number(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }
}

impl From<&str> for Sms {
    fn from(body: &str) -> Self {
        Sms::new(body)
    }
}

/// Reply to an incoming message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    pub body: String,
    pub to: Option<String>,
    pub from: Option<String>,
}

impl Message {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn to(mut self, to: &str) -> Self {
        self.to = Some(to.to_string());
        self
    }

    pub fn from_number(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }
}

impl From<&str> for Message {
    fn from(body: &str) -> Self {
        Message::new(body)
    }
}

/// A single TwiML instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    Say(Say),
    Play { url: String, loop_count: Option<u32> },
    Pause { length: Option<u32> },
    Sms(Sms),
    Message(Message),
    Redirect { url: String, method: Option<String> },
    Reject { reason: Option<String> },
    Hangup,
}

impl Verb {
    fn write_xml(&self, out: &mut String) {
        match self {
            Verb::Say(say) => write_element(
                out,
                "Say",
                &[
                    ("voice", say.voice.clone()),
                    ("language", say.language.clone()),
                    ("loop", say.loop_count.map(|n| n.to_string())),
                ],
                Some(say.text.as_str()),
            ),
            Verb::Play { url, loop_count } => write_element(
                out,
                "Play",
                &[("loop", loop_count.map(|n| n.to_string()))],
                Some(url.as_str()),
            ),
            Verb::Pause { length } => write_element(
                out,
                "Pause",
                &[("length", length.map(|n| n.to_string()))],
                None,
            ),
            Verb::Sms(sms) => write_element(
                out,
                "Sms",
                &[
                    ("to", sms.to.clone()),
                    ("from", sms.from.clone()),
                    ("action", sms.action.clone()),
                ],
                Some(sms.body.as_str()),
            ),
            Verb::Message(message) => write_element(
                out,
                "Message",
                &[("to", message.to.clone()), ("from", message.from.clone())],
                Some(message.body.as_str()),
            ),
            Verb::Redirect { url, method } => {
                write_element(out, "Redirect", &[("method", method.clone())], Some(url.as_str()))
            }
            Verb::Reject { reason } => {
                write_element(out, "Reject", &[("reason", reason.clone())], None)
            }
            Verb::Hangup => write_element(out, "Hangup", &[], None),
        }
    }
}

fn write_element(out: &mut String, name: &str, attrs: &[(&str, Option<String>)], text: Option<&str>) {
    out.push('<');
    out.push_str(name);
    for (attr, value) in attrs {
        if let Some(value) = value {
            let _ = write!(out, " {attr}=\"{}\"", escape_xml(value));
        }
    }

    match text {
        Some(text) => {
            let _ = write!(out, ">{}</{name}>", escape_xml(text));
        }
        None => out.push_str("/>"),
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builder for a TwiML `<Response>` document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, verb: Verb) -> &mut Self {
        self.verbs.push(verb);
        self
    }

    pub fn say(&mut self, say: impl Into<Say>) -> &mut Self {
        self.append(Verb::Say(say.into()))
    }

    pub fn play(&mut self, url: &str) -> &mut Self {
        self.append(Verb::Play {
            url: url.to_string(),
            loop_count: None,
        })
    }

    pub fn pause(&mut self, length: u32) -> &mut Self {
        self.append(Verb::Pause {
            length: Some(length),
        })
    }

    pub fn sms(&mut self, sms: impl Into<Sms>) -> &mut Self {
        self.append(Verb::Sms(sms.into()))
    }

    pub fn message(&mut self, message: impl Into<Message>) -> &mut Self {
        self.append(Verb::Message(message.into()))
    }

    pub fn redirect(&mut self, url: &str) -> &mut Self {
        self.append(Verb::Redirect {
            url: url.to_string(),
            method: None,
        })
    }

    pub fn reject(&mut self) -> &mut Self {
        self.append(Verb::Reject { reason: None })
    }

    pub fn hangup(&mut self) -> &mut Self {
        self.append(Verb::Hangup)
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Serializes the document, XML declaration included
    pub fn to_xml(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        if self.verbs.is_empty() {
            out.push_str("<Response/>");
            return out;
        }

        out.push_str("<Response>");
        for verb in &self.verbs {
            verb.write_xml(&mut out);
        }
        out.push_str("</Response>");
        out
    }
}

/// Serialized TwiML ready to leave the process
#[derive(Debug, Clone, PartialEq)]
pub struct TwimlResponse {
    body: String,
}

impl TwimlResponse {
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content_type(&self) -> &'static str {
        consts::TWIML_CONTENT_TYPE
    }

    pub fn into_http_response(self) -> web::HttpResponse {
        web::HttpResponse::Ok()
            .content_type(consts::TWIML_CONTENT_TYPE)
            .body(self.body)
    }
}

impl From<VoiceResponse> for TwimlResponse {
    fn from(document: VoiceResponse) -> Self {
        Self {
            body: document.to_xml(),
        }
    }
}

impl From<TwimlResponse> for web::HttpResponse {
    fn from(response: TwimlResponse) -> Self {
        response.into_http_response()
    }
}
