//! Outgoing requests and their responses.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use sktrack_core::error::ApiError;
use sktrack_core::types::is_issuance_endpoint;
use sktrack_core::AccessToken;

/// A request on its way to the backend.
///
/// `retried` marks a request that has already been re-issued after a token
/// refresh. It is set by the client, never by callers, and a request that
/// carries it is never refreshed again.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: RequestBody,
    pub(crate) headers: HeaderMap,
    pub(crate) retried: bool,
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Preset a header. A preset `Authorization` is sent as-is and the
    /// stored token is not attached.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Settle headers before dispatch and attach `token` when allowed.
    ///
    /// JSON is the default content type. Multipart bodies lose any preset
    /// content type so the transport can add one with the boundary. The
    /// bearer header is only added for non-issuance paths that have no
    /// `Authorization` yet. Returns true if the token was attached.
    pub(crate) fn prepare(&mut self, token: Option<&AccessToken>) -> bool {
        match self.body {
            RequestBody::Multipart(_) => {
                self.headers.remove(CONTENT_TYPE);
            }
            _ => {
                if !self.headers.contains_key(CONTENT_TYPE) {
                    self.headers
                        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
            }
        }

        let Some(token) = token else {
            return false;
        };
        if is_issuance_endpoint(&self.path) || self.headers.contains_key(AUTHORIZATION) {
            return false;
        }
        self.set_bearer(token)
    }

    /// Replace the `Authorization` header with `token`.
    pub(crate) fn set_bearer(&mut self, token: &AccessToken) -> bool {
        match HeaderValue::from_str(&token.bearer()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
                true
            }
            Err(_) => {
                tracing::warn!("Access token is not a valid header value, sending without it");
                false
            }
        }
    }

    /// Whether a 401 on this request may trigger a refresh.
    pub(crate) fn refreshable(&self) -> bool {
        !self.retried && !is_issuance_endpoint(&self.path)
    }
}

/// A `multipart/form-data` body.
///
/// Kept as plain data so a request can be cloned and re-sent after a token
/// refresh; it is turned into a transport form on every dispatch.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

/// One field of a [`MultipartForm`].
#[derive(Debug, Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: Option<String>,
    },
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: Option<String>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub(crate) fn to_form(&self) -> Form {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    bytes,
                    mime,
                } => form.part(name.clone(), file_part(file_name, bytes, mime.as_deref())),
            };
        }
        form
    }
}

fn file_part(file_name: &str, bytes: &[u8], mime: Option<&str>) -> Part {
    let part = || Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
    match mime {
        Some(mime) => part().mime_str(mime).unwrap_or_else(|e| {
            tracing::warn!(error = %e, mime, "Ignoring invalid content type for form file");
            part()
        }),
        None => part(),
    }
}

/// A successful backend response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Decode the body. An empty body decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| {
            ApiError::status(self.status.as_u16(), format!("unexpected response body: {}", e))
                .with_source(e)
        })
    }
}
