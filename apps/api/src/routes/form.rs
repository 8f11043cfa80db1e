//! Form extractor accepting either `application/x-www-form-urlencoded` or
//! `multipart/form-data`, so browser uploads and plain form posts share one handler.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};

use crate::errors::AppError;

#[derive(Debug, Default)]
pub struct FormFields(pub HashMap<String, String>);

impl FormFields {
    /// The field's value, or `None` when it is missing or blank.
    pub fn optional(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn required(&self, name: &str) -> Result<&str, AppError> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("Field '{name}' is required")))
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return Ok(Self(fields));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let mut fields = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            fields.insert(name, value);
        }
        Ok(Self(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    async fn extract(content_type: &str, body: &str) -> Result<FormFields, AppError> {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        FormFields::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_urlencoded_fields() {
        let form = extract(
            "application/x-www-form-urlencoded",
            "text=slept+badly&entry_type=mood&timestamp=",
        )
        .await
        .unwrap();
        assert_eq!(form.optional("text"), Some("slept badly"));
        assert_eq!(form.optional("timestamp"), None);
        assert!(form.required("audio_data").is_err());
    }

    #[tokio::test]
    async fn test_multipart_fields() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"text\"\r\n\r\n\
            Patient reports dizziness.\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"language\"\r\n\r\n\
            en-GB\r\n\
            --XYZ--\r\n";
        let form = extract("multipart/form-data; boundary=XYZ", body)
            .await
            .unwrap();
        assert_eq!(form.required("text").unwrap(), "Patient reports dizziness.");
        assert_eq!(form.optional("language"), Some("en-GB"));
    }
}
