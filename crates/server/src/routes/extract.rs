//! Extractors that report malformed input as [`ApiError::InvalidMessage`].

use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Query, Request},
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::ApiError;
use crate::inbox::uploads::IncomingFile;
use crate::models::{ForwardReference, SendMessageRequest};
use crate::AppState;

pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid(e.body_text()))?;
        Ok(JsonBody(value))
    }
}

pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid(e.body_text()))?;
        Ok(QueryParams(value))
    }
}

/// Text fields and files of a multipart body, in arrival order.
#[derive(Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<IncomingFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::invalid(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            match file_name {
                Some(original_name) => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::invalid(e.body_text()))?;
                    form.files.push(IncomingFile {
                        original_name,
                        mime_type: content_type,
                        data,
                        duration: None,
                    });
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::invalid(e.body_text()))?;
                    form.fields.push((name, value));
                }
            }
        }

        // A single `duration` field applies to the voice notes in the form.
        let duration = form.text("duration").and_then(|d| d.trim().parse::<f64>().ok());
        if duration.is_some() {
            for file in &mut form.files {
                file.duration = duration;
            }
        }
        Ok(form)
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid(e.body_text()))?;
        MultipartForm::read(multipart).await
    }
}

/// Body of `POST /threads/{id}/messages`: JSON, or multipart with inline files.
pub struct SendMessageForm {
    pub body: SendMessageRequest,
    pub files: Vec<IncomingFile>,
}

impl FromRequest<Arc<AppState>> for SendMessageForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let JsonBody(body) = JsonBody::<SendMessageRequest>::from_request(req, state).await?;
            return Ok(SendMessageForm {
                body,
                files: Vec::new(),
            });
        }

        let form = MultipartForm::from_request(req, state).await?;
        let mut body = SendMessageRequest::default();
        for (name, value) in &form.fields {
            match name.as_str() {
                "content" => body.content = value.clone(),
                "replyTo" => body.reply_to = Some(value.clone()),
                "attachmentIds" => body.attachment_ids.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string),
                ),
                "forwardedFrom" => {
                    body.forwarded_from = Some(ForwardReference {
                        message_id: value.trim().to_string(),
                    })
                }
                _ => {}
            }
        }

        Ok(SendMessageForm {
            body,
            files: form.files,
        })
    }
}
