use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header, Request},
    Form,
};

use crate::errors::RequestError;
use crate::media::Upload;

/// Body of an HTML form, either url-encoded or multipart. Multipart file
/// fields with a filename are collected separately from the text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}

fn is_multipart(req: &Request<Body>) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

#[axum::async_trait]
impl<S> FromRequest<S, Body> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| RequestError::Validation(e.body_text()))?;
            return Ok(UploadForm {
                fields,
                files: HashMap::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| RequestError::Validation(e.body_text()))?;
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RequestError::Validation(e.to_string()))?
        {
            let name = match field.name() {
                Some(name) => name.to_owned(),
                None => continue,
            };
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| RequestError::Validation(e.to_string()))?;
                    // browsers send an empty part when no file was picked
                    if !file_name.is_empty() && !bytes.is_empty() {
                        form.files.insert(name, Upload { file_name, bytes });
                    }
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| RequestError::Validation(e.to_string()))?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }
}

#[cfg(test)]
impl UploadForm {
    pub(crate) fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        UploadForm {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            files: HashMap::new(),
        }
    }
}
