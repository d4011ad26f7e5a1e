use rocket::http::Status;
use rocket::request::Request;
use rocket::response::status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};
use thiserror::Error;
use tracing::error;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Rejected mutation of the follow or like graph.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    #[error("You are already following this user")]
    AlreadyFollowing,
    #[error("You are not following this user")]
    NotFollowing,
    #[error("You can't follow yourself")]
    SelfFollow,
    #[error("The user has already liked this tweet")]
    AlreadyLiked,
    #[error("There is no like on the tweet")]
    NotLiked,
}

/// Error type shared by every store operation and request handler.
///
/// Each variant has an envelope name (`error_type`) and an HTTP status.
/// Responses always look like:
///
/// ```json
/// {"result": false, "error_type": "TweetNotFoundError", "error_message": "..."}
/// ```
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Passed api-key is empty")]
    MissingApiKey,

    #[error("User with the passed api-key does not exist")]
    UnknownApiKey,

    #[error("User with passed id does not exist")]
    UserNotFound,

    #[error("Tweet with the passed id does not exist")]
    TweetNotFound,

    #[error("Deleting a tweet that does not belong to the user")]
    NotTweetOwner,

    #[error("{0}")]
    Relationship(RelationshipKind),

    #[error("Size of the file is larger than 5 MB")]
    FileSize,

    #[error("Not allowed file extension. Allowed extensions: jpg, jpeg, png, tiff, heic")]
    FileType,

    #[error("The file contains malware")]
    FileMalware,

    /// Malformed request; carries the first violation found.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal database error")]
    Database(#[from] diesel::result::Error),

    #[error("Internal storage error")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::MissingApiKey | ApiError::UnknownApiKey | ApiError::UserNotFound => {
                "UserNotFoundError"
            }
            ApiError::TweetNotFound => "TweetNotFoundError",
            ApiError::NotTweetOwner => "OwnershipError",
            ApiError::Relationship(_) => "RelationshipError",
            ApiError::FileSize => "FileSizeError",
            ApiError::FileType => "FileTypeError",
            ApiError::FileMalware => "FileMalwareError",
            ApiError::Validation(_) => "ValidationError",
            ApiError::NotFound(_) => "NotFoundError",
            ApiError::Database(_) | ApiError::Storage(_) => "InternalError",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::MissingApiKey
            | ApiError::UnknownApiKey
            | ApiError::UserNotFound
            | ApiError::TweetNotFound
            | ApiError::NotFound(_) => Status::NotFound,
            ApiError::NotTweetOwner => Status::Forbidden,
            ApiError::Relationship(_) | ApiError::FileType | ApiError::FileMalware => {
                Status::BadRequest
            }
            ApiError::FileSize => Status::PayloadTooLarge,
            ApiError::Validation(_) => Status::UnprocessableEntity,
            ApiError::Database(_) | ApiError::Storage(_) => Status::InternalServerError,
        }
    }
}

impl From<RelationshipKind> for ApiError {
    fn from(kind: RelationshipKind) -> ApiError {
        ApiError::Relationship(kind)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match &self {
            ApiError::Database(err) => error!(uri = %req.uri(), "database failure: {}", err),
            ApiError::Storage(err) => error!(uri = %req.uri(), "blob storage failure: {}", err),
            _ => {}
        }

        let body = json!({
            "result": false,
            "error_type": self.error_type(),
            "error_message": self.to_string(),
        });
        status::Custom(self.status(), Json(body)).respond_to(req)
    }
}

/// Collects field errors of a request body.
///
/// Fields of request bodies are `Option`s so that a missing field is
/// reported the same way as an invalid one.
pub struct FieldValidator {
    errors: ValidationErrors,
}

impl FieldValidator {
    pub fn validate<T: Validate>(model: &T) -> Self {
        Self {
            errors: model.validate().err().unwrap_or_else(ValidationErrors::new),
        }
    }

    /// Convenience method to trigger early returns with ? operator.
    pub fn check(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(first_violation(&self.errors)))
        }
    }

    pub fn extract<T>(&mut self, field_name: &'static str, field: Option<T>) -> T
    where
        T: Default,
    {
        field.unwrap_or_else(|| {
            self.errors
                .add(field_name, ValidationError::new("can't be blank"));
            T::default()
        })
    }
}

/// Message of the first failing field, fields taken in name order.
fn first_violation(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(name, _)| **name);

    for (name, kind) in fields {
        if let ValidationErrorsKind::Field(field_errors) = kind {
            if let Some(err) = field_errors.first() {
                let message = err
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                return format!("{}: {}", name, message);
            }
        }
    }
    "invalid request".to_string()
}
