//! Authentication and account recovery endpoints
//!
//! - POST /api/v1/auth/signup - Create an account and open a session
//! - POST /api/v1/auth/login - Open a session
//! - POST /api/v1/auth/logout - Close the session
//! - GET  /api/v1/auth/me - Current user
//! - GET  /api/v1/auth/questions - Security question catalog
//! - POST /api/v1/auth/forgot - Question registered for an email
//! - POST /api/v1/auth/verify-answer - Verify answer, mint reset token
//! - POST /api/v1/auth/reset-password - Spend token on a new password

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ApiResponse;
use crate::services::user::SignupInput;
use crate::services::{RecoveryServiceError, UserServiceError};

/// Session cookie lifetime, matching the server-side expiry
const SESSION_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::EmailTaken(email) => {
                ApiError::conflict(format!("Email already registered: {}", email))
            }
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::SessionExpired | UserServiceError::SessionNotFound => {
                ApiError::unauthorized("Invalid or expired session")
            }
            UserServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<RecoveryServiceError> for ApiError {
    fn from(e: RecoveryServiceError) -> Self {
        match e {
            RecoveryServiceError::UnknownEmail => {
                ApiError::not_found("No account found for that email")
            }
            RecoveryServiceError::IncorrectAnswer => {
                ApiError::conflict("Security answer is incorrect")
            }
            RecoveryServiceError::InvalidToken => {
                ApiError::unauthorized("Reset token is invalid or expired")
            }
            RecoveryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            RecoveryServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

/// Request body for signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub security_question_id: i64,
    pub security_answer: String,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the forgot-password lookup
#[derive(Debug, Deserialize)]
pub struct ForgotRequest {
    pub email: String,
}

/// Request body for answer verification
#[derive(Debug, Deserialize)]
pub struct VerifyAnswerRequest {
    pub email: String,
    pub answer: String,
}

/// Request body for the final reset step
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// User info returned by the API
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful signup and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/questions", get(list_questions))
        .route("/forgot", post(forgot))
        .route("/verify-answer", post(verify_answer))
        .route("/reset-password", post(reset_password))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

fn session_cookie(session_id: &str) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session_id, SESSION_COOKIE_MAX_AGE
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::internal_error(format!("Invalid cookie value: {}", e)))?,
    );
    Ok(headers)
}

/// POST /api/v1/auth/signup
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state
        .user_service
        .signup(SignupInput {
            email: body.email,
            name: body.name,
            password: body.password,
            security_question_id: body.security_question_id,
            security_answer: body.security_answer,
        })
        .await?;

    let headers = session_cookie(&session.id)?;

    Ok((
        StatusCode::CREATED,
        headers,
        Json(ApiResponse::ok(AuthResponse {
            user: user.into(),
            token: session.id,
        })),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(&body.email, &body.password).await?;

    let headers = session_cookie(&session.id)?;

    Ok((
        headers,
        Json(ApiResponse::ok(AuthResponse {
            user: user.into(),
            token: session.id,
        })),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // Token presence is guaranteed by the auth middleware
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(String::from)
        .or_else(|| {
            headers
                .get(header::COOKIE)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| {
                    s.split(';')
                        .map(str::trim)
                        .find_map(|c| c.strip_prefix("session="))
                        .map(String::from)
                })
        })
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    // Expire the cookie on the way out
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );

    Ok((
        response_headers,
        Json(ApiResponse::ok(serde_json::json!({}))),
    ))
}

/// GET /api/v1/auth/me
async fn me(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::ok(UserResponse::from(user))))
}

/// GET /api/v1/auth/questions
async fn list_questions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let questions = state.recovery_service.list_questions().await?;
    Ok(Json(ApiResponse::ok(questions)))
}

/// POST /api/v1/auth/forgot
async fn forgot(
    State(state): State<AppState>,
    Json(body): Json<ForgotRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state.recovery_service.question_for(&body.email).await?;
    Ok(Json(ApiResponse::ok(question)))
}

/// POST /api/v1/auth/verify-answer
async fn verify_answer(
    State(state): State<AppState>,
    Json(body): Json<VerifyAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .recovery_service
        .verify_answer(&body.email, &body.answer)
        .await?;

    Ok(Json(ApiResponse::ok(
        serde_json::json!({ "reset_token": token }),
    )))
}

/// POST /api/v1/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .recovery_service
        .reset_password(&body.token, &body.new_password)
        .await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}
