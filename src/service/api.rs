//! HTTP surface
use crate::bidding::{deserialize_listing_id, BidCandidate, Credentials, ListingId, RawAmount, UserId};
use crate::persistence::Persistence;
use crate::service::{AdmissionError, BidAdmission, SharedSessionStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequestParts, State},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{future::Future, net::SocketAddr, sync::Arc};
use tracing::{debug, info};

pub const ACCEPTED_MESSAGE: &str = "Your bid was successfully sent";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub struct ApiState<P: Persistence> {
    persistence: P,
    sessions: SharedSessionStore<P>,
    admission: BidAdmission<P>,
}

impl<P: Persistence> ApiState<P> {
    pub fn new(persistence: P, sessions: SharedSessionStore<P>, admission: BidAdmission<P>) -> Self {
        Self {
            persistence,
            sessions,
            admission,
        }
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<Option<UserId>> {
        let mut connection = self.persistence.get_connection()?;
        self.sessions.authenticate(&mut connection, credentials)
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct BiddingRequest {
    #[serde(default)]
    pub bidding: BiddingParams,
}

#[derive(Deserialize, Debug, Default)]
pub struct BiddingParams {
    #[serde(default)]
    pub bid: RawAmount,
    #[serde(default, deserialize_with = "deserialize_listing_id")]
    pub listing_id: Option<ListingId>,
}

impl BiddingRequest {
    /// Decode a JSON or form-encoded (`bidding[bid]=...`) body
    ///
    /// An empty body decodes as a request with every field missing.
    pub fn decode(headers: &HeaderMap, body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        if is_form(headers) {
            // non-strict, so percent-encoded brackets are accepted too
            Ok(serde_qs::Config::new(5, false).deserialize_bytes(body)?)
        } else {
            Ok(serde_json::from_slice(body)?)
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

impl From<BiddingParams> for BidCandidate {
    fn from(params: BiddingParams) -> Self {
        BidCandidate {
            amount: params.bid,
            listing_id: params.listing_id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResponseBody {
    Message { message: String },
    Errors { errors: Vec<String> },
}

impl ResponseBody {
    pub fn message(message: impl Into<String>) -> Self {
        ResponseBody::Message {
            message: message.into(),
        }
    }
}

impl AdmissionError {
    pub fn to_status_and_body(&self) -> (StatusCode, ResponseBody) {
        match self {
            AdmissionError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ResponseBody::Errors {
                    errors: vec![self.to_string()],
                },
            ),
            AdmissionError::Invalid(_) | AdmissionError::AlreadyRented => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ResponseBody::message(self.to_string()),
            ),
            // Kept at 401 for compatibility with existing clients, even
            // though this is an authorization failure
            AdmissionError::SelfBid => (
                StatusCode::UNAUTHORIZED,
                ResponseBody::message(self.to_string()),
            ),
            AdmissionError::ListingNotFound => (
                StatusCode::NOT_FOUND,
                ResponseBody::message(self.to_string()),
            ),
            AdmissionError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ResponseBody::message(INTERNAL_ERROR_MESSAGE),
            ),
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_status_and_body();
        (status, Json(body)).into_response()
    }
}

pub enum RestError {
    /// The request body could not be decoded
    BadRequest(String),
    /// The bid was turned down, or could not be processed
    Admission(AdmissionError),
}

impl From<AdmissionError> for RestError {
    fn from(e: AdmissionError) -> Self {
        RestError::Admission(e)
    }
}

impl RestError {
    pub fn to_status_and_body(&self) -> (StatusCode, ResponseBody) {
        match self {
            RestError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ResponseBody::message(format!("Malformed request body: {msg}")),
            ),
            RestError::Admission(e) => e.to_status_and_body(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_status_and_body();
        (status, Json(body)).into_response()
    }
}

/// The caller of a request, if they presented valid session credentials
///
/// Never rejects a request for being anonymous: whether that matters is
/// up to the handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bidder(pub Option<UserId>);

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(ToOwned::to_owned)
        };
        Some(Self {
            uid: header("uid")?,
            client: header("client")?,
            access_token: header("access-token")?,
        })
    }
}

#[async_trait]
impl<P: Persistence> FromRequestParts<Arc<ApiState<P>>> for Bidder {
    type Rejection = AdmissionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState<P>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(credentials) = Credentials::from_headers(&parts.headers) else {
            debug!("no session credentials");
            return Ok(Bidder(None));
        };

        let state = state.clone();
        let user = tokio::task::spawn_blocking(move || state.authenticate(&credentials))
            .await
            .context("session lookup task failed")??;
        if user.is_none() {
            debug!("session credentials not recognized");
        }
        Ok(Bidder(user))
    }
}

pub async fn post_bidding<P: Persistence>(
    State(state): State<Arc<ApiState<P>>>,
    Bidder(bidder): Bidder,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ResponseBody>, RestError> {
    // An anonymous caller is told to sign in, whatever it sent
    let request = match (BiddingRequest::decode(&headers, &body), bidder) {
        (Ok(request), _) => request,
        (Err(_), None) => return Err(AdmissionError::Unauthenticated.into()),
        (Err(e), Some(_)) => {
            debug!(err = %e, "undecodable bidding request");
            return Err(RestError::BadRequest(e.to_string()));
        }
    };

    let candidate = BidCandidate::from(request.bidding);
    tokio::task::spawn_blocking(move || state.admission.admit(candidate, bidder))
        .await
        .context("admission task failed")
        .map_err(AdmissionError::from)??;

    Ok(Json(ResponseBody::message(ACCEPTED_MESSAGE)))
}

async fn root() -> String {
    format!("Bidding service {}", clap::crate_version!())
}

pub async fn live() -> Response {
    (StatusCode::OK, "OK").into_response()
}

pub fn router<P: Persistence>(state: Arc<ApiState<P>>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
        .route("/api/v1/biddings", post(post_bidding::<P>))
        .with_state(state)
}

/// Serve the API until `shutdown` completes
pub async fn run_http_server<P: Persistence>(
    state: Arc<ApiState<P>>,
    listen_addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let server = axum::Server::try_bind(&listen_addr)
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(%listen_addr, "listening");

    server
        .serve(router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("http server stopped");
    Ok(())
}
