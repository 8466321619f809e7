use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::client::ChatApi;
use super::gate::RequestGate;
use super::models::{decode_listing, Account, Message, Room, RoomId, RoomMembership};
use crate::shared::AppError;

const API_VERSION: &str = "1.0";
const USER_DATA_HEADER: &str = "X-VSS-UserData";

/// Team foundation chat REST client
///
/// Every request takes the shared [`RequestGate`] for its full duration.
pub struct TfsChatApi {
    base_url: String,
    http: reqwest::Client,
    gate: RequestGate,
    account: Account,
}

/// Raw outcome of a gated request
struct Reply {
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TfsChatApi {
    /// Verifies the credentials and resolves the account identity
    #[instrument(skip(gate))]
    pub async fn login(base_url: &str, gate: RequestGate) -> Result<Self, AppError> {
        let http = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let url = format!("{}/_apis/projects", base_url);
        let reply = send(&http, &gate, Method::GET, &url, &[], None, StatusCode::OK).await?;

        let header = reply
            .headers
            .get(USER_DATA_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("Missing header {}", USER_DATA_HEADER)))?;
        let account = Account::from_user_data(header)?;

        info!(user_id = %account.user_id, login = %account.login_user, "Logged in");

        Ok(Self {
            base_url,
            http,
            gate,
            account,
        })
    }

    fn rooms_url(&self) -> String {
        format!("{}/_apis/chat/rooms", self.base_url)
    }

    fn room_url(&self, room_id: RoomId, collection: &str) -> String {
        format!("{}/_apis/chat/rooms/{}/{}", self.base_url, room_id, collection)
    }

    fn membership_url(&self, room_id: RoomId) -> String {
        format!(
            "{}/{}",
            self.room_url(room_id, "users"),
            self.account.user_id
        )
    }
}

#[async_trait]
impl ChatApi for TfsChatApi {
    fn account(&self) -> &Account {
        &self.account
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
        let url = self.rooms_url();
        let reply = send(&self.http, &self.gate, Method::GET, &url, &[], None, StatusCode::OK).await?;
        decode_listing(&reply.body)
    }

    #[instrument(skip(self))]
    async fn list_room_users(&self, room_id: RoomId) -> Result<Vec<RoomMembership>, AppError> {
        let url = self.room_url(room_id, "users");
        let reply = send(&self.http, &self.gate, Method::GET, &url, &[], None, StatusCode::OK).await?;
        decode_listing(&reply.body)
    }

    #[instrument(skip(self))]
    async fn list_room_messages(
        &self,
        room_id: RoomId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, AppError> {
        let url = self.room_url(room_id, "messages");
        let filter = format!(
            "PostedTime ge {}",
            since.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let reply = send(
            &self.http,
            &self.gate,
            Method::GET,
            &url,
            &[("$filter", filter.as_str())],
            None,
            StatusCode::OK,
        )
        .await?;
        decode_listing(&reply.body)
    }

    #[instrument(skip(self))]
    async fn join_room(&self, room_id: RoomId) -> Result<(), AppError> {
        let url = self.membership_url(room_id);
        let body = serde_json::to_value(&self.account)?;
        send(&self.http, &self.gate, Method::PUT, &url, &[], Some(body), StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn leave_room(&self, room_id: RoomId) -> Result<(), AppError> {
        let url = self.membership_url(room_id);
        send(&self.http, &self.gate, Method::DELETE, &url, &[], None, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn post_message(&self, room_id: RoomId, text: &str) -> Result<(), AppError> {
        let url = self.room_url(room_id, "messages");
        let body = json!({ "content": text });
        send(&self.http, &self.gate, Method::POST, &url, &[], Some(body), StatusCode::CREATED).await?;
        Ok(())
    }
}

/// Performs one request while holding the gate and books the outcome
#[allow(clippy::too_many_arguments)]
async fn send(
    http: &reqwest::Client,
    gate: &RequestGate,
    method: Method,
    url: &str,
    query: &[(&str, &str)],
    body: Option<serde_json::Value>,
    expected: StatusCode,
) -> Result<Reply, AppError> {
    let mut state = gate.enter().await;

    let credentials = state.credentials().clone();
    let mut request = http
        .request(method.clone(), url)
        .query(&[("api-version", API_VERSION)])
        .query(query)
        .basic_auth(&credentials.user, Some(&credentials.password));
    if let Some(body) = body {
        request = request.json(&body);
    }

    let result = execute(request, expected).await;
    state.record(result.is_ok());

    match &result {
        Ok(reply) => debug!(%method, url = %url, bytes = reply.body.len(), "Request completed"),
        Err(e) => warn!(%method, url = %url, error = %e, "Request failed"),
    }

    result
}

async fn execute(request: reqwest::RequestBuilder, expected: StatusCode) -> Result<Reply, AppError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AppError::Unauthorized(status.to_string()));
    }
    if status != expected {
        return Err(AppError::Request(format!(
            "Unexpected status {} (expected {})",
            status, expected
        )));
    }

    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(Reply { headers, body })
}
