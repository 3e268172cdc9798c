use crate::amount::Amount;
use crate::casino::BlackjackStep;
use crate::casino::Casino;
use crate::casino::Settlement;
use crate::db::HistoryEntry;
use crate::errors::RoundError;
use crate::games::baccarat::BaccaratSide;
use crate::games::blackjack::TableView;
use crate::games::dice::DiceBet;
use crate::games::roulette::RouletteBet;
use crate::games::Outcome;
use crate::games::Wager;
use anyhow::Result;
use axum::extract::FromRequestParts;
use axum::extract::Query;
use axum::extract::State;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Json;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Header carrying the account id verified by the upstream identity provider
pub const ACCOUNT_HEADER: &str = "x-account-id";

#[derive(Clone)]
pub struct AppState {
    pub casino: Arc<Casino>,
}

pub async fn start_server(casino: Casino, port: u16) -> Result<()> {
    let state = AppState {
        casino: Arc::new(casino),
    };
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("🚀 Server starting on http://{addr}");
    tracing::info!("🎰 Games endpoint: http://{addr}/api/games/{{game}}");
    tracing::info!("👤 Profile endpoint: http://{addr}/api/user/profile");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("🛑 Server stopped");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/games/slots", post(play_slots))
        .route("/api/games/roulette", post(play_roulette))
        .route("/api/games/poker", post(play_poker))
        .route("/api/games/dice", post(play_dice))
        .route("/api/games/baccarat", post(play_baccarat))
        .route("/api/games/blackjack", post(play_blackjack))
        .route("/api/user/profile", get(get_profile))
        .route("/api/user/history", get(get_history))
        .route("/version", get(get_version))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C signal");
}

/// Account the request acts for, taken from [`ACCOUNT_HEADER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for AccountId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        account_id_from_headers(&parts.headers)
    }
}

fn account_id_from_headers(headers: &HeaderMap) -> Result<AccountId, ApiError> {
    let value = headers
        .get(ACCOUNT_HEADER)
        .ok_or_else(|| ApiError::unauthorized("missing account header"))?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(AccountId)
        .ok_or_else(|| ApiError::unauthorized("malformed account header"))
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "unauthorized",
            message: message.to_string(),
        }
    }
}

impl From<RoundError> for ApiError {
    fn from(error: RoundError) -> Self {
        let status = match &error {
            RoundError::Validation(_)
            | RoundError::InsufficientFunds { .. }
            | RoundError::StateIntegrity(_) => StatusCode::BAD_REQUEST,
            RoundError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            RoundError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let message = match &error {
            // do not leak driver details
            RoundError::Persistence(_) => "storage unavailable, try again".to_string(),
            other => other.to_string(),
        };
        Self {
            status,
            kind: error.kind(),
            message,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: &self.message,
            kind: self.kind,
        });
        (self.status, body).into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StakeRequest {
    bet_amount: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouletteRequest {
    bet_amount: f64,
    bet_type: String,
    #[serde(default)]
    bet_value: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiceRequest {
    bet_amount: f64,
    bet_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaccaratRequest {
    bet_amount: f64,
    side: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlackjackRequest {
    action: String,
    bet_amount: Option<f64>,
    /// Round token returned by the previous step
    game_state: Option<String>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoundResponse {
    round_id: String,
    result: Outcome,
    win_amount: Amount,
    balance: Amount,
    game_over: bool,
}

impl From<Settlement> for RoundResponse {
    fn from(settlement: Settlement) -> Self {
        RoundResponse {
            round_id: settlement.round_id,
            win_amount: settlement.outcome.payout,
            result: settlement.outcome,
            balance: settlement.balance,
            game_over: true,
        }
    }
}

/// Poker, dice and baccarat answer with the round fields at the top level
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlatRoundResponse {
    round_id: String,
    #[serde(flatten)]
    result: Outcome,
    won: bool,
    win_amount: Amount,
    new_balance: Amount,
    game_over: bool,
}

impl From<Settlement> for FlatRoundResponse {
    fn from(settlement: Settlement) -> Self {
        FlatRoundResponse {
            round_id: settlement.round_id,
            won: settlement.outcome.is_win(),
            win_amount: settlement.outcome.payout,
            result: settlement.outcome,
            new_balance: settlement.balance,
            game_over: true,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnResponse {
    game_state: String,
    #[serde(flatten)]
    view: TableView,
    game_over: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum BlackjackResponse {
    Turn(TurnResponse),
    Settled(RoundResponse),
}

impl From<BlackjackStep> for BlackjackResponse {
    fn from(step: BlackjackStep) -> Self {
        match step {
            BlackjackStep::InProgress { token, view } => BlackjackResponse::Turn(TurnResponse {
                game_state: token,
                view,
                game_over: false,
            }),
            BlackjackStep::Finished(settlement) => BlackjackResponse::Settled(settlement.into()),
        }
    }
}

#[derive(Serialize)]
struct ProfileResponse {
    user: UserProfile,
}

#[derive(Serialize)]
struct UserProfile {
    id: i64,
    username: String,
    balance: Amount,
}

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionResponse {
    version: &'static str,
    git_hash: &'static str,
    build_timestamp: &'static str,
}

async fn play_slots(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<StakeRequest>,
) -> Result<Json<RoundResponse>, ApiError> {
    let settlement = state
        .casino
        .play(account_id, request.bet_amount, Wager::Slots)
        .await?;
    Ok(Json(settlement.into()))
}

async fn play_roulette(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<RouletteRequest>,
) -> Result<Json<RoundResponse>, ApiError> {
    let bet = RouletteBet::parse(&request.bet_type, &request.bet_value)?;
    let settlement = state
        .casino
        .play(account_id, request.bet_amount, Wager::Roulette(bet))
        .await?;
    Ok(Json(settlement.into()))
}

async fn play_poker(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<StakeRequest>,
) -> Result<Json<FlatRoundResponse>, ApiError> {
    let settlement = state
        .casino
        .play(account_id, request.bet_amount, Wager::Poker)
        .await?;
    Ok(Json(settlement.into()))
}

async fn play_dice(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<DiceRequest>,
) -> Result<Json<FlatRoundResponse>, ApiError> {
    let bet: DiceBet = request.bet_type.parse()?;
    let settlement = state
        .casino
        .play(account_id, request.bet_amount, Wager::Dice(bet))
        .await?;
    Ok(Json(settlement.into()))
}

async fn play_baccarat(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<BaccaratRequest>,
) -> Result<Json<FlatRoundResponse>, ApiError> {
    let side: BaccaratSide = request.side.parse()?;
    let settlement = state
        .casino
        .play(account_id, request.bet_amount, Wager::Baccarat(side))
        .await?;
    Ok(Json(settlement.into()))
}

async fn play_blackjack(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<BlackjackRequest>,
) -> Result<Json<BlackjackResponse>, ApiError> {
    let casino = &state.casino;
    let response = match request.action.as_str() {
        "start" => {
            let stake = request
                .bet_amount
                .ok_or_else(|| RoundError::validation("betAmount is required to start"))?;
            casino.blackjack_start(account_id, stake).await?.into()
        }
        "hit" => {
            let token = round_token(&request)?;
            casino.blackjack_hit(account_id, token).await?.into()
        }
        "stand" => {
            let token = round_token(&request)?;
            BlackjackResponse::Settled(casino.blackjack_stand(account_id, token).await?.into())
        }
        other => {
            return Err(RoundError::validation(format!("unknown blackjack action: {other}")).into());
        }
    };
    Ok(Json(response))
}

fn round_token(request: &BlackjackRequest) -> Result<&str, RoundError> {
    request
        .game_state
        .as_deref()
        .ok_or_else(|| RoundError::validation("gameState is required to continue a round"))
}

async fn get_profile(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<Json<ProfileResponse>, ApiError> {
    let account = state.casino.profile(account_id).await?;
    Ok(Json(ProfileResponse {
        user: UserProfile {
            id: account.id,
            balance: account.balance(),
            username: account.username,
        },
    }))
}

async fn get_history(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.casino.history(account_id, query.limit).await?;
    Ok(Json(HistoryResponse { history }))
}

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_account_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            account_id_from_headers(&headers).unwrap_err().status,
            StatusCode::UNAUTHORIZED
        );

        headers.insert(ACCOUNT_HEADER, HeaderValue::from_static("abc"));
        assert!(account_id_from_headers(&headers).is_err());

        headers.insert(ACCOUNT_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(account_id_from_headers(&headers).unwrap(), AccountId(42));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (RoundError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                RoundError::InsufficientFunds {
                    balance: Amount::ZERO,
                    stake: Amount::from_whole(1),
                },
                StatusCode::BAD_REQUEST,
            ),
            (RoundError::integrity("forged"), StatusCode::BAD_REQUEST),
            (RoundError::AccountNotFound(1), StatusCode::NOT_FOUND),
            (
                RoundError::Persistence(sqlx::Error::PoolTimedOut),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, status) in cases {
            let kind = error.kind();
            let api = ApiError::from(error);
            assert_eq!(api.status, status);
            assert_eq!(api.kind, kind);
        }
    }

    #[test]
    fn test_turn_response_shape() {
        let view = TableView {
            player_hand: vec![],
            player_value: 12,
            dealer_hand: vec![],
            dealer_value: 10,
        };
        let json = serde_json::to_value(BlackjackResponse::from(BlackjackStep::InProgress {
            token: "t".to_string(),
            view,
        }))
        .unwrap();
        assert_eq!(json["gameState"], "t");
        assert_eq!(json["playerValue"], 12);
        assert_eq!(json["dealerValue"], 10);
        assert_eq!(json["gameOver"], false);
    }

    #[test]
    fn test_flat_round_response_shape() {
        use crate::games::dice::Dice;

        let settlement = Settlement {
            round_id: "r1".to_string(),
            outcome: Dice::settle(Amount::from_whole(10), DiceBet::Seven, 3, 4),
            balance: Amount::from_whole(140),
        };
        let json = serde_json::to_value(FlatRoundResponse::from(settlement)).unwrap();
        assert_eq!(json["roundId"], "r1");
        assert_eq!(json["game"], "dice");
        assert_eq!(json["dice1"], 3);
        assert_eq!(json["dice2"], 4);
        assert_eq!(json["total"], 7);
        assert_eq!(json["won"], true);
        assert_eq!(json["winAmount"], 50.0);
        assert_eq!(json["newBalance"], 140.0);
        assert_eq!(json["gameOver"], true);
        assert!(json.get("result").is_none());
    }
}
