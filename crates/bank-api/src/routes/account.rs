//! Account command endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use bank_account::application::command_handlers::{self, AccountCommandResult};
use bank_account::domain::commands;
use bank_account::domain::money::Money;
use bank_core::error::DomainError;
use bank_core::event::DomainEvent;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /account/create`.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Name of the account holder.
    pub holder_name: String,
}

/// Request body for `POST /account/deposit` and `POST /account/withdraw`.
#[derive(Debug, Deserialize)]
pub struct MoneyRequest {
    /// The target account.
    pub account_id: Uuid,
    /// Amount to move. Absent counts as an invalid amount.
    pub amount: Option<Decimal>,
}

/// Response body for account commands.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The account the command ran against.
    pub account_id: Uuid,
    /// Account version after the command.
    pub version: i64,
    /// Identifiers of the events the command appended.
    pub event_ids: Vec<Uuid>,
}

impl From<AccountCommandResult> for CommandResponse {
    fn from(result: AccountCommandResult) -> Self {
        Self {
            account_id: result.account_id,
            version: result.version,
            event_ids: result.events.iter().map(|e| e.base().event_id).collect(),
        }
    }
}

/// Decodes a command body. An empty or `null` body is a missing command.
fn parse_command<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DomainError::CommandMissing.into());
    }
    serde_json::from_slice::<Option<T>>(body)
        .map_err(|e| DomainError::InvalidOperation(format!("malformed command body: {e}")))?
        .ok_or_else(|| DomainError::CommandMissing.into())
}

/// POST /account/create
#[instrument(skip(state, body))]
async fn create_account(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CommandResponse>, ApiError> {
    let request: CreateAccountRequest = parse_command(&body)?;
    let command = commands::CreateAccount {
        correlation_id: Uuid::new_v4(),
        holder_name: request.holder_name,
    };
    info!(correlation_id = %command.correlation_id, "handling create_account command");

    let result = command_handlers::handle_create_account(&command, &state.command_context()).await?;
    Ok(Json(result.into()))
}

/// POST /account/deposit
#[instrument(skip(state, body))]
async fn deposit_money(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CommandResponse>, ApiError> {
    let request: MoneyRequest = parse_command(&body)?;
    let command = commands::DepositMoney {
        correlation_id: Uuid::new_v4(),
        account_id: request.account_id,
        amount: Money::from_optional(request.amount)?,
    };
    info!(
        correlation_id = %command.correlation_id,
        account_id = %command.account_id,
        "handling deposit_money command"
    );

    let result = command_handlers::handle_deposit_money(&command, &state.command_context()).await?;
    Ok(Json(result.into()))
}

/// POST /account/withdraw
#[instrument(skip(state, body))]
async fn withdraw_money(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CommandResponse>, ApiError> {
    let request: MoneyRequest = parse_command(&body)?;
    let command = commands::WithdrawMoney {
        correlation_id: Uuid::new_v4(),
        account_id: request.account_id,
        amount: Money::from_optional(request.amount)?,
    };
    info!(
        correlation_id = %command.correlation_id,
        account_id = %command.account_id,
        "handling withdraw_money command"
    );

    let result =
        command_handlers::handle_withdraw_money(&command, &state.command_context()).await?;
    Ok(Json(result.into()))
}

/// Returns the account command router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_account))
        .route("/deposit", post(deposit_money))
        .route("/withdraw", post(withdraw_money))
}
