//! Settlement endpoint.

use std::collections::BTreeMap;

use api_types::settlement::{SettlementView, TransactionView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::{GroupSettlement, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn settlement_view(result: &GroupSettlement) -> SettlementView {
    let balances: BTreeMap<String, f64> = result
        .settlement
        .balances
        .iter()
        .map(|(user_id, balance)| (user_id.to_string(), balance.to_f64()))
        .collect();
    let transactions = result
        .settlement
        .transactions
        .iter()
        .map(|tx| TransactionView {
            payer_id: tx.payer.to_string(),
            receiver_id: tx.receiver.to_string(),
            amount: tx.amount.to_f64(),
            payer_name: result.username(&tx.payer).to_string(),
            receiver_name: result.username(&tx.receiver).to_string(),
        })
        .collect();

    SettlementView {
        balances,
        transactions,
    }
}

/// Return net balances and the suggested transactions of a group
pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<SettlementView>, ServerError> {
    let result = state.engine.group_settlement(group_id, &user.id).await?;
    Ok(Json(settlement_view(&result)))
}
