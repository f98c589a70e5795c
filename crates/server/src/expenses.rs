//! Expense API endpoints

use api_types::expense::{ExpenseNew, ExpenseUpdate, ExpenseView, ParticipantInput, ParticipantView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Expense, Money, NewExpense, Participant, User, UserId, split};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn participants(input: Vec<ParticipantInput>) -> Result<Vec<Participant>, ServerError> {
    input
        .into_iter()
        .map(|participant| -> Result<Participant, ServerError> {
            let share = participant.share.map(Money::try_from_f64).transpose()?;
            Ok(Participant {
                user_id: UserId::from(participant.user_id),
                share: share.into(),
            })
        })
        .collect()
}

fn expense_view(expense: Expense) -> Result<ExpenseView, ServerError> {
    let shares = split::resolve_shares(&expense)?;
    let participants = expense
        .participants
        .iter()
        .zip(shares)
        .map(|(participant, (_, amount))| ParticipantView {
            user_id: participant.user_id.to_string(),
            share: participant.share.explicit().map(Money::to_f64),
            amount: amount.to_f64(),
        })
        .collect();

    Ok(ExpenseView {
        id: expense.id,
        group_id: expense.group_id,
        description: expense.description,
        amount: expense.amount.to_f64(),
        payer_id: expense.payer_id.to_string(),
        participants,
        created_at: expense.created_at,
    })
}

fn expense_views(expenses: Vec<Expense>) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    expenses
        .into_iter()
        .map(expense_view)
        .collect::<Result<_, _>>()
        .map(Json)
}

/// Handle requests for recording a new expense
pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let new = NewExpense {
        group_id: payload.group_id,
        description: payload.description,
        amount: Money::try_from_f64(payload.amount)?,
        payer_id: payload.payer_id.map_or_else(|| user.id.clone(), UserId::from),
        participants: participants(payload.participants)?,
    };
    let expense = state.engine.new_expense(&user.id, new).await?;

    Ok((StatusCode::CREATED, Json(expense_view(expense)?)))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.expense(expense_id, &user.id).await?;
    Ok(Json(expense_view(expense)?))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseView>, ServerError> {
    if payload.description.is_none()
        && payload.amount.is_none()
        && payload.payer_id.is_none()
        && payload.participants.is_none()
    {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }

    let update = engine::ExpenseUpdate {
        description: payload.description,
        amount: payload.amount.map(Money::try_from_f64).transpose()?,
        payer_id: payload.payer_id.map(UserId::from),
        participants: payload.participants.map(participants).transpose()?,
    };
    let expense = state
        .engine
        .update_expense(expense_id, &user.id, update)
        .await?;
    Ok(Json(expense_view(expense)?))
}

pub async fn remove(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(expense_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Expenses of a group, oldest first
pub async fn list_for_group(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    let expenses = state.engine.group_expenses(group_id, &user.id).await?;
    expense_views(expenses)
}

/// Expenses a user pays for or takes part in, within the caller's groups
pub async fn list_for_user(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(target_id): Path<String>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    let expenses = state
        .engine
        .user_expenses(&UserId::from(target_id), &user.id)
        .await?;
    expense_views(expenses)
}
