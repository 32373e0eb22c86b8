//! Reservation endpoints.

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use hotdesk_core::types::{SpaceId, UserId};
use hotdesk_reconcile::ReservationRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /api/reservations` body.
#[derive(Debug, Deserialize)]
pub struct CreateReservation {
    /// Space to book
    pub space_id: Uuid,
    /// Requesting user
    pub user_id: Uuid,
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

/// A created reservation: where to send the customer.
#[derive(Debug, Serialize)]
pub struct ReservationCreated {
    /// The pending booking
    pub booking_id: Uuid,
    /// Hosted checkout page
    pub redirect_url: String,
}

/// `POST /api/reservations`
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateReservation>,
) -> WebResult<(StatusCode, Json<ReservationCreated>)> {
    let request = ReservationRequest {
        space_id: SpaceId::from_uuid(body.space_id),
        user_id: UserId::from_uuid(body.user_id),
        start: body.start,
        end: body.end,
    };
    let redirect = state.reservations.reserve(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReservationCreated {
            booking_id: *redirect.booking_id.as_uuid(),
            redirect_url: redirect.redirect_url,
        }),
    ))
}

/// One slot in a batch request.
#[derive(Debug, Deserialize)]
pub struct BatchSlot {
    /// Space to book
    pub space_id: Uuid,
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

/// `POST /api/reservations/batch` body.
#[derive(Debug, Deserialize)]
pub struct BatchReservation {
    /// Requesting user (one user per batch)
    pub user_id: Uuid,
    /// Slots to book
    pub slots: Vec<BatchSlot>,
}

/// A rejected slot in the partial-success report.
#[derive(Debug, Serialize)]
pub struct RejectedSlot {
    /// Position in the submitted slot list
    pub index: usize,
    /// Why the slot was rejected
    pub reason: String,
}

/// Partial-success report for a batch.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    /// Slots that got a pending booking and a checkout session
    pub created: Vec<ReservationCreated>,
    /// Slots that were rejected, with reasons
    pub rejected: Vec<RejectedSlot>,
}

/// `POST /api/reservations/batch`
///
/// Always returns 200 with a per-slot report; a failing slot never aborts
/// the rest.
pub async fn create_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchReservation>,
) -> WebResult<Json<BatchOutcome>> {
    let user_id = UserId::from_uuid(body.user_id);
    let requests: Vec<ReservationRequest> = body
        .slots
        .iter()
        .map(|slot| ReservationRequest {
            space_id: SpaceId::from_uuid(slot.space_id),
            user_id,
            start: slot.start,
            end: slot.end,
        })
        .collect();

    let outcomes = state.reservations.reserve_batch(&requests).await;

    let mut report = BatchOutcome {
        created: Vec::new(),
        rejected: Vec::new(),
    };
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(redirect) => report.created.push(ReservationCreated {
                booking_id: *redirect.booking_id.as_uuid(),
                redirect_url: redirect.redirect_url,
            }),
            Err(e) => {
                let app_err = AppError::from(e);
                report.rejected.push(RejectedSlot {
                    index,
                    reason: app_err.to_string(),
                });
            }
        }
    }
    Ok(Json(report))
}
