use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::middleware::verify_session::SessionUser;
use crate::api::server::{AppState, JsonResult, RouteError};
use crate::db::prelude::{Account, DarkMode, Habit, HabitView, Reward, UserId};
use crate::game::prelude::Badge;
use crate::tracker::Tracker;
use crate::tracker::account::{CatalogEntry, ProfileEdit};
use crate::tracker::habits::{HabitEdit, LogOutcome};
use crate::tracker::rewards::{NewReward, Redemption, RewardEdit};
use crate::util::quotes::Quote;

#[derive(Debug, Deserialize)]
pub struct NewHabit {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct Reorder {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogParams {
    /// Caller's offset from UTC in minutes, e.g. `-300` for UTC-5
    pub tz_offset_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct DarkModeToggle {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PaymentConfirmation {
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub uid: String,
}

#[derive(Debug, Serialize)]
pub struct SessionToken {
    pub token: String,
}

fn tracker<'a>(state: &'a AppState, uid: &'a UserId) -> Tracker<'a> {
    Tracker::new(state.store.as_ref(), uid)
}

//
// account

#[instrument(skip(state))]
pub async fn account(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
) -> JsonResult<Account> {
    Ok(Json(tracker(&state, &uid).account().await?))
}

#[instrument(skip(state))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Json(edit): Json<ProfileEdit>,
) -> JsonResult<Account> {
    Ok(Json(tracker(&state, &uid).update_profile(edit).await?))
}

#[instrument(skip(state))]
pub async fn badges(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
) -> JsonResult<Vec<Badge>> {
    Ok(Json(tracker(&state, &uid).badges().await?))
}

#[instrument(skip(state))]
pub async fn badge_catalog(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
) -> JsonResult<Vec<CatalogEntry>> {
    Ok(Json(tracker(&state, &uid).badge_catalog().await?))
}

#[instrument(skip(state))]
pub async fn dark_mode(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
) -> JsonResult<DarkMode> {
    Ok(Json(tracker(&state, &uid).dark_mode().await?))
}

#[instrument(skip(state))]
pub async fn set_dark_mode(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Json(toggle): Json<DarkModeToggle>,
) -> JsonResult<DarkMode> {
    Ok(Json(
        tracker(&state, &uid).set_dark_mode(toggle.enabled).await?,
    ))
}

#[instrument(skip(state))]
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Json(confirmation): Json<PaymentConfirmation>,
) -> JsonResult<DarkMode> {
    let dark_mode = tracker(&state, &uid)
        .confirm_payment(&state.stripe, &confirmation.payment_intent_id)
        .await?;

    Ok(Json(dark_mode))
}

//
// habits

#[instrument(skip(state))]
pub async fn list_habits(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
) -> JsonResult<Vec<HabitView>> {
    Ok(Json(tracker(&state, &uid).list_habits(Utc::now()).await?))
}

#[instrument(skip(state))]
pub async fn create_habit(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Json(new): Json<NewHabit>,
) -> Result<(StatusCode, Json<Habit>), RouteError> {
    let habit = tracker(&state, &uid).create_habit(&new.title).await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

#[instrument(skip(state))]
pub async fn get_habit(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
) -> JsonResult<HabitView> {
    Ok(Json(tracker(&state, &uid).get_habit(&id, Utc::now()).await?))
}

#[instrument(skip(state))]
pub async fn edit_habit(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
    Json(edit): Json<HabitEdit>,
) -> JsonResult<HabitView> {
    let view = tracker(&state, &uid)
        .edit_habit(&id, edit, Utc::now())
        .await?;

    Ok(Json(view))
}

#[instrument(skip(state))]
pub async fn delete_habit(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
) -> Result<StatusCode, RouteError> {
    tracker(&state, &uid).delete_habit(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn reorder_habits(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Json(reorder): Json<Reorder>,
) -> JsonResult<Vec<HabitView>> {
    let habits = tracker(&state, &uid)
        .reorder_habits(&reorder.ids, Utc::now())
        .await?;

    Ok(Json(habits))
}

#[instrument(skip(state))]
pub async fn log_positive(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
    Query(params): Query<LogParams>,
) -> JsonResult<LogOutcome> {
    let outcome = tracker(&state, &uid)
        .log_positive(&id, params.tz_offset_minutes, Utc::now())
        .await?;

    Ok(Json(outcome))
}

#[instrument(skip(state))]
pub async fn log_negative(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
    Query(params): Query<LogParams>,
) -> JsonResult<LogOutcome> {
    let outcome = tracker(&state, &uid)
        .log_negative(&id, params.tz_offset_minutes, Utc::now())
        .await?;

    Ok(Json(outcome))
}

//
// rewards

#[instrument(skip(state))]
pub async fn list_rewards(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
) -> JsonResult<Vec<Reward>> {
    Ok(Json(tracker(&state, &uid).list_rewards().await?))
}

#[instrument(skip(state))]
pub async fn create_reward(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Json(new): Json<NewReward>,
) -> Result<(StatusCode, Json<Reward>), RouteError> {
    let reward = tracker(&state, &uid).create_reward(new).await?;
    Ok((StatusCode::CREATED, Json(reward)))
}

#[instrument(skip(state))]
pub async fn edit_reward(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
    Json(edit): Json<RewardEdit>,
) -> JsonResult<Reward> {
    Ok(Json(tracker(&state, &uid).edit_reward(&id, edit).await?))
}

#[instrument(skip(state))]
pub async fn delete_reward(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
) -> Result<StatusCode, RouteError> {
    tracker(&state, &uid).delete_reward(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn reorder_rewards(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Json(reorder): Json<Reorder>,
) -> JsonResult<Vec<Reward>> {
    Ok(Json(
        tracker(&state, &uid).reorder_rewards(&reorder.ids).await?,
    ))
}

#[instrument(skip(state))]
pub async fn redeem_reward(
    State(state): State<Arc<AppState>>,
    SessionUser(uid): SessionUser,
    Path(id): Path<String>,
) -> JsonResult<Redemption> {
    Ok(Json(tracker(&state, &uid).redeem_reward(&id).await?))
}

//
// misc

#[instrument(skip_all)]
pub async fn random_quote(
    State(state): State<Arc<AppState>>,
    SessionUser(_): SessionUser,
) -> JsonResult<Quote> {
    Ok(Json(state.quotes.random().await?))
}

/// Issues a session token for a user our identity provider has already signed in
#[instrument(skip(state))]
pub async fn issue_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> JsonResult<SessionToken> {
    let uid = req.uid.trim();
    if uid.is_empty() {
        return Err(RouteError::EmptyUserId);
    }

    let token = state.session_key.sign(&UserId::from(uid));
    tracing::info!(uid, "issued session");

    Ok(Json(SessionToken { token }))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::api::server::test::TestApp;
    use crate::util::quotes::test::mock_quotes;
    use crate::util::stripe::test::mock_stripe;

    use super::*;

    #[tokio::test]
    async fn test_habit_lifecycle() {
        let app = TestApp::new();
        let token = app.token("alice");

        let (status, habit) = app
            .send("POST", "/habits", Some(&token), Some(json!({ "title": "Run" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = habit["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .send("POST", &format!("/habits/{id}/positive"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, view) = app
            .send(
                "PATCH",
                &format!("/habits/{id}"),
                Some(&token),
                Some(json!({ "kind": "both", "reset_cadence": "weekly" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["seconds_until_reset"], 7 * 86_400);

        let (status, outcome) = app
            .send(
                "POST",
                &format!("/habits/{id}/positive?tz_offset_minutes=60"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["progress"]["xp"], 10);
        assert_eq!(outcome["gold"], 105);
        assert_eq!(outcome["habit"]["positive_count"], 1);

        let (status, outcome) = app
            .send(
                "POST",
                &format!("/habits/{id}/negative?tz_offset_minutes=60"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["progress"]["xp"], 5);
        assert_eq!(outcome["streak"], 1);

        let (status, _) = app
            .send(
                "POST",
                &format!("/habits/{id}/negative?tz_offset_minutes=-900"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send("DELETE", &format!("/habits/{id}"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, habits) = app.send("GET", "/habits", Some(&token), None).await;
        assert_eq!(habits, json!([]));
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let app = TestApp::new();

        app.send(
            "POST",
            "/habits",
            Some(&app.token("alice")),
            Some(json!({ "title": "Run" })),
        )
        .await;

        let (_, habits) = app
            .send("GET", "/habits", Some(&app.token("bob")), None)
            .await;
        assert_eq!(habits, json!([]));
    }

    #[tokio::test]
    async fn test_redeem_insufficient_gold_conflicts() {
        let app = TestApp::new();
        let token = app.token("alice");

        let (_, reward) = app
            .send(
                "POST",
                "/rewards",
                Some(&token),
                Some(json!({ "title": "Concert", "cost": 250 })),
            )
            .await;
        let id = reward["id"].as_str().unwrap();

        let (status, body) = app
            .send("POST", &format!("/rewards/{id}/redeem"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "not enough gold: cost 250, balance 100");

        let (_, account) = app.send("GET", "/me", Some(&token), None).await;
        assert_eq!(account["gold"], 100);
    }

    #[tokio::test]
    async fn test_rewards_reorder() {
        let app = TestApp::new();
        let token = app.token("alice");

        let mut ids = Vec::new();
        for title in ["Tea", "Cake"] {
            let (_, reward) = app
                .send("POST", "/rewards", Some(&token), Some(json!({ "title": title })))
                .await;
            ids.push(reward["id"].as_str().unwrap().to_string());
        }

        let (_, listed) = app.send("GET", "/rewards", Some(&token), None).await;
        assert_eq!(listed[0]["title"], "Cake");

        let (status, reordered) = app
            .send(
                "POST",
                "/rewards/reorder",
                Some(&token),
                Some(json!({ "ids": ids })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reordered[0]["title"], "Tea");

        let partial = vec![ids[0].clone()];
        let (status, _) = app
            .send(
                "POST",
                "/rewards/reorder",
                Some(&token),
                Some(json!({ "ids": partial })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_payment_confirmation_unlocks_dark_mode() {
        let stripe_url = mock_stripe().await;
        let app = TestApp::with_upstreams(Some(&stripe_url), None);
        let token = app.token("alice");

        app.send(
            "PATCH",
            "/me",
            Some(&token),
            Some(json!({ "email": "payer@example.com" })),
        )
        .await;

        let (status, _) = app
            .send(
                "POST",
                "/payments/confirm",
                Some(&token),
                Some(json!({ "payment_intent_id": "pi_pending" })),
            )
            .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

        let (status, dark_mode) = app
            .send(
                "POST",
                "/payments/confirm",
                Some(&token),
                Some(json!({ "payment_intent_id": "pi_paid" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dark_mode, json!({ "access": "granted", "enabled": true }));

        let (status, dark_mode) = app
            .send(
                "PUT",
                "/settings/dark-mode",
                Some(&token),
                Some(json!({ "enabled": false })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dark_mode["enabled"], false);

        let bob = app.token("bob");
        let (status, _) = app
            .send(
                "POST",
                "/payments/confirm",
                Some(&bob),
                Some(json!({ "payment_intent_id": "pi_fifty_cents" })),
            )
            .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

        let (status, _) = app
            .send(
                "POST",
                "/payments/confirm",
                Some(&bob),
                Some(json!({ "payment_intent_id": "pi_paid" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_badge_catalog_and_quotes() {
        let quotes_url = mock_quotes().await;
        let app = TestApp::with_upstreams(None, Some(&quotes_url));
        let token = app.token("alice");

        let (status, catalog) = app
            .send("GET", "/badges/catalog", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(catalog.as_array().unwrap().len(), 15);
        assert_eq!(catalog[0]["earned"], false);

        let (status, quote) = app
            .send("GET", "/quotes/random", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["author"], "Aristotle");
    }
}
