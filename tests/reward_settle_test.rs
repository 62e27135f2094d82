mod common;

use axum::http::StatusCode;
use common::{app_with_player, body_json, post_json};
use serde_json::json;
use triviarush::names;

fn claim_body(session_id: &str, event: &str, watched: usize, original_reward: i64) -> serde_json::Value {
    let watched_ids: Vec<String> = (0..watched).map(|i| format!("video-{i}")).collect();
    json!({
        "reward_session_id": session_id,
        "watched_video_ids": watched_ids,
        "event_type": event,
        "original_reward": original_reward,
    })
}

#[tokio::test]
async fn rejects_unauthenticated_claims() {
    let (app, _db, _user_id, _token) = app_with_player().await;

    let resp = post_json(
        &app,
        names::REWARD_SETTLE_URL,
        None,
        claim_body("01ARZ3NDEKTSV4RRFFQ69G5FAV", "end_game", 1, 40),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn end_game_double_credits_once_and_only_once() {
    let (app, db, user_id, token) = app_with_player().await;
    db.set_wallet(user_id, 3, 100).await.unwrap();

    let body = claim_body("01ARZ3NDEKTSV4RRFFQ69G5FAV", "end_game", 1, 40);

    let resp = post_json(&app, names::REWARD_SETTLE_URL, Some(&token), body.clone()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first = body_json(resp).await;
    assert_eq!(first["reward"]["coins_delta"], json!(40));
    assert_eq!(first["reward"]["lives_delta"], json!(0));
    assert!(first.get("cached").is_none());

    let wallet = db.get_wallet(user_id).await.unwrap();
    assert_eq!(wallet.coins, 140);

    // Replaying the same session id returns the recorded payout but credits
    // nothing further.
    let resp = post_json(&app, names::REWARD_SETTLE_URL, Some(&token), body).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second = body_json(resp).await;
    assert_eq!(second["cached"], json!(true));
    assert_eq!(second["reward"]["coins_delta"], json!(40));

    let wallet = db.get_wallet(user_id).await.unwrap();
    assert_eq!(wallet.coins, 140);
}

#[tokio::test]
async fn refill_tops_lives_up_to_the_cap() {
    let (app, db, user_id, token) = app_with_player().await;
    db.set_wallet(user_id, 1, 50).await.unwrap();

    let resp = post_json(
        &app,
        names::REWARD_SETTLE_URL,
        Some(&token),
        claim_body("01BX5ZZKBKACTAV9WEVGEMMVRZ", "refill", 2, 0),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["reward"]["lives_delta"], json!(4));
    assert_eq!(body["reward"]["coins_delta"], json!(0));

    let wallet = db.get_wallet(user_id).await.unwrap();
    assert_eq!(wallet.lives, 5);
    assert_eq!(wallet.coins, 50);
}

#[tokio::test]
async fn refill_requires_two_watched_ads() {
    let (app, db, _user_id, token) = app_with_player().await;

    let resp = post_json(
        &app,
        names::REWARD_SETTLE_URL,
        Some(&token),
        claim_body("01BX5ZZKBKACTAV9WEVGEMMVRZ", "refill", 1, 0),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Nothing recorded, so a later complete claim still works.
    assert!(db
        .find_reward_claim("01BX5ZZKBKACTAV9WEVGEMMVRZ")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn malformed_claims_are_rejected() {
    let (app, _db, _user_id, token) = app_with_player().await;

    let resp = post_json(
        &app,
        names::REWARD_SETTLE_URL,
        Some(&token),
        claim_body("", "end_game", 1, 40),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post_json(
        &app,
        names::REWARD_SETTLE_URL,
        Some(&token),
        claim_body("01ARZ3NDEKTSV4RRFFQ69G5FAV", "end_game", 1, -5),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn another_players_session_id_is_not_replayable() {
    let (app, db, _user_id, token) = app_with_player().await;

    let body = claim_body("01HGW2N9XPXGJ6W1NV8QZJZJZJ", "daily_gift", 1, 25);
    let resp = post_json(&app, names::REWARD_SETTLE_URL, Some(&token), body.clone()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let other = db.create_user("rival").await.unwrap();
    let other_token = db.create_user_session(other).await.unwrap();

    let resp = post_json(&app, names::REWARD_SETTLE_URL, Some(&other_token), body).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
