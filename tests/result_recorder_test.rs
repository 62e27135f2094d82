mod common;

use axum::http::StatusCode;
use common::{app_with_player, body_json, post_json};
use serde_json::json;
use triviarush::names;

fn result_body(correct: i64, total: i64, avg_ms: f64) -> serde_json::Value {
    json!({
        "category": "trivia",
        "correct_answers": correct,
        "total_questions": total,
        "average_response_time": avg_ms,
    })
}

fn analytics_entries(correct: usize) -> serde_json::Value {
    let entries: Vec<_> = (0..15)
        .map(|i| {
            json!({
                "question_id": i,
                "topic_id": i % 3,
                "is_correct": i < correct,
                "response_time_ms": 2000 + i * 100,
            })
        })
        .collect();
    json!(entries)
}

#[tokio::test]
async fn rejects_unauthenticated_submissions() {
    let (app, db, user_id, _token) = app_with_player().await;

    let resp = post_json(&app, names::RESULT_URL, None, result_body(9, 15, 4200.0)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = post_json(
        &app,
        names::RESULT_URL,
        Some("not-a-real-token"),
        result_body(9, 15, 4200.0),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(db.results_count(user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_submission_within_window_is_cached() {
    let (app, db, user_id, token) = app_with_player().await;

    let resp = post_json(
        &app,
        names::RESULT_URL,
        Some(&token),
        result_body(9, 15, 4200.0),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first = body_json(resp).await;
    assert_eq!(first["success"], json!(true));
    assert!(first.get("cached").is_none());

    let resp = post_json(
        &app,
        names::RESULT_URL,
        Some(&token),
        result_body(9, 15, 4200.0),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second = body_json(resp).await;
    assert_eq!(second["cached"], json!(true));
    assert_eq!(second["coins_earned"], first["coins_earned"]);

    assert_eq!(db.results_count(user_id).await.unwrap(), 1);
}

#[tokio::test]
async fn different_scores_are_not_deduplicated() {
    let (app, db, user_id, token) = app_with_player().await;

    post_json(&app, names::RESULT_URL, Some(&token), result_body(9, 15, 4200.0)).await;
    let resp = post_json(
        &app,
        names::RESULT_URL,
        Some(&token),
        result_body(10, 15, 4200.0),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp).await.get("cached").is_none());

    assert_eq!(db.results_count(user_id).await.unwrap(), 2);
}

#[tokio::test]
async fn boundary_violations_are_rejected_without_writes() {
    let (app, db, user_id, token) = app_with_player().await;

    let cases = [
        result_body(16, 15, 4200.0),
        result_body(-1, 15, 4200.0),
        result_body(9, 14, 4200.0),
        result_body(9, 15, -1.0),
        result_body(9, 15, 30_001.0),
        json!({
            "category": "geography",
            "correct_answers": 9,
            "total_questions": 15,
            "average_response_time": 4200.0,
        }),
    ];

    for body in cases {
        let resp = post_json(&app, names::RESULT_URL, Some(&token), body.clone()).await;
        assert_eq!(
            resp.status(),
            StatusCode::BAD_REQUEST,
            "expected rejection for {body}"
        );
        let err = body_json(resp).await;
        assert_eq!(err["error"], json!("InvalidInput"));
    }

    assert_eq!(db.results_count(user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn coins_follow_the_band_schedule() {
    let (app, _db, _user_id, token) = app_with_player().await;

    // 15 correct: 5 answers at 1 coin, 5 at 2, 5 at 3.
    let resp = post_json(
        &app,
        names::RESULT_URL,
        Some(&token),
        result_body(15, 15, 3000.0),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["coins_earned"], json!(30));
}

#[tokio::test]
async fn analytics_rows_and_topic_stats_are_written() {
    let (app, db, user_id, token) = app_with_player().await;

    let mut body = result_body(9, 15, 4200.0);
    body["question_analytics"] = analytics_entries(9);

    let resp = post_json(&app, names::RESULT_URL, Some(&token), body).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // One analytics row per question. The fresh database makes this the
    // first result row, so its id is 1.
    assert_eq!(db.analytics_count(1).await.unwrap(), 15);

    let stats_t0 = db.get_topic_stats(user_id, 0).await.unwrap().unwrap();
    assert_eq!(stats_t0.answered_count, 5);
    assert_eq!(stats_t0.correct_count, 3); // questions 0, 3, 6 of 0..9

    // A second, different round accumulates atomically on top.
    let mut body = result_body(15, 15, 2000.0);
    body["question_analytics"] = analytics_entries(15);
    post_json(&app, names::RESULT_URL, Some(&token), body).await;

    let stats_t0 = db.get_topic_stats(user_id, 0).await.unwrap().unwrap();
    assert_eq!(stats_t0.answered_count, 10);
    assert_eq!(stats_t0.correct_count, 8);
}

#[tokio::test]
async fn runaway_submissions_are_rate_limited() {
    let (app, db, user_id, token) = app_with_player().await;

    // Distinct scores so the duplicate window does not absorb them.
    for correct in 0..triviarush::names::RESULT_RATE_LIMIT {
        let resp = post_json(
            &app,
            names::RESULT_URL,
            Some(&token),
            result_body(correct, 15, 4200.0),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = post_json(
        &app,
        names::RESULT_URL,
        Some(&token),
        result_body(12, 15, 4200.0),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let err = body_json(resp).await;
    assert_eq!(err["error"], json!("RateLimited"));

    assert_eq!(
        db.results_count(user_id).await.unwrap(),
        triviarush::names::RESULT_RATE_LIMIT
    );
}

#[tokio::test]
async fn leaderboard_aggregates_are_updated() {
    let (app, db, user_id, token) = app_with_player().await;

    post_json(&app, names::RESULT_URL, Some(&token), result_body(15, 15, 2500.0)).await;
    post_json(&app, names::RESULT_URL, Some(&token), result_body(5, 15, 2500.0)).await;

    let day = triviarush::db::day_of(triviarush::db::now_unix());
    let daily = db.get_daily_leaderboard(user_id, day).await.unwrap().unwrap();
    assert_eq!(daily.games_played, 2);
    assert_eq!(daily.coins_earned, 30 + 5);

    let global = db.get_global_leaderboard(user_id).await.unwrap().unwrap();
    assert_eq!(global.total_games, 2);
    assert_eq!(global.total_coins, 35);
}
