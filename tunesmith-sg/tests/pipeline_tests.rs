//! Integration tests for the generation pipeline
//!
//! Exercises the full lyrics → audio → art → video flow through the HTTP
//! surface: completion, failure recording, retry-from-failed-step resume
//! semantics, video-only regeneration and the bounded video poll timeout.

mod common;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

#[tokio::test]
async fn full_pipeline_populates_every_artifact() {
    let harness = spawn_app().await;

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();

    let song = wait_for_terminal(&harness.app, id).await;

    assert_eq!(song["status"], "complete");
    assert_eq!(song["statusMessage"], "Song ready");
    assert_eq!(song["title"], "Song about synthwave night drive");
    assert!(!song["lyrics"].as_str().unwrap().is_empty());
    assert_eq!(song["genre"], "synthwave");
    assert_eq!(song["tempo"], 104);
    assert_eq!(song["keySignature"], "A minor");
    assert!(!song["audioUrl"].as_str().unwrap().is_empty());
    assert!(!song["coverArtUrl"].as_str().unwrap().is_empty());
    assert!(!song["videoUrl"].as_str().unwrap().is_empty());
    assert!(!song["thumbnailUrl"].as_str().unwrap().is_empty());
    assert!(song.get("failedStep").is_none());

    assert_eq!(harness.net.lyrics_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.net.audio_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.net.art_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn custom_lyrics_skip_the_lyrics_step() {
    let harness = spawn_app().await;

    let (_, created) = generate_song(
        &harness.app,
        json!({"prompt": "a ballad", "customLyrics": "my own words"}),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let song = wait_for_terminal(&harness.app, id).await;

    assert_eq!(song["status"], "complete");
    assert_eq!(song["lyrics"], "my own words");
    // The step passed through without touching the text provider.
    assert_eq!(harness.net.lyrics_calls.load(Ordering::SeqCst), 0);
    assert!(!song["audioUrl"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn lyrics_failure_records_step_and_message() {
    let harness = spawn_app().await;
    harness.net.lyrics_fail.store(true, Ordering::SeqCst);

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();

    let song = wait_for_terminal(&harness.app, id).await;

    assert_eq!(song["status"], "error");
    assert_eq!(song["failedStep"], "writing lyrics");
    assert_eq!(song["statusMessage"], "rate limited");
    assert!(song.get("lyrics").is_none());
}

#[tokio::test]
async fn retry_resumes_and_clears_failure() {
    let harness = spawn_app().await;
    harness.net.lyrics_fail.store(true, Ordering::SeqCst);

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();
    wait_for_terminal(&harness.app, id).await;

    harness.net.lyrics_fail.store(false, Ordering::SeqCst);

    let (status, retried) = send(
        &harness.app,
        json_request("POST", "/api/retry", json!({"song": {"id": id}})),
    )
    .await;

    // The response reflects the resume point, not the old error.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retried["status"], "writing lyrics");
    assert!(retried.get("failedStep").is_none());

    let song = wait_for_terminal(&harness.app, id).await;
    assert_eq!(song["status"], "complete");
    assert_eq!(harness.net.lyrics_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retry_after_audio_failure_does_not_rerun_lyrics() {
    let harness = spawn_app().await;
    harness.net.audio_fail.store(true, Ordering::SeqCst);

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();

    let failed = wait_for_terminal(&harness.app, id).await;
    assert_eq!(failed["status"], "error");
    assert_eq!(failed["failedStep"], "composing audio");
    let lyrics_before = failed["lyrics"].as_str().unwrap().to_string();
    assert_eq!(harness.net.lyrics_calls.load(Ordering::SeqCst), 1);

    harness.net.audio_fail.store(false, Ordering::SeqCst);

    let (_, retried) = send(
        &harness.app,
        json_request("POST", "/api/retry", json!({"song": {"id": id}})),
    )
    .await;
    assert_eq!(retried["status"], "composing audio");

    let song = wait_for_terminal(&harness.app, id).await;
    assert_eq!(song["status"], "complete");
    // Resumed exactly at audio generation: lyrics untouched.
    assert_eq!(song["lyrics"], lyrics_before.as_str());
    assert_eq!(harness.net.lyrics_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.net.audio_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn video_failure_keeps_earlier_artifacts() {
    let harness = spawn_app().await;
    harness.net.video_submit_fail.store(true, Ordering::SeqCst);

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();

    let song = wait_for_terminal(&harness.app, id).await;

    assert_eq!(song["status"], "error");
    assert_eq!(song["failedStep"], "generating video");
    // Lyrics, audio and art all survive the video failure.
    assert!(!song["lyrics"].as_str().unwrap().is_empty());
    assert!(!song["audioUrl"].as_str().unwrap().is_empty());
    assert!(!song["coverArtUrl"].as_str().unwrap().is_empty());
    assert!(song.get("videoUrl").is_none());
}

#[tokio::test]
async fn retry_after_video_failure_skips_completed_steps() {
    let harness = spawn_app().await;
    harness.net.video_submit_fail.store(true, Ordering::SeqCst);

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();
    wait_for_terminal(&harness.app, id).await;

    harness.net.video_submit_fail.store(false, Ordering::SeqCst);

    let (_, retried) = send(
        &harness.app,
        json_request("POST", "/api/retry", json!({"song": {"id": id}})),
    )
    .await;
    assert_eq!(retried["status"], "generating video");

    let song = wait_for_terminal(&harness.app, id).await;
    assert_eq!(song["status"], "complete");
    assert!(!song["videoUrl"].as_str().unwrap().is_empty());
    // Earlier steps passed through on their existing artifacts.
    assert_eq!(harness.net.lyrics_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.net.audio_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.net.art_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn regenerate_video_replaces_only_video_artifacts() {
    let harness = spawn_app().await;

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();
    let first = wait_for_terminal(&harness.app, id).await;
    assert_eq!(first["status"], "complete");
    let first_video = first["videoUrl"].as_str().unwrap().to_string();

    let (status, accepted) = send(
        &harness.app,
        json_request(
            "POST",
            "/api/regenerate-video",
            json!({"song": {"id": id}, "videoStyle": "anime", "difficulty": "hard"}),
        ),
    )
    .await;

    // The response shows the cleared video and the new style immediately.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["videoStyle"], "anime");
    assert_eq!(accepted["difficulty"], "hard");
    assert!(accepted.get("videoUrl").is_none());
    assert!(accepted.get("thumbnailUrl").is_none());

    let song = wait_for_terminal(&harness.app, id).await;
    assert_eq!(song["status"], "complete");
    assert_ne!(song["videoUrl"].as_str().unwrap(), first_video);

    // Lyrics, audio and art untouched by the regeneration.
    assert_eq!(song["lyrics"], first["lyrics"]);
    assert_eq!(song["audioUrl"], first["audioUrl"]);
    assert_eq!(song["coverArtUrl"], first["coverArtUrl"]);
    assert_eq!(harness.net.lyrics_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.net.audio_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.net.art_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn video_polling_times_out_with_distinct_message() {
    let harness = spawn_app().await;
    harness.net.stall_video();

    let (_, created) =
        generate_song(&harness.app, json!({"prompt": "synthwave night drive"})).await;
    let id = created["id"].as_str().unwrap();

    let song = wait_for_terminal(&harness.app, id).await;

    assert_eq!(song["status"], "error");
    assert_eq!(song["failedStep"], "generating video");
    assert!(song["statusMessage"]
        .as_str()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test]
async fn advanced_options_flow_to_the_record() {
    let harness = spawn_app().await;

    let (_, created) = generate_song(
        &harness.app,
        json!({
            "prompt": "synthwave night drive",
            "videoStyle": "noir",
            "difficulty": "hard",
            "advancedOptions": {
                "excludeStyles": ["country"],
                "vocalGender": "female",
                "styleInfluence": 80,
                "weirdness": 15
            }
        }),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    assert_eq!(created["videoStyle"], "noir");
    assert_eq!(created["difficulty"], "hard");
    assert_eq!(created["advancedOptions"]["vocalGender"], "female");
    assert_eq!(created["advancedOptions"]["styleInfluence"], 80);

    let song = wait_for_terminal(&harness.app, id).await;
    assert_eq!(song["status"], "complete");
    assert_eq!(song["advancedOptions"]["excludeStyles"][0], "country");
}
