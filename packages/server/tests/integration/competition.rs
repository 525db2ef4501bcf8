use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn creating_a_competition_requires_permission() {
    let app = TestApp::spawn().await;
    let member = app
        .create_authenticated_user("comp_member", "password123")
        .await;

    let res = app
        .post_with_token(
            routes::COMPETITIONS,
            &json!({
                "title": "Unauthorized mixoff",
                "description": "nope",
                "start_time": "2020-01-01T00:00:00Z",
                "end_time": "2099-01-01T00:00:00Z",
            }),
            &member,
        )
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.error_code(), "PERMISSION_DENIED");
}

#[tokio::test]
async fn create_get_and_update_competition() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("comp_org", "password123", "organizer")
        .await;

    let id = app.create_competition(&org, "Spring mixoff").await;

    let res = app.get_with_token(&routes::competition(id), &org).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["title"], "Spring mixoff");
    assert_eq!(res.body["status"], "upcoming");
    assert!(res.body["winner_submission_id"].is_null());

    let res = app
        .patch_with_token(
            &routes::competition(id),
            &json!({"title": "Spring mixoff (extended)"}),
            &org,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["title"], "Spring mixoff (extended)");
    // untouched fields survive a partial update
    assert_eq!(res.body["status"], "upcoming");
}

#[tokio::test]
async fn update_is_refused_for_non_organizers() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("upd_org", "password123", "organizer")
        .await;
    let other = app
        .create_authenticated_user("upd_other", "password123")
        .await;

    let id = app.create_competition(&org, "Locked mixoff").await;

    let res = app
        .patch_with_token(&routes::competition(id), &json!({"title": "Hijacked"}), &other)
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.error_code(), "PERMISSION_DENIED");
}

#[tokio::test]
async fn update_rejects_inverted_schedule() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("sched_org", "password123", "organizer")
        .await;
    let id = app.create_competition(&org, "Sched mixoff").await;

    // end before the stored start
    let res = app
        .patch_with_token(
            &routes::competition(id),
            &json!({"end_time": "2019-01-01T00:00:00Z"}),
            &org,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn list_supports_search_and_status_filter() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("list_org", "password123", "organizer")
        .await;

    let open_id = app.create_competition(&org, "Summer jam").await;
    app.create_competition(&org, "Winter jam").await;
    app.create_competition(&org, "Autumn session").await;
    app.advance_to(open_id, &org, "open_for_submissions").await;

    let res = app
        .get_with_token(&format!("{}?search=jam", routes::COMPETITIONS), &org)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(res.body["pagination"]["total"], 2);

    let res = app
        .get_with_token(
            &format!("{}?status=open_for_submissions", routes::COMPETITIONS),
            &org,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    let data = res.body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], open_id);

    let res = app
        .get_with_token(&format!("{}?status=bogus", routes::COMPETITIONS), &org)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn advance_rejects_phase_skipping_and_terminal_states() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("adv_org", "password123", "organizer")
        .await;
    let id = app.create_competition(&org, "Advance mixoff").await;

    // asserting a status that is not the next hop fails without side effects
    let res = app
        .post_with_token(
            &routes::advance(id),
            &json!({"to_status": "voting_round1_open"}),
            &org,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "INVALID_TRANSITION");

    let res = app.get_with_token(&routes::competition(id), &org).await;
    assert_eq!(res.body["status"], "upcoming");

    // the correct assertion works
    let res = app
        .post_with_token(
            &routes::advance(id),
            &json!({"to_status": "open_for_submissions"}),
            &org,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["previous_status"], "upcoming");
    assert_eq!(res.body["new_status"], "open_for_submissions");
}

#[tokio::test]
async fn advance_without_submissions_fails_group_assignment() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("empty_org", "password123", "organizer")
        .await;
    let id = app.create_competition(&org, "Empty mixoff").await;
    app.advance_to(id, &org, "open_for_submissions").await;

    let res = app
        .post_with_token(&routes::advance(id), &json!({}), &org)
        .await;
    assert_eq!(res.status, 400, "{}", res.text);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn advance_requires_manage_or_organizer() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("perm_org", "password123", "organizer")
        .await;
    let member = app
        .create_authenticated_user("perm_member", "password123")
        .await;
    let id = app.create_competition(&org, "Perm mixoff").await;

    let res = app
        .post_with_token(&routes::advance(id), &json!({}), &member)
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.error_code(), "PERMISSION_DENIED");
}

#[tokio::test]
async fn force_status_is_admin_only_and_audited_as_an_override() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("force_org", "password123", "organizer")
        .await;
    let admin = app
        .create_user_with_role("force_admin", "password123", "admin")
        .await;
    let id = app.create_competition(&org, "Force mixoff").await;

    // organizers cannot force
    let res = app
        .post_with_token(
            &routes::force_status(id),
            &json!({"status": "archived"}),
            &org,
        )
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .post_with_token(
            &routes::force_status(id),
            &json!({"status": "voting_round2_tallying"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["previous_status"], "upcoming");
    assert_eq!(res.body["new_status"], "voting_round2_tallying");

    let res = app
        .post_with_token(
            &routes::force_status(id),
            &json!({"status": "not_a_status"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn archived_competitions_cannot_advance() {
    let app = TestApp::spawn().await;
    let admin = app
        .create_user_with_role("arch_admin", "password123", "admin")
        .await;
    let id = app.create_competition(&admin, "Archive mixoff").await;

    let res = app
        .post_with_token(
            &routes::force_status(id),
            &json!({"status": "archived"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app
        .post_with_token(&routes::advance(id), &json!({}), &admin)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "INVALID_STATE");
}

#[tokio::test]
async fn delete_requires_permission_and_is_refused_after_voting_starts() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("del_org", "password123", "organizer")
        .await;
    let admin = app
        .create_user_with_role("del_admin", "password123", "admin")
        .await;

    let id = app.create_competition(&org, "Delete mixoff").await;

    // organizers lack competition:delete
    let res = app.delete_with_token(&routes::competition(id), &org).await;
    assert_eq!(res.status, 403);

    // deletable while upcoming
    let res = app.delete_with_token(&routes::competition(id), &admin).await;
    assert_eq!(res.status, 204, "{}", res.text);
    let res = app.get_with_token(&routes::competition(id), &admin).await;
    assert_eq!(res.status, 404);

    // once voting has started deletion is a conflict
    let id = app.create_competition(&org, "Sticky mixoff").await;
    let res = app
        .post_with_token(
            &routes::force_status(id),
            &json!({"status": "voting_round1_open"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app.delete_with_token(&routes::competition(id), &admin).await;
    assert_eq!(res.status, 409);
    assert_eq!(res.error_code(), "CONFLICT");
}

#[tokio::test]
async fn submissions_are_only_accepted_while_open() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("sub_org", "password123", "organizer")
        .await;
    let entrant = app
        .create_authenticated_user("sub_entrant", "password123")
        .await;
    let id = app.create_competition(&org, "Sub mixoff").await;

    // upcoming: not yet open
    let res = app
        .post_with_token(
            &routes::submissions(id),
            &json!({"title": "Too early", "audio_ref": uuid::Uuid::new_v4()}),
            &entrant,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "INVALID_STATE");

    app.advance_to(id, &org, "open_for_submissions").await;
    app.create_submission(id, &entrant, "On time").await;

    // second entry by the same user is a conflict
    let res = app
        .post_with_token(
            &routes::submissions(id),
            &json!({"title": "Second try", "audio_ref": uuid::Uuid::new_v4()}),
            &entrant,
        )
        .await;
    assert_eq!(res.status, 409);
    assert_eq!(res.error_code(), "CONFLICT");

    let res = app.get_with_token(&routes::submissions(id), &entrant).await;
    assert_eq!(res.status, 200, "{}", res.text);
    let data = res.body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["title"], "On time");
    assert_eq!(data[0]["username"], "sub_entrant");
}
