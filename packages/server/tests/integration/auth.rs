use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn register_login_me_flow() {
    let app = TestApp::spawn().await;

    let body = json!({
        "username": "mix_master_dee",
        "password": "password123",
    });

    let res = app.post_without_token(routes::REGISTER, &body).await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["username"], "mix_master_dee");

    let res = app.post_without_token(routes::LOGIN, &body).await;
    assert_eq!(res.status, 200, "{}", res.text);
    let token = res.body["token"].as_str().unwrap().to_string();
    assert_eq!(res.body["role"], "member");

    let res = app.get_with_token(routes::ME, &token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["username"], "mix_master_dee");
    assert_eq!(res.body["role"], "member");
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let app = TestApp::spawn().await;

    let body = json!({"username": "taken", "password": "password123"});
    let res = app.post_without_token(routes::REGISTER, &body).await;
    assert_eq!(res.status, 201, "{}", res.text);

    let res = app.post_without_token(routes::REGISTER, &body).await;
    assert_eq!(res.status, 409);
    assert_eq!(res.error_code(), "USERNAME_TAKEN");
}

#[tokio::test]
async fn register_rejects_bad_usernames_and_passwords() {
    let app = TestApp::spawn().await;

    for (username, password) in [
        ("", "password123"),
        ("has spaces", "password123"),
        ("emoji🎧", "password123"),
        ("fine_name", "short"),
        ("fine_name", &"x".repeat(129)),
    ] {
        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(res.status, 400, "accepted {username:?}/{password:?}");
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::spawn().await;
    app.create_authenticated_user("login_user", "password123")
        .await;

    let res = app
        .post_without_token(
            routes::LOGIN,
            &json!({"username": "login_user", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.error_code(), "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_with_unknown_user_fails_identically() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(
            routes::LOGIN,
            &json!({"username": "no_such_user", "password": "password123"}),
        )
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.error_code(), "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::ME).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.error_code(), "TOKEN_MISSING");

    let res = app.get_with_token(routes::ME, "not-a-jwt").await;
    assert_eq!(res.status, 401);
    assert_eq!(res.error_code(), "TOKEN_INVALID");
}

#[tokio::test]
async fn organizer_role_carries_competition_permissions() {
    let app = TestApp::spawn().await;
    let token = app
        .create_user_with_role("org_user", "password123", "organizer")
        .await;

    let res = app.get_with_token(routes::ME, &token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["role"], "organizer");
    let perms: Vec<&str> = res.body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap())
        .collect();
    assert!(perms.contains(&"competition:create"));
    assert!(perms.contains(&"competition:manage"));
    assert!(!perms.contains(&"competition:force_status"));
}
