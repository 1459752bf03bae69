// tests/flow_tests.rs
//
// End-to-end flows against a live Postgres.
// Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use yamdb::{
    config::Config, models::title::current_year, routes, state::AppState,
    utils::mail::LogMailer,
};

struct SeededTitle {
    id: i64,
    category: String,
    genre: String,
}

struct TestApp {
    address: String,
    pool: PgPool,
    client: Client,
}

/// Helper function to spawn the app on a random port for testing.
async fn spawn_app() -> TestApp {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        email_address: "noreply@yamdb.local".to_string(),
        mail_dir: None,
        admin_username: None,
        admin_email: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        mailer: Arc::new(LogMailer),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, axum::ServiceExt::<axum::extract::Request>::into_make_service(app))
            .await
            .unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: Client::new(),
    }
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn signup(&self, username: &str, email: &str) -> reqwest::Response {
        self.client
            .post(self.url("/v1/auth/signup/"))
            .json(&json!({"username": username, "email": email}))
            .send()
            .await
            .expect("signup request")
    }

    async fn confirmation_code(&self, username: &str) -> String {
        sqlx::query_scalar("SELECT confirmation_code FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .expect("user row")
    }

    /// Registers a user with the given role and returns an access token.
    async fn user_with_role(&self, role: &str) -> (String, String) {
        let username = unique(role);
        let response = self
            .signup(&username, &format!("{}@example.com", username))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        sqlx::query("UPDATE users SET role = $1 WHERE username = $2")
            .bind(role)
            .bind(&username)
            .execute(&self.pool)
            .await
            .unwrap();

        let code = self.confirmation_code(&username).await;
        let body: Value = self
            .client
            .post(self.url("/v1/auth/token/"))
            .json(&json!({"username": username, "confirmation_code": code}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let token = body["token"].as_str().expect("token").to_string();
        (username, token)
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn patch(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(self.url(path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Creates a category, a genre and a title as `admin_token`.
    async fn seed_title(&self, admin_token: &str) -> SeededTitle {
        let category = unique("cat");
        let genre = unique("genre");

        let response = self
            .post(admin_token, "/v1/categories/", json!({"name": "Films", "slug": category}))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = self
            .post(admin_token, "/v1/genres/", json!({"name": "Drama", "slug": genre}))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = self
            .post(
                admin_token,
                "/v1/titles/",
                json!({
                    "name": "Stalker",
                    "year": current_year(),
                    "category": category,
                    "genre": [genre],
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let title: Value = response.json().await.unwrap();
        assert!(title["rating"].is_null());
        assert_eq!(title["category"]["slug"], category);
        assert_eq!(title["genre"][0]["slug"], genre);

        SeededTitle {
            id: title["id"].as_i64().unwrap(),
            category,
            genre,
        }
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn token_exchange_flow() {
    let app = spawn_app().await;
    let username = unique("reader");
    let email = format!("{}@example.com", username);

    let response = app.signup(&username, &email).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"username": username, "email": email}));

    let code = app.confirmation_code(&username).await;
    assert_eq!(code.len(), 40);

    // Same pair again: accepted, code kept.
    assert_eq!(app.signup(&username, &email).await.status(), StatusCode::OK);
    assert_eq!(app.confirmation_code(&username).await, code);

    // Username taken by another email.
    let response = app.signup(&username, "other@example.com").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["username"].is_array());

    // Wrong code: generic client error.
    let response = app
        .client
        .post(app.url("/v1/auth/token/"))
        .json(&json!({"username": username, "confirmation_code": "0".repeat(40)}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid username or confirmation code");

    // Unknown user.
    let response = app
        .client
        .post(app.url("/v1/auth/token/"))
        .json(&json!({"username": unique("ghost"), "confirmation_code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Correct code.
    let response = app
        .client
        .post(app.url("/v1/auth/token/"))
        .json(&json!({"username": username, "confirmation_code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn catalog_is_admin_managed() {
    let app = spawn_app().await;
    let (_, user_token) = app.user_with_role("user").await;
    let (_, admin_token) = app.user_with_role("admin").await;

    let slug = unique("cat");
    let response = app
        .post(&user_token, "/v1/categories/", json!({"name": "Books", "slug": slug}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post(&admin_token, "/v1/categories/", json!({"name": "Books", "slug": slug}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post(&admin_token, "/v1/categories/", json!({"name": "Books", "slug": slug}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let listed = app.get_json("/v1/categories/?search=Books&limit=100").await;
    assert!(listed.as_array().unwrap().iter().any(|c| c["slug"] == slug));

    let response = app
        .client
        .delete(app.url(&format!("/v1/categories/{}/", slug)))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .delete(app.url(&format!("/v1/categories/{}/", slug)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .post(
            &admin_token,
            "/v1/titles/",
            json!({"name": "Future", "year": current_year() + 1, "category": slug, "genre": ["x"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn reviews_drive_the_rating() {
    let app = spawn_app().await;
    let (_, admin_token) = app.user_with_role("admin").await;
    let title_id = app.seed_title(&admin_token).await.id;
    let reviews_path = format!("/v1/titles/{}/reviews/", title_id);

    let (_, first) = app.user_with_role("user").await;
    let (_, second) = app.user_with_role("user").await;
    let (_, third) = app.user_with_role("user").await;

    let mut first_review_id = 0;
    for (token, score) in [(&first, 3), (&second, 7), (&third, 8)] {
        let response = app
            .post(token, &reviews_path, json!({"text": "Thoughts", "score": score}))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let review: Value = response.json().await.unwrap();
        if first_review_id == 0 {
            first_review_id = review["id"].as_i64().unwrap();
        }
    }

    let title = app.get_json(&format!("/v1/titles/{}/", title_id)).await;
    assert_eq!(title["rating"].as_f64(), Some(6.0));

    // One review per author and title.
    let response = app
        .post(&first, &reviews_path, json!({"text": "Again", "score": 5}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Score bounds.
    let (_, fourth) = app.user_with_role("user").await;
    for score in [0, 11] {
        let response = app
            .post(&fourth, &reviews_path, json!({"text": "Out of range", "score": score}))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    let response = app
        .post(&fourth, &reviews_path, json!({"text": "Top", "score": 10}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Author edits own review, another user cannot.
    let review_path = format!("{}{}/", reviews_path, first_review_id);
    let response = app.patch(&second, &review_path, json!({"score": 1})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.patch(&first, &review_path, json!({"score": 4})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let review: Value = response.json().await.unwrap();
    assert_eq!(review["score"], 4);

    // (4 + 7 + 8 + 10) / 4
    let title = app.get_json(&format!("/v1/titles/{}/", title_id)).await;
    assert_eq!(title["rating"].as_f64(), Some(7.25));

    // Comments: anyone authenticated may comment, moderators may delete.
    let comments_path = format!("{}comments/", review_path);
    let response = app
        .post(&second, &comments_path, json!({"text": "Disagree"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment: Value = response.json().await.unwrap();
    assert_eq!(comment["review"], first_review_id);

    let (_, moderator) = app.user_with_role("moderator").await;
    let response = app
        .client
        .delete(app.url(&format!("{}{}/", comments_path, comment["id"])))
        .bearer_auth(&moderator)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .delete(app.url(&review_path))
        .bearer_auth(&moderator)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn profile_self_service() {
    let app = spawn_app().await;
    let (username, token) = app.user_with_role("user").await;

    let me: Value = app
        .client
        .get(app.url("/v1/users/me/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], username);
    assert_eq!(me["role"], "user");

    let response = app
        .patch(&token, "/v1/users/me/", json!({"bio": "Film nerd", "role": "admin"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["bio"], "Film nerd");
    assert_eq!(me["role"], "user");

    let response = app
        .client
        .get(app.url("/v1/users/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

fn slugs(list: &Value, key: &str) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item[key].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn title_list_filters() {
    let app = spawn_app().await;
    let (_, admin_token) = app.user_with_role("admin").await;
    let seeded = app.seed_title(&admin_token).await;

    let marker = unique("Mirror");
    let response = app
        .post(
            &admin_token,
            "/v1/titles/",
            json!({
                "name": marker,
                "year": 1975,
                "description": "Memories",
                "category": seeded.category,
                "genre": [seeded.genre],
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mirror: Value = response.json().await.unwrap();
    let mirror_id = mirror["id"].as_i64().unwrap();

    let ids = |list: Value| -> Vec<i64> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_i64().unwrap())
            .collect()
    };

    // Newest first.
    let by_category = app
        .get_json(&format!("/v1/titles/?category={}", seeded.category))
        .await;
    assert_eq!(ids(by_category), vec![mirror_id, seeded.id]);

    let by_genre = app.get_json(&format!("/v1/titles/?genre={}", seeded.genre)).await;
    assert_eq!(ids(by_genre), vec![mirror_id, seeded.id]);

    let by_name = app
        .get_json(&format!("/v1/titles/?name={}", marker.to_lowercase()))
        .await;
    assert_eq!(ids(by_name), vec![mirror_id]);

    let by_year = app
        .get_json(&format!("/v1/titles/?category={}&year=1975", seeded.category))
        .await;
    assert_eq!(ids(by_year), vec![mirror_id]);

    let paged = app
        .get_json(&format!("/v1/titles/?category={}&limit=1&offset=1", seeded.category))
        .await;
    assert_eq!(ids(paged), vec![seeded.id]);

    let none = app
        .get_json(&format!("/v1/titles/?category={}&genre=missing-genre", seeded.category))
        .await;
    assert!(ids(none).is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn catalog_search_matches_wildcards_literally() {
    let app = spawn_app().await;
    let (_, admin_token) = app.user_with_role("admin").await;

    let slug = unique("noir");
    let name = format!("Noir {}", slug);
    let response = app
        .post(&admin_token, "/v1/genres/", json!({"name": name, "slug": slug}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let found = app.get_json(&format!("/v1/genres/?search={}", slug.to_uppercase())).await;
    assert_eq!(slugs(&found, "slug"), vec![slug.clone()]);

    // `_` and `%` are not wildcards.
    let underscored = slug.replace('_', "%5F").replacen("noir", "no_r", 1);
    let found = app.get_json(&format!("/v1/genres/?search={}", underscored)).await;
    assert!(found.as_array().unwrap().is_empty());

    let found = app.get_json(&format!("/v1/genres/?search=Noir%25{}", &slug[5..])).await;
    assert!(found.as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn category_in_use_cannot_be_deleted_genre_is_unlinked() {
    let app = spawn_app().await;
    let (_, admin_token) = app.user_with_role("admin").await;
    let seeded = app.seed_title(&admin_token).await;

    let response = app
        .delete(&admin_token, &format!("/v1/categories/{}/", seeded.category))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .delete(&admin_token, &format!("/v1/genres/{}/", seeded.genre))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let title = app.get_json(&format!("/v1/titles/{}/", seeded.id)).await;
    assert_eq!(title["genre"], json!([]));

    let response = app
        .delete(&admin_token, &format!("/v1/genres/{}/", seeded.genre))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.delete(&admin_token, &format!("/v1/titles/{}/", seeded.id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .delete(&admin_token, &format!("/v1/categories/{}/", seeded.category))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn title_patch_replaces_genres_and_clears_description() {
    let app = spawn_app().await;
    let (_, admin_token) = app.user_with_role("admin").await;
    let seeded = app.seed_title(&admin_token).await;
    let title_path = format!("/v1/titles/{}/", seeded.id);

    let alpha = unique("alpha");
    let beta = unique("beta");
    for (name, slug) in [("Alpha", &alpha), ("Beta", &beta)] {
        let response = app
            .post(&admin_token, "/v1/genres/", json!({"name": name, "slug": slug}))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .patch(
            &admin_token,
            &title_path,
            json!({"genre": [beta, alpha], "description": "Zone"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let title: Value = response.json().await.unwrap();
    assert_eq!(slugs(&title["genre"], "slug"), vec![alpha.clone(), beta.clone()]);
    assert_eq!(title["description"], "Zone");
    assert_eq!(title["name"], "Stalker");

    let response = app
        .patch(&admin_token, &title_path, json!({"description": null}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let title: Value = response.json().await.unwrap();
    assert!(title["description"].is_null());
    assert_eq!(slugs(&title["genre"], "slug"), vec![alpha, beta]);

    let response = app
        .patch(&admin_token, &title_path, json!({"genre": ["no-such-genre"]}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["genre"].is_array());

    let (_, user_token) = app.user_with_role("user").await;
    let response = app.patch(&user_token, &title_path, json!({"year": 9999})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn admin_manages_users() {
    let app = spawn_app().await;
    let (admin_name, admin_token) = app.user_with_role("admin").await;

    let username = unique("staffer");
    let email = format!("{}@example.com", username);
    let response = app
        .post(
            &admin_token,
            "/v1/users/",
            json!({"username": username, "email": email, "role": "moderator", "bio": "Hi"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["role"], "moderator");
    assert!(user.get("confirmation_code").is_none());

    let response = app
        .post(&admin_token, "/v1/users/", json!({"username": username, "email": "x@example.com"}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["username"].is_array());

    let user_path = format!("/v1/users/{}/", username);
    let response = app.patch(&admin_token, &user_path, json!({"role": "admin"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let user: Value = app
        .client
        .get(app.url(&user_path))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(user["role"], "admin");
    assert_eq!(user["bio"], "Hi");

    let listed: Value = app
        .client
        .get(app.url(&format!("/v1/users/?search={}", username)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(slugs(&listed, "username"), vec![username.clone()]);

    let response = app
        .delete(&admin_token, &format!("/v1/users/{}/", admin_name))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.delete(&admin_token, &user_path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .get(app.url(&user_path))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn only_the_author_edits_a_comment() {
    let app = spawn_app().await;
    let (_, admin_token) = app.user_with_role("admin").await;
    let title_id = app.seed_title(&admin_token).await.id;

    let (_, author) = app.user_with_role("user").await;
    let (_, stranger) = app.user_with_role("user").await;

    let response = app
        .post(
            &author,
            &format!("/v1/titles/{}/reviews/", title_id),
            json!({"text": "Slow", "score": 6}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let review: Value = response.json().await.unwrap();
    let comments_path = format!("/v1/titles/{}/reviews/{}/comments/", title_id, review["id"]);

    let response = app
        .post(&author, &comments_path, json!({"text": "Still thinking"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment: Value = response.json().await.unwrap();
    let comment_path = format!("{}{}/", comments_path, comment["id"]);

    let response = app.patch(&stranger, &comment_path, json!({"text": "Mine now"})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Denied before the body is checked.
    let response = app.patch(&stranger, &comment_path, json!({"text": ""})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.delete(&stranger, &comment_path).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.patch(&author, &comment_path, json!({"text": ""})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.patch(&author, &comment_path, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let unchanged: Value = response.json().await.unwrap();
    assert_eq!(unchanged["text"], "Still thinking");

    let response = app
        .patch(&author, &comment_path, json!({"text": "Changed my mind"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let edited: Value = response.json().await.unwrap();
    assert_eq!(edited["text"], "Changed my mind");

    let listed = app.get_json(&comments_path).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app.delete(&author, &comment_path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
