// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, catalog, comments, reviews, titles, users},
    models::{category::Category, genre::Genre},
    permissions::Policy,
    state::AppState,
    utils::jwt::{auth_middleware, policy_middleware, require_auth_middleware},
};

/// Assembles the main application router.
///
/// * Mounts every resource under `/v1`.
/// * Resolves the caller from the bearer token for every request.
/// * Gates each resource group with its policy before any body is parsed.
/// * Applies global middleware (Trace, CORS).
/// * Trims trailing slashes, so `/v1/titles/` and `/v1/titles` are the same route.
pub fn create_router(state: AppState) -> NormalizePath<Router> {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/token", post(auth::obtain_token));

    let admin_user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(Policy::AdminOnly, policy_middleware));

    let me_routes = Router::new()
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route_layer(middleware::from_fn(require_auth_middleware));

    let catalog_routes = Router::new()
        .route(
            "/categories",
            get(catalog::list::<Category>).post(catalog::create::<Category>),
        )
        .route("/categories/{slug}", delete(catalog::delete::<Category>))
        .route(
            "/genres",
            get(catalog::list::<Genre>).post(catalog::create::<Genre>),
        )
        .route("/genres/{slug}", delete(catalog::delete::<Genre>))
        .route_layer(middleware::from_fn_with_state(Policy::AdminOrReadOnly, policy_middleware));

    let title_routes = Router::new()
        .route("/titles", get(titles::list_titles).post(titles::create_title))
        .route(
            "/titles/{title_id}",
            get(titles::get_title)
                .patch(titles::update_title)
                .delete(titles::delete_title),
        )
        .route_layer(middleware::from_fn_with_state(Policy::AdminOrReadOnly, policy_middleware));

    let review_routes = Router::new()
        .route(
            "/titles/{title_id}/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route_layer(middleware::from_fn_with_state(
            Policy::AdminModeratorOrReadOnly,
            policy_middleware,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(admin_user_routes)
        .merge(me_routes)
        .merge(catalog_routes)
        .merge(title_routes)
        .merge(review_routes);

    let app = Router::new()
        .nest("/v1", api_routes)
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    NormalizePathLayer::trim_trailing_slash().layer(app)
}
