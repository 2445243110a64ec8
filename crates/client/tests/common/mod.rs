//! In-process stub backend for exercising the real reqwest client.

use axum::extract::{Multipart, Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use prodgen_client::ApiClient;

pub const MISSING_PRODUCT_ID: i64 = 404;
pub const GARBLED_PRODUCT_ID: i64 = 500;

/// Serve the stub backend on an ephemeral port and return a client for it.
pub async fn spawn_backend() -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    ApiClient::new(format!("http://{addr}/api/products/"))
}

fn router() -> Router {
    Router::new()
        .route("/api/products/products/", get(list_products).post(create_product))
        .route("/api/products/products/{id}/", get(get_product))
        .route(
            "/api/products/products/{id}/generate_images/",
            post(generate_images),
        )
        .route("/api/products/products/{id}/job_status/", get(job_status))
        .route("/api/products/templates/", get(list_templates))
        .route("/api/products/templates/by_kind/", get(templates_by_kind))
        .route("/api/products/logos/", get(list_logos))
        .route("/api/products/logos/default/", get(default_logo))
}

pub fn product_json(id: i64) -> Value {
    json!({
        "id": id,
        "name": "Ceramic Mug",
        "sku": "MUG-1",
        "description": "White mug",
        "images": [
            {"id": 1, "kind": "original", "url": "http://cdn/1.png", "created_at": "2024-05-01T10:00:00Z"},
            {"id": 2, "kind": "social_square", "url": "http://cdn/2.png", "created_at": "2024-05-01T10:05:00Z"}
        ],
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:05:00Z"
    })
}

async fn list_products() -> Json<Value> {
    Json(json!([product_json(1), product_json(2)]))
}

async fn get_product(Path(id): Path<i64>) -> axum::response::Response {
    match id {
        MISSING_PRODUCT_ID => {
            (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
        }
        GARBLED_PRODUCT_ID => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => Json(product_json(id)).into_response(),
    }
}

async fn create_product(mut multipart: Multipart) -> axum::response::Response {
    let mut name = String::new();
    let mut sku = String::new();
    let mut image_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name().unwrap_or_default().to_string().as_str() {
            "name" => name = field.text().await.unwrap_or_default(),
            "sku" => sku = field.text().await.unwrap_or_default(),
            "original_image" => image_name = field.file_name().map(str::to_string),
            _ => {}
        }
    }
    let Some(image_name) = image_name else {
        return (StatusCode::BAD_REQUEST, Json(json!({"original_image": ["required"]})))
            .into_response();
    };
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 99,
            "name": name,
            "sku": sku,
            "images": [
                {"id": 5, "kind": "original", "url": format!("http://cdn/{image_name}"), "created_at": "2024-05-01T10:00:00Z"}
            ]
        })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct GenerateBody {
    template_ids: Vec<i64>,
}

async fn generate_images(Path(id): Path<i64>, Json(body): Json<GenerateBody>) -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "job_id": id * 100 + body.template_ids.len() as i64,
            "status": "pending",
            "message": "Image generation started"
        })),
    )
}

#[derive(Deserialize)]
struct JobQuery {
    job_id: String,
}

async fn job_status(Path(_id): Path<i64>, Query(q): Query<JobQuery>) -> impl IntoResponse {
    Json(json!({
        "id": q.job_id.parse::<i64>().unwrap_or_default(),
        "product": 1,
        "product_name": "Ceramic Mug",
        "status": "completed",
        "templates_used": [1, 2, 3],
        "result": {"generated_count": 3},
        "error_message": null
    }))
}

fn templates() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Square", "kind": "social", "is_active": true}),
        json!({"id": 2, "name": "Hero", "kind": "banner", "is_active": true, "spec": {"w": 1920}}),
    ]
}

async fn list_templates() -> Json<Value> {
    Json(Value::Array(templates()))
}

#[derive(Deserialize)]
struct KindQuery {
    kind: Option<String>,
}

async fn templates_by_kind(Query(q): Query<KindQuery>) -> Json<Value> {
    let filtered = templates()
        .into_iter()
        .filter(|t| q.kind.as_deref().map_or(true, |k| t["kind"] == k))
        .collect();
    Json(Value::Array(filtered))
}

async fn list_logos() -> Json<Value> {
    Json(json!([{"id": 1, "name": "Default Logo", "url": "http://cdn/logo.png", "is_default": true}]))
}

async fn default_logo() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "No default logo set"})),
    )
}
