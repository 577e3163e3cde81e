//! In-memory posts API used in development and by the client's integration
//! tests.
//!
//! The table is seeded with two posts and lives only as long as the router.
//! Updates can be made to fail at random (`MockConfig::update_failure_rate`)
//! so clients can exercise their rollback paths; a rate of 1.0 fails every
//! update.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const UPDATE_FAILURE_MESSAGE: &str = "Oh no, there was an error";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePost {
    pub id: Option<String>,
    pub name: String,
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub name: Option<String>,
    pub content: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
    pub id: DeletedId,
}

/// Id echoed by `DELETE`: numeric-looking ids go back as JSON numbers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DeletedId {
    Number(u64),
    Text(String),
}

impl From<String> for DeletedId {
    fn from(id: String) -> Self {
        match id.parse() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Text(id),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Probability in `0.0..=1.0` that a `PUT` answers 500.
    pub update_failure_rate: f64,
    /// Delay applied to every `PUT` before answering.
    pub update_delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            update_failure_rate: 0.0,
            update_delay: Duration::from_millis(400),
        }
    }
}

impl MockConfig {
    pub fn new(update_failure_rate: f64, update_delay: Duration) -> Self {
        Self {
            update_failure_rate: if update_failure_rate.is_nan() {
                0.0
            } else {
                update_failure_rate.clamp(0.0, 1.0)
            },
            update_delay,
        }
    }

    /// No delay and no failures.
    pub fn instant() -> Self {
        Self::new(0.0, Duration::ZERO)
    }

    /// Every update fails, without delay.
    pub fn failing_updates() -> Self {
        Self::new(1.0, Duration::ZERO)
    }

    fn draw_update_failure(&self) -> bool {
        rand::thread_rng().gen_bool(self.update_failure_rate)
    }
}

pub type Db = Arc<RwLock<BTreeMap<String, Post>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    config: Arc<MockConfig>,
}

/// Error body returned by every failing route.
struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn not_found(id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("post {id} not found"),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// The two rows every fresh server starts with.
pub fn seed_posts() -> Vec<Post> {
    vec![
        Post {
            id: "1".to_string(),
            name: "React Server Components!".to_string(),
            content: None,
        },
        Post {
            id: "2".to_string(),
            name: "A post about RTK-Query".to_string(),
            content: None,
        },
    ]
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let db: Db = Arc::new(RwLock::new(
        seed_posts().into_iter().map(|p| (p.id.clone(), p)).collect(),
    ));
    let state = AppState {
        db,
        config: Arc::new(config),
    };
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .with_state(state)
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, failure_rate = config.update_failure_rate, "mock posts api serving");
    }
    axum::serve(listener, app_with(config)).await
}

async fn list_posts(State(state): State<AppState>) -> Json<Vec<Post>> {
    let posts = state.db.read().await;
    Json(posts.values().cloned().collect())
}

async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>), ApiFailure> {
    let post = Post {
        id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: input.name,
        content: input.content,
    };
    let mut posts = state.db.write().await;
    if posts.contains_key(&post.id) {
        return Err(ApiFailure {
            status: StatusCode::CONFLICT,
            message: format!("post {} already exists", post.id),
        });
    }
    posts.insert(post.id.clone(), post.clone());
    debug!(id = %post.id, "created post");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiFailure> {
    let posts = state.db.read().await;
    posts
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found(&id))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePost>,
) -> Result<StatusCode, ApiFailure> {
    let fail = state.config.draw_update_failure();
    if !state.config.update_delay.is_zero() {
        tokio::time::sleep(state.config.update_delay).await;
    }
    if fail {
        warn!(%id, "failing update on purpose");
        return Err(ApiFailure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: UPDATE_FAILURE_MESSAGE.to_string(),
        });
    }

    let mut posts = state.db.write().await;
    let post = posts.get_mut(&id).ok_or_else(|| ApiFailure::not_found(&id))?;
    if let Some(name) = input.name {
        post.name = name;
    }
    if let Some(content) = input.content {
        post.content = Some(content);
    }
    debug!(%id, "updated post");
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiFailure> {
    let mut posts = state.db.write().await;
    posts.remove(&id).ok_or_else(|| ApiFailure::not_found(&id))?;
    debug!(%id, "deleted post");
    Ok(Json(DeleteResult {
        success: true,
        id: id.into(),
    }))
}
