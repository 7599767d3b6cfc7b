use crate::analyzer::aggregate::AggregateResult;
use crate::analyzer::report::render_markdown;
use crate::analyzer::{self, PublicProfile};
use crate::clock::Clock;
use crate::config::{Config, normalize_username};
use crate::db::{Database, EntryFilter, JourneyShareMeta};
use crate::journal::{Category, Entry, NewEntry, Project, ValidationError, project_name};
use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/entries", get(entries_list).post(entries_create))
        .route("/api/v1/entries/:id", delete(entries_delete))
        .route("/api/v1/stats", get(stats))
        .route("/api/v1/projects", get(projects_list))
        .route("/api/v1/profile/:username", get(profile))
        .route("/api/v1/journey/share", post(journey_share))
        .route("/api/v1/journey/shares", get(journey_share_list))
        .route("/api/v1/journey/:short_id", get(journey_by_id))
        .route("/api/v1/journey/:short_id/markdown", get(journey_markdown))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct EntriesQuery {
    category: Option<String>,
    project: Option<String>,
    public: Option<bool>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StatsQuery {
    public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectsQuery {
    public: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ProjectsPayload {
    projects: Vec<Project>,
}

#[derive(Debug, Serialize)]
struct EntriesPayload {
    count: usize,
    entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    user_name: String,
    timezone: String,
    entry_count: usize,
    latest_entry_at: Option<DateTime<Utc>>,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct SharePayload {
    short_id: String,
    share_path: String,
    markdown_path: String,
    json_path: String,
}

#[derive(Debug, Serialize)]
struct SharesPayload {
    shares: Vec<JourneyShareMeta>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = Database::open(&state.config.db_path)?;

    Ok(Json(StatusPayload {
        user_name: state.config.user_name.clone(),
        timezone: state.config.timezone.clone(),
        entry_count: database.entry_count()?,
        latest_entry_at: database.latest_entry_timestamp()?,
        api_port: state.config.api_port,
    }))
}

async fn entries_list(
    State(state): State<ApiState>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<EntriesPayload>> {
    let filter = EntryFilter {
        category: query
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?,
        project: query.project.as_deref().and_then(project_name),
        public_only: query.public.unwrap_or(false),
        limit: Some(query.limit.unwrap_or(50).clamp(1, 500)),
    };

    let database = Database::open(&state.config.db_path)?;
    let entries = database.entries(&filter)?;

    Ok(Json(EntriesPayload {
        count: entries.len(),
        entries,
    }))
}

async fn entries_create(
    State(state): State<ApiState>,
    Json(payload): Json<NewEntry>,
) -> ApiResult<(StatusCode, Json<Entry>)> {
    let valid = payload.validate(state.clock.now())?;

    let database = Database::open(&state.config.db_path)?;
    let entry = database.insert_entry(&valid)?;
    info!(id = %entry.id, category = %entry.category, "entry logged");

    Ok((StatusCode::CREATED, Json(entry)))
}

async fn entries_delete(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;

    if !database.delete_entry(&id)? {
        return Err(ApiError::NotFound(format!("No entry found with id: {id}")));
    }
    info!(id = %id, "entry deleted");

    Ok(Json(json!({ "deleted": true, "id": id })))
}

async fn stats(
    State(state): State<ApiState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<AggregateResult>> {
    let filter = if query.public.unwrap_or(false) {
        EntryFilter::public()
    } else {
        EntryFilter::all()
    };

    let database = Database::open(&state.config.db_path)?;
    let (_, stats) = analyzer::stats_for(&state.config, &database, &filter, state.clock.now())?;

    Ok(Json(stats))
}

async fn projects_list(
    State(state): State<ApiState>,
    Query(query): Query<ProjectsQuery>,
) -> ApiResult<Json<ProjectsPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let projects = database.projects(query.public.unwrap_or(false))?;

    Ok(Json(ProjectsPayload { projects }))
}

async fn profile(
    State(state): State<ApiState>,
    Path(username): Path<String>,
) -> ApiResult<Json<PublicProfile>> {
    let not_found = || ApiError::NotFound(format!("No public profile for: {username}"));

    let requested = normalize_username(&username);
    if requested.is_none() || state.config.published_username() != requested.as_deref() {
        return Err(not_found());
    }

    let database = Database::open(&state.config.db_path)?;
    let profile = analyzer::public_profile(&state.config, &database, state.clock.now())?
        .ok_or_else(not_found)?;

    Ok(Json(profile))
}

async fn journey_share(State(state): State<ApiState>) -> ApiResult<Json<SharePayload>> {
    let shared = analyzer::generate_and_share_journey(&state.config, state.clock.now())?;

    Ok(Json(SharePayload {
        short_id: shared.short_id,
        share_path: shared.share_path,
        markdown_path: shared.saved.markdown_path.display().to_string(),
        json_path: shared.saved.json_path.display().to_string(),
    }))
}

async fn journey_share_list(State(state): State<ApiState>) -> ApiResult<Json<SharesPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let shares = database.list_journey_shares(20)?;

    Ok(Json(SharesPayload { shares }))
}

async fn journey_by_id(
    State(state): State<ApiState>,
    Path(short_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;
    let share = database
        .journey_share(&short_id)?
        .ok_or_else(|| ApiError::NotFound(format!("No journey found for: {short_id}")))?;

    let mut report =
        serde_json::to_value(&share.report).context("Failed to serialize journey")?;
    report["short_id"] = json!(share.meta.short_id);
    report["shared_at"] = json!(share.meta.created_at);

    Ok(Json(report))
}

async fn journey_markdown(
    State(state): State<ApiState>,
    Path(short_id): Path<String>,
) -> ApiResult<Response> {
    let database = Database::open(&state.config.db_path)?;
    let share = database
        .journey_share(&short_id)?
        .ok_or_else(|| ApiError::NotFound(format!("No journey found for: {short_id}")))?;

    let mut response = Response::new(render_markdown(&share.report).into_response().into_body());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/markdown; charset=utf-8"),
    );

    Ok(response)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    Validation(ValidationError),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(error) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error.to_string(), "kind": error.kind() })),
            )
                .into_response(),
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use tempfile::{TempDir, tempdir};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap()
    }

    fn test_state() -> (ApiState, TempDir) {
        let tmp = tempdir().unwrap();
        let config = Config {
            user_name: "Ada".to_string(),
            username: Some("ada".to_string()),
            profile_public: true,
            timezone: "utc".to_string(),
            report_dir: tmp.path().join("journeys"),
            db_path: tmp.path().join("db").join("shiplog.db"),
            ..Config::default()
        };

        let state = ApiState {
            config: Arc::new(config),
            clock: Arc::new(FixedClock(now())),
        };
        (state, tmp)
    }

    fn new_entry(text: &str, category: &str) -> NewEntry {
        NewEntry {
            text: text.to_string(),
            category: category.to_string(),
            project: None,
            is_public: true,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn create_then_stats_reflects_entry() {
        let (state, _tmp) = test_state();

        let (code, Json(entry)) = entries_create(
            State(state.clone()),
            Json(new_entry("Hit 1,000 users", "win")),
        )
        .await
        .unwrap();
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(entry.created_at, now());

        let Json(result) = stats(State(state), Query(StatsQuery::default()))
            .await
            .unwrap();
        assert_eq!(result.streak, 1);
        assert_eq!(result.wins(), 1);
        assert_eq!(result.week_buckets[2], 1);
    }

    #[tokio::test]
    async fn blank_text_is_a_bad_request() {
        let (state, _tmp) = test_state();

        let error = entries_create(State(state), Json(new_entry("   ", "build")))
            .await
            .unwrap_err();

        assert!(matches!(error, ApiError::Validation(ValidationError::EmptyText)));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_category_filter_is_rejected() {
        let (state, _tmp) = test_state();
        let query = EntriesQuery {
            category: Some("party".to_string()),
            ..EntriesQuery::default()
        };

        let error = entries_list(State(state), Query(query)).await.unwrap_err();
        assert!(matches!(error, ApiError::Validation(ValidationError::InvalidCategory(_))));
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let (state, _tmp) = test_state();
        let (_, Json(entry)) = entries_create(
            State(state.clone()),
            Json(new_entry("Learned about edge caching", "learn")),
        )
        .await
        .unwrap();

        entries_delete(State(state.clone()), Path(entry.id.clone()))
            .await
            .unwrap();
        let error = entries_delete(State(state), Path(entry.id))
            .await
            .unwrap_err();

        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_only_answers_for_configured_username() {
        let (state, _tmp) = test_state();
        let mut private = new_entry("Stealth feature", "build");
        private.is_public = false;
        entries_create(State(state.clone()), Json(private)).await.unwrap();
        entries_create(State(state.clone()), Json(new_entry("Public launch", "launch")))
            .await
            .unwrap();

        let Json(found) = profile(State(state.clone()), Path("@Ada".to_string()))
            .await
            .unwrap();
        assert_eq!(found.entries.len(), 1);
        assert_eq!(found.stats.total_entries, 1);

        let missing = profile(State(state), Path("grace".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn hidden_profile_is_not_found() {
        let (state, _tmp) = test_state();
        let hidden = ApiState {
            config: Arc::new(Config {
                profile_public: false,
                ..(*state.config).clone()
            }),
            ..state
        };

        let error = profile(State(hidden), Path("ada".to_string()))
            .await
            .unwrap_err();
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn projects_scope_entries_and_profile() {
        let (state, _tmp) = test_state();
        let mut tagged = new_entry("Shipped journey cards", "launch");
        tagged.project = Some("ShipLog".to_string());
        entries_create(State(state.clone()), Json(tagged)).await.unwrap();
        entries_create(State(state.clone()), Json(new_entry("Read about SQLite WAL", "learn")))
            .await
            .unwrap();

        let query = EntriesQuery {
            project: Some(" ShipLog ".to_string()),
            ..EntriesQuery::default()
        };
        let Json(scoped) = entries_list(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(scoped.count, 1);
        assert_eq!(scoped.entries[0].project.as_deref(), Some("ShipLog"));

        let Json(listed) = projects_list(State(state.clone()), Query(ProjectsQuery::default()))
            .await
            .unwrap();
        assert_eq!(listed.projects.len(), 1);
        assert_eq!(listed.projects[0].entry_count, 1);

        let Json(found) = profile(State(state), Path("ada".to_string())).await.unwrap();
        assert_eq!(found.projects.len(), 1);
        assert_eq!(found.entries.len(), 2);
    }

    #[tokio::test]
    async fn shared_journey_can_be_fetched_back() {
        let (state, _tmp) = test_state();
        entries_create(State(state.clone()), Json(new_entry("Pushed v2.1", "launch")))
            .await
            .unwrap();

        let Json(shared) = journey_share(State(state.clone())).await.unwrap();
        let Json(report) = journey_by_id(State(state.clone()), Path(shared.short_id.clone()))
            .await
            .unwrap();
        assert_eq!(report["total_logs"], 1);
        assert_eq!(report["user_name"], "Ada");

        let markdown = journey_markdown(State(state.clone()), Path(shared.short_id))
            .await
            .unwrap();
        assert_eq!(
            markdown.headers()[header::CONTENT_TYPE],
            "text/markdown; charset=utf-8"
        );

        let Json(list) = journey_share_list(State(state)).await.unwrap();
        assert_eq!(list.shares.len(), 1);
    }
}
