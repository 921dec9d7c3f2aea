use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shelf_core::{
    BookRecord, Catalog, SearchConfig, SearchController, SearchError, SearchStatus, Shelf, ShelfError, SledStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod shell;

use shell::ShellCache;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory of the on-disk state store.
    pub data_dir: PathBuf,
    pub search: SearchConfig,
    /// Static shell files; `None` disables the offline shell.
    pub assets: Option<PathBuf>,
}

pub struct AppState<C> {
    pub shelf: Arc<Mutex<Shelf<SledStore>>>,
    pub search: Arc<SearchController<C>>,
    pub shell: Option<Arc<ShellCache>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self { shelf: self.shelf.clone(), search: self.search.clone(), shell: self.shell.clone() }
    }
}

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub status: SearchStatus,
    pub results: Vec<BookRecord>,
}

#[derive(Serialize)]
pub struct ResultsView {
    pub status: SearchStatus,
    pub results: Vec<BookRecord>,
}

#[derive(Serialize)]
pub struct RecentView {
    pub query: String,
    pub timestamp: i64,
    pub at: String,
}

#[derive(Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
    pub visible: bool,
}

#[derive(Serialize)]
pub struct CategoryView {
    pub name: String,
    pub visible: bool,
    pub books: Vec<BookRecord>,
}

#[derive(Deserialize)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Deserialize)]
pub struct SelectionBody {
    pub category: String,
}

#[derive(Serialize)]
pub struct SelectionView {
    pub selected: Option<String>,
}

#[derive(Deserialize)]
pub struct SaveBody {
    pub id: String,
}

pub fn build_app<C: Catalog + 'static>(config: AppConfig, catalog: C) -> Result<Router> {
    let store = SledStore::open(&config.data_dir)?;
    let shelf = Shelf::open(store);
    let shell = match &config.assets {
        Some(dir) => match ShellCache::open(dir) {
            Ok(cache) => Some(Arc::new(cache)),
            Err(err) => {
                tracing::warn!(error = %err, "offline shell not installed, serving from disk only");
                Some(Arc::new(ShellCache::new(dir)))
            }
        },
        None => None,
    };
    let app_state = AppState {
        shelf: Arc::new(Mutex::new(shelf)),
        search: Arc::new(SearchController::new(catalog, config.search)),
        shell,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler::<C>))
        .route("/results", get(results_handler::<C>))
        .route("/recent", get(recent_handler::<C>))
        .route("/categories", get(categories_handler::<C>).post(create_category::<C>))
        .route("/categories/:name", get(category_handler::<C>))
        .route("/categories/:name/books", post(add_book::<C>))
        .route("/categories/:name/books/:id", delete(remove_book::<C>))
        .route("/categories/:name/toggle", post(toggle_category::<C>))
        .route("/selection", get(get_selection::<C>).put(set_selection::<C>).delete(clear_selection::<C>))
        .route("/save", post(save_result::<C>))
        .fallback(shell_handler::<C>)
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler<C: Catalog + 'static>(
    State(state): State<AppState<C>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let ticket = {
        let mut shelf = state.shelf.lock();
        shelf.begin_search(&params.q).map_err(search_error)?
    };
    let outcome = state.search.fetch(&ticket).await;

    let mut shelf = state.shelf.lock();
    let results = shelf
        .finish_search(ticket, outcome, OffsetDateTime::now_utc())
        .map_err(search_error)?
        .to_vec();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), status: shelf.status().clone(), results }))
}

fn search_error(err: SearchError) -> ApiError {
    let status = match &err {
        SearchError::EmptyQuery => StatusCode::BAD_REQUEST,
        SearchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SearchError::Transport(_) | SearchError::Status(_) | SearchError::Malformed(_) => StatusCode::BAD_GATEWAY,
        SearchError::Superseded { .. } => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}

fn shelf_error(err: ShelfError) -> ApiError {
    match err {
        ShelfError::InvalidCategorySelection => (StatusCode::BAD_REQUEST, err.to_string()),
        ShelfError::Store(e) => {
            tracing::error!(error = %e, "persisting shelf state failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn results_handler<C>(State(state): State<AppState<C>>) -> Json<ResultsView> {
    let shelf = state.shelf.lock();
    Json(ResultsView { status: shelf.status().clone(), results: shelf.results().to_vec() })
}

pub async fn recent_handler<C>(State(state): State<AppState<C>>) -> Json<Vec<RecentView>> {
    let shelf = state.shelf.lock();
    let recent = shelf
        .recent()
        .entries()
        .iter()
        .map(|e| RecentView {
            query: e.query.clone(),
            timestamp: e.timestamp,
            at: e.at().format(&Rfc3339).unwrap_or_default(),
        })
        .collect();
    Json(recent)
}

fn summaries(shelf: &Shelf<SledStore>) -> Vec<CategorySummary> {
    shelf
        .categories()
        .iter()
        .map(|(name, books)| CategorySummary { name: name.to_string(), count: books.len(), visible: shelf.is_visible(name) })
        .collect()
}

fn category_view(shelf: &Shelf<SledStore>, name: &str) -> CategoryView {
    CategoryView { name: name.to_string(), visible: shelf.is_visible(name), books: shelf.books_in(name).to_vec() }
}

pub async fn categories_handler<C>(State(state): State<AppState<C>>) -> Json<Vec<CategorySummary>> {
    Json(summaries(&state.shelf.lock()))
}

pub async fn create_category<C>(
    State(state): State<AppState<C>>,
    Json(body): Json<NewCategory>,
) -> Result<Json<Vec<CategorySummary>>, ApiError> {
    if body.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "category name is empty".into()));
    }
    let mut shelf = state.shelf.lock();
    shelf.create_category(&body.name).map_err(shelf_error)?;
    Ok(Json(summaries(&shelf)))
}

pub async fn category_handler<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
) -> Result<Json<CategoryView>, ApiError> {
    let shelf = state.shelf.lock();
    if !shelf.categories().contains(&name) {
        return Err((StatusCode::NOT_FOUND, format!("no category named {name}")));
    }
    Ok(Json(category_view(&shelf, &name)))
}

pub async fn add_book<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
    Json(book): Json<BookRecord>,
) -> Result<Json<CategoryView>, ApiError> {
    let mut shelf = state.shelf.lock();
    shelf.add_to_category(book, &name).map_err(shelf_error)?;
    Ok(Json(category_view(&shelf, &name)))
}

pub async fn remove_book<C>(
    State(state): State<AppState<C>>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<CategoryView>, ApiError> {
    let mut shelf = state.shelf.lock();
    shelf.remove_from_category(&id, &name).map_err(shelf_error)?;
    Ok(Json(category_view(&shelf, &name)))
}

pub async fn toggle_category<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
) -> Result<Json<CategorySummary>, ApiError> {
    let mut shelf = state.shelf.lock();
    if !shelf.categories().contains(&name) {
        return Err((StatusCode::NOT_FOUND, format!("no category named {name}")));
    }
    let visible = shelf.toggle_visibility(&name);
    Ok(Json(CategorySummary { count: shelf.books_in(&name).len(), name, visible }))
}

pub async fn get_selection<C>(State(state): State<AppState<C>>) -> Json<SelectionView> {
    Json(SelectionView { selected: state.shelf.lock().selected().map(str::to_string) })
}

pub async fn set_selection<C>(State(state): State<AppState<C>>, Json(body): Json<SelectionBody>) -> Json<SelectionView> {
    let mut shelf = state.shelf.lock();
    shelf.select_category(&body.category);
    Json(SelectionView { selected: shelf.selected().map(str::to_string) })
}

pub async fn clear_selection<C>(State(state): State<AppState<C>>) -> Json<SelectionView> {
    state.shelf.lock().clear_selection();
    Json(SelectionView { selected: None })
}

/// Files a book from the current results into the selected category.
pub async fn save_result<C>(
    State(state): State<AppState<C>>,
    Json(body): Json<SaveBody>,
) -> Result<Json<CategoryView>, ApiError> {
    let mut shelf = state.shelf.lock();
    let book = shelf
        .find_result(&body.id)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no current result with id {}", body.id)))?;
    shelf.save_to_selected(book).map_err(shelf_error)?;
    let category = shelf.selected().unwrap_or_default().trim().to_string();
    Ok(Json(category_view(&shelf, &category)))
}

pub async fn shell_handler<C>(State(state): State<AppState<C>>, uri: Uri) -> Response {
    let Some(shell) = &state.shell else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };
    match shell.fetch(uri.path()) {
        Some(asset) => ([(header::CONTENT_TYPE, asset.content_type)], asset.bytes).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
