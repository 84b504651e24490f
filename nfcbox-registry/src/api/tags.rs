//! Tag assignment endpoints
//!
//! Form posts come from a browser page, so successful writes answer with a
//! `303 See Other` back to the listing. A missing form field is a `400`.

use axum::{
    extract::{rejection::FormRejection, Path, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use nfcbox_common::db::{self, TagFields, TagRecord};
use nfcbox_common::media::extract_uri_and_type;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

/// Body of the add and edit forms; all three fields must be present
#[derive(Debug, Deserialize)]
pub struct TagForm {
    pub tag_id: String,
    pub spotify_link: String,
    /// May be empty, which is stored as no comment
    pub comment: String,
}

impl TagForm {
    /// Validate the share link and build the row values
    fn into_fields(self) -> ApiResult<TagFields> {
        let tag_id = self.tag_id.trim().to_string();
        if tag_id.is_empty() {
            return Err(ApiError::BadRequest("Tag ID is required".to_string()));
        }

        let link = extract_uri_and_type(&self.spotify_link)
            .ok_or(ApiError::InvalidLink)?;

        let comment = Some(self.comment.trim().to_string()).filter(|c| !c.is_empty());

        Ok(TagFields {
            tag_id,
            spotify_uri: link.uri,
            media_type: link.kind.as_str().to_string(),
            comment,
        })
    }
}

/// Read interface used by players
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagLookup {
    pub spotify_uri: String,
    pub media_type: String,
}

/// GET /
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<TagRecord>>> {
    Ok(Json(db::list_tags(&state.db).await?))
}

/// POST /add
pub async fn add(
    State(state): State<AppState>,
    form: Result<Form<TagForm>, FormRejection>,
) -> ApiResult<Redirect> {
    let Form(form) = form?;
    let fields = form.into_fields()?;
    let id = db::insert_tag(&state.db, &fields).await?;
    info!(id, tag = %fields.tag_id, uri = %fields.spotify_uri, "Tag added");
    Ok(Redirect::to("/"))
}

/// POST /edit/:id
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    form: Result<Form<TagForm>, FormRejection>,
) -> ApiResult<Redirect> {
    let Form(form) = form?;
    let fields = form.into_fields()?;
    db::update_tag(&state.db, id, &fields).await?;
    info!(id, tag = %fields.tag_id, uri = %fields.spotify_uri, "Tag updated");
    Ok(Redirect::to("/"))
}

/// POST /delete/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Redirect> {
    db::delete_tag(&state.db, id).await?;
    info!(id, "Tag deleted");
    Ok(Redirect::to("/"))
}

/// GET /api/tags/:tag_id
pub async fn lookup(
    State(state): State<AppState>,
    Path(tag_id): Path<String>,
) -> ApiResult<Json<TagLookup>> {
    let record = db::find_by_tag_id(&state.db, &tag_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Tag {}", tag_id)))?;

    Ok(Json(TagLookup {
        spotify_uri: record.spotify_uri,
        media_type: record.media_type,
    }))
}

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/add", post(add))
        .route("/edit/:id", post(edit))
        .route("/delete/:id", post(delete))
        .route("/api/tags/:tag_id", get(lookup))
}
