use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::filter::FilterCriteria;
use super::page::{render_dashboard, render_load_error};
use super::store::{ApplicantSource, DataStore};
use super::summary::GroupKey;
use super::view::PortalView;
use crate::error::AppError;

/// Dashboard page plus the JSON API exposing the same view.
pub fn portal_router<S>(store: Arc<DataStore<S>>) -> Router
where
    S: ApplicantSource + 'static,
{
    Router::new()
        .route("/", get(dashboard_handler::<S>))
        .route("/reload", post(reload_handler::<S>))
        .route("/api/v1/applicants/view", post(view_handler::<S>))
        .route("/api/v1/applicants/reload", post(api_reload_handler::<S>))
        .with_state(store)
}

/// Body of `POST /api/v1/applicants/view`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewRequest {
    pub criteria: FilterCriteria,
    pub group_by: GroupKey,
}

/// Reads dashboard controls from a form query string. Repeated `state` and
/// `naics_code` keys select several values; unknown keys are ignored.
pub fn parse_dashboard_query(query: &str) -> ViewRequest {
    let mut request = ViewRequest::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "state" if !value.is_empty() => {
                request.criteria.states.insert(value.into_owned());
            }
            "naics_code" if !value.is_empty() => {
                request.criteria.naics_codes.insert(value.into_owned());
            }
            "city" => request.criteria.city = value.into_owned(),
            "zipcode" => request.criteria.zipcode = value.into_owned(),
            "ez_only" => {
                request.criteria.ez_only = matches!(value.as_ref(), "on" | "true" | "1")
            }
            "group_by" => request.group_by = value.parse().unwrap_or_default(),
            _ => {}
        }
    }
    request
}

/// Writes dashboard controls back into a query string `parse_dashboard_query`
/// reads unchanged.
pub fn dashboard_query(criteria: &FilterCriteria, group_by: GroupKey) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for state in &criteria.states {
        query.append_pair("state", state);
    }
    for code in &criteria.naics_codes {
        query.append_pair("naics_code", code);
    }
    if !criteria.city.is_empty() {
        query.append_pair("city", &criteria.city);
    }
    if !criteria.zipcode.is_empty() {
        query.append_pair("zipcode", &criteria.zipcode);
    }
    if criteria.ez_only {
        query.append_pair("ez_only", "on");
    }
    query.append_pair("group_by", group_by.as_param());
    query.finish()
}

pub(crate) async fn dashboard_handler<S>(
    State(store): State<Arc<DataStore<S>>>,
    RawQuery(query): RawQuery,
) -> Response
where
    S: ApplicantSource + 'static,
{
    let ViewRequest { criteria, group_by } = parse_dashboard_query(query.as_deref().unwrap_or(""));
    match store.view(criteria, group_by).await {
        Ok(view) => Html(render_dashboard(&view)).into_response(),
        Err(error) => {
            warn!(%error, "dashboard unavailable");
            (error.status_code(), Html(render_load_error(&error))).into_response()
        }
    }
}

pub(crate) async fn reload_handler<S>(
    State(store): State<Arc<DataStore<S>>>,
    RawQuery(query): RawQuery,
) -> Redirect
where
    S: ApplicantSource + 'static,
{
    store.invalidate().await;
    let ViewRequest { criteria, group_by } = parse_dashboard_query(query.as_deref().unwrap_or(""));
    Redirect::to(&format!("/?{}", dashboard_query(&criteria, group_by)))
}

pub(crate) async fn view_handler<S>(
    State(store): State<Arc<DataStore<S>>>,
    Json(request): Json<ViewRequest>,
) -> Result<Json<PortalView>, AppError>
where
    S: ApplicantSource + 'static,
{
    let view = store
        .view(request.criteria, request.group_by)
        .await
        .inspect_err(|error| warn!(%error, "applicant view unavailable"))?;
    Ok(Json(view))
}

pub(crate) async fn api_reload_handler<S>(State(store): State<Arc<DataStore<S>>>) -> Response
where
    S: ApplicantSource + 'static,
{
    store.invalidate().await;
    (StatusCode::OK, Json(json!({ "status": "reloaded" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_and_encoded_query_values() {
        let request = parse_dashboard_query(
            "state=CA&state=NY&naics_code=541&city=San+Jos%C3%A9&zipcode=&ez_only=on&group_by=both",
        );
        assert_eq!(request.criteria.states.len(), 2);
        assert!(request.criteria.naics_codes.contains("541"));
        assert_eq!(request.criteria.city, "San José");
        assert!(request.criteria.zipcode.is_empty());
        assert!(request.criteria.ez_only);
        assert_eq!(request.group_by, GroupKey::Both);
    }

    #[test]
    fn empty_query_is_unrestricted() {
        let request = parse_dashboard_query("");
        assert!(request.criteria.is_unrestricted());
        assert_eq!(request.group_by, GroupKey::State);
    }

    #[test]
    fn dashboard_query_reads_back_unchanged() {
        let query = "state=CA&state=NY&naics_code=541&city=San+Jos%C3%A9&ez_only=on&group_by=both";
        let request = parse_dashboard_query(query);
        assert_eq!(dashboard_query(&request.criteria, request.group_by), query);

        let request = parse_dashboard_query("");
        assert_eq!(dashboard_query(&request.criteria, request.group_by), "group_by=state");
    }

    #[test]
    fn unknown_grouping_falls_back_to_state() {
        let request = parse_dashboard_query("group_by=city&state=");
        assert_eq!(request.group_by, GroupKey::State);
        assert!(request.criteria.states.is_empty());
    }
}
