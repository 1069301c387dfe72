use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use ezviewer_core::config::Config;
use ezviewer_core::history::read_page;
use ezviewer_core::{Direction, HistoryPage, PageRequest, Registry};
use serde::Deserialize;

use crate::error::ApiErr;

/// GET /api/logs: every tracked alias with its file path.
pub async fn list_logs(
    State(registry): State<Registry>,
) -> Result<Json<BTreeMap<String, PathBuf>>, ApiErr> {
    let logs = tokio::task::spawn_blocking(move || registry.list()).await??;
    Ok(Json(logs))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub alias: String,
    pub direction: Direction,
    #[serde(default)]
    pub before_line: u64,
    pub count: Option<u64>,
}

/// GET /api/history: one page of older lines for a tracked log.
pub async fn history(
    State(registry): State<Registry>,
    State(config): State<Arc<Config>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryPage>, ApiErr> {
    let Query(q) = query.map_err(|e| ApiErr::bad_request(e.body_text()))?;
    let count = q.count.unwrap_or(config.stream.history_lines as u64);
    if count == 0 {
        return Err(ApiErr::bad_request("count must be at least 1"));
    }
    let req = PageRequest {
        direction: q.direction,
        before_line: q.before_line,
        count: count.min(config.history.max_page_lines as u64),
    };

    let alias = q.alias;
    let page = tokio::task::spawn_blocking(move || -> Result<HistoryPage, ApiErr> {
        let Some(path) = registry.get(&alias)? else {
            return Err(ApiErr::not_found(format!("{alias} not found")));
        };
        Ok(read_page(&path, &req)?)
    })
    .await??;

    Ok(Json(page))
}
