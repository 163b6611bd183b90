//! Admin dashboard route handlers.

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use storehouse_core::analytics::Period;
use storehouse_core::inventory::DEFAULT_LOW_STOCK_THRESHOLD;

use crate::error::{AppError, Result};
use crate::extract::AppQuery;
use crate::middleware::RequireAdmin;
use crate::services::DashboardService;
use crate::state::AppState;

/// `GET /api/dashboard/analytics` query string.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub period: Option<String>,
}

impl AnalyticsQuery {
    fn period(&self) -> Result<Period> {
        match self.period.as_deref().map(str::trim) {
            None | Some("") => Ok(Period::default()),
            Some(raw) => Ok(raw.parse()?),
        }
    }
}

/// `GET /api/dashboard/inventory` query string.
#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub threshold: Option<i32>,
}

/// `GET /api/dashboard/stats`
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let stats = DashboardService::new(state.pool(), state.config().utc_offset)
        .stats()
        .await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// `GET /api/dashboard/analytics?period=weekly|monthly`
#[instrument(skip(state, query), fields(admin_id = %admin.id))]
pub async fn analytics(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppQuery(query): AppQuery<AnalyticsQuery>,
) -> Result<impl IntoResponse> {
    let period = query.period()?;
    let analytics = DashboardService::new(state.pool(), state.config().utc_offset)
        .analytics(period)
        .await?;
    Ok(Json(json!({ "success": true, "analytics": analytics })))
}

/// `GET /api/dashboard/quick-stats`
pub async fn quick_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let stats = DashboardService::new(state.pool(), state.config().utc_offset)
        .quick_stats()
        .await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// `GET /api/dashboard/inventory?threshold=`
pub async fn inventory(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    AppQuery(query): AppQuery<InventoryQuery>,
) -> Result<impl IntoResponse> {
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    if threshold < 0 {
        return Err(AppError::BadRequest("threshold must not be negative".to_owned()));
    }
    let report = DashboardService::new(state.pool(), state.config().utc_offset)
        .inventory(threshold)
        .await?;
    Ok(Json(json!({ "success": true, "inventory": report })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_period_defaults_to_monthly() {
        assert_eq!(AnalyticsQuery::default().period().unwrap(), Period::Monthly);
        let blank = AnalyticsQuery {
            period: Some(" ".to_owned()),
        };
        assert_eq!(blank.period().unwrap(), Period::Monthly);
    }

    #[test]
    fn test_unknown_period_rejected() {
        let query = AnalyticsQuery {
            period: Some("yearly".to_owned()),
        };
        assert!(matches!(query.period(), Err(AppError::BadRequest(_))));
    }
}
