use actix_web::{HttpResponse, web};

use crate::{
    database::{
        models::{AnalyticsOverview, Module},
        repositories::AnalyticsRepository,
    },
    error::AppError,
    handlers::shared::ApiResponse,
    services::UserContext,
};

pub async fn overview(
    ctx: UserContext,
    analytics_repo: web::Data<AnalyticsRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_module_access(Module::Analytics)?;

    let counts = analytics_repo.overview_counts().await?;
    let overview = AnalyticsOverview::build(counts, |module| ctx.has_module_access(module));

    Ok(ApiResponse::success(overview))
}
