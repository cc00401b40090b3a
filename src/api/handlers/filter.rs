use axum::{response::IntoResponse, Json};
use crate::api::extractors::filter::FilterContext;

pub async fn get_filter(ctx: FilterContext) -> impl IntoResponse {
    Json(ctx.filter)
}
