use actix_web::{post, web, HttpResponse};
use serde_derive::{Deserialize, Serialize};
use tracing::warn;

use crate::io::{ItemId, UserId};
use crate::store::SharedHandlesAndConfig;

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    user_id: UserId,
    item_id: ItemId,
    rating: f64,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    status: &'static str,
    message: String,
}

// Rating-submission boundary. The rating is validated here, stored, and a
// refit from the full snapshot is triggered. A failed refit keeps the
// previously fitted state serving.
#[post("/v1/rate")]
pub async fn v1_rate(
    data: web::Data<SharedHandlesAndConfig>,
    payload: web::Json<RateRequest>,
) -> HttpResponse {
    if let Err(error) = data
        .store
        .put_rating(payload.user_id, payload.item_id, payload.rating)
    {
        return HttpResponse::BadRequest().json(RateResponse {
            status: "error",
            message: error.to_string(),
        });
    }

    let snapshot = data.store.snapshot();
    if let Err(error) = data.recommender.fit(&snapshot) {
        warn!(%error, "refit after rating write failed, serving the previous state");
        return HttpResponse::Ok().json(RateResponse {
            status: "accepted",
            message: format!("rating saved, refit failed: {}", error),
        });
    }

    HttpResponse::Ok().json(RateResponse {
        status: "success",
        message: format!(
            "rating for item {} by user {} saved",
            payload.item_id, payload.user_id
        ),
    })
}
