use std::collections::HashMap;
use std::time::Instant;

use actix_web::{get, post, web, HttpResponse};
use serde_derive::{Deserialize, Serialize};

use crate::io::{ItemId, UserId};
use crate::itemknn::popularity;
use crate::itemknn::ItemScore;
use crate::store::SharedHandlesAndConfig;

#[derive(Debug, Deserialize)]
pub struct V1QueryParams {
    user_id: UserId,
    how_many: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendedItem {
    item_id: ItemId,
    score: f64,
}

fn to_response(recommendations: Vec<ItemScore>) -> Vec<RecommendedItem> {
    recommendations
        .into_iter()
        .map(|scored| RecommendedItem {
            item_id: scored.id,
            score: scored.score,
        })
        .collect()
}

// The storefront's main endpoint: personalized recommendations for one user,
// padded from the popularity rank when the personalized result is too short.
#[get("/v1/recommend")]
pub async fn v1_recommend(
    data: web::Data<SharedHandlesAndConfig>,
    query: web::Query<V1QueryParams>,
) -> HttpResponse {
    let how_many = query.how_many.unwrap_or(data.num_items_to_recommend);

    let start_time = Instant::now();
    let personal = match data.recommender.recommend(query.user_id, how_many) {
        Ok(recommendations) => recommendations,
        Err(error) => return HttpResponse::ServiceUnavailable().json(error.to_string()),
    };

    let recommendations = popularity::augment(
        personal,
        data.popularity_rank.as_slice(),
        data.min_personalized_results,
        how_many,
    );
    data.recommend_stopwatch
        .lock()
        .unwrap()
        .record(start_time.elapsed());

    HttpResponse::Ok().json(to_response(recommendations))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    user_ids: Vec<UserId>,
    how_many: Option<usize>,
}

// Batch variant keyed by user id. Users are scored independently; the
// popularity padding applies per user, exactly as in the single-user case.
#[post("/v1/batch_recommend")]
pub async fn v1_batch_recommend(
    data: web::Data<SharedHandlesAndConfig>,
    payload: web::Json<BatchRequest>,
) -> HttpResponse {
    let how_many = payload.how_many.unwrap_or(data.num_items_to_recommend);

    let results = match data.recommender.batch_recommend(&payload.user_ids, how_many) {
        Ok(results) => results,
        Err(error) => return HttpResponse::ServiceUnavailable().json(error.to_string()),
    };

    let response: HashMap<UserId, Vec<RecommendedItem>> = results
        .into_iter()
        .map(|(user_id, personal)| {
            let recommendations = popularity::augment(
                personal,
                data.popularity_rank.as_slice(),
                data.min_personalized_results,
                how_many,
            );
            (user_id, to_response(recommendations))
        })
        .collect();

    HttpResponse::Ok().json(response)
}
