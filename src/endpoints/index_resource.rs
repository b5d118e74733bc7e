use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use itertools::Itertools;

use crate::store::SharedHandlesAndConfig;
use web::Data;

#[get("/internal")]
pub async fn internal(data: Data<SharedHandlesAndConfig>) -> HttpResponse {
    let mut html =
        "<html>cadenza: item-based collaborative filtering recommendations.<br />".to_string();

    match data.recommender.fitted_state() {
        Some(state) => {
            html.push_str("<h3>Fitted state</h3>");
            html.push_str("Qty Interactions: ");
            html.push_str(&state.qty_interactions().to_string());
            html.push_str("<br />Qty Users: ");
            html.push_str(&state.users().len().to_string());
            html.push_str("<br />Qty Items: ");
            html.push_str(&state.items().len().to_string());
            html.push_str("<br />Fitted At: ");
            html.push_str(&state.fitted_at().to_string());
            html.push_str("<br />Age (minutes): ");

            let age_minutes = (Utc::now().naive_utc() - state.fitted_at()).num_minutes();

            html.push_str(&age_minutes.to_string());
            html.push_str("<br />Similarity Backend: ");
            html.push_str(data.recommender.backend_name());
        }
        None => {
            html.push_str("<h3>Not fitted yet</h3>");
        }
    }

    html.push_str("<h3>Popularity rank</h3>");
    html.push_str("Top items: ");
    let top_items = data
        .popularity_rank
        .as_slice()
        .iter()
        .take(10)
        .map(|item_id| item_id.to_string())
        .join(", ");
    html.push_str(&top_items);

    html.push_str("<h3>Serving</h3>");
    html.push_str("Qty Workers: ");
    html.push_str(&data.qty_workers.to_string());

    let stopwatch = data.recommend_stopwatch.lock().unwrap();
    html.push_str("<br />Qty Recommend Requests: ");
    html.push_str(&stopwatch.qty_requests().to_string());
    if stopwatch.qty_requests() > 0 {
        html.push_str("<br />Recommend latency percentiles (micros): ");
        html.push_str(" p50=");
        html.push_str(&stopwatch.percentile_in_micros(0.5).round().to_string());
        html.push_str(" p90=");
        html.push_str(&stopwatch.percentile_in_micros(0.9).round().to_string());
        html.push_str(" p99=");
        html.push_str(&stopwatch.percentile_in_micros(0.99).round().to_string());
    }

    html.push_str("</html>");

    HttpResponse::Ok().content_type("text/html").body(html)
}
