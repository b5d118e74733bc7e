extern crate cadenza;

use actix_web::{
    http::ContentEncoding, middleware, web, App, HttpRequest, HttpResponse, HttpServer,
};
use actix_web_prom::PrometheusMetrics;

use actix_web::http::header;
use anyhow::Context;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cadenza::config::AppConfig;
use cadenza::endpoints::index_resource::internal;
use cadenza::endpoints::rate_resource::v1_rate;
use cadenza::endpoints::recommend_resource::{v1_batch_recommend, v1_recommend};
use cadenza::io;
use cadenza::itemknn::popularity::PopularityRank;
use cadenza::itemknn::similarity::select_backend;
use cadenza::service::RecommenderService;
use cadenza::stopwatch::Stopwatch;
use cadenza::store::{InteractionStore, SharedHandlesAndConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_default();
    let config = AppConfig::new(config_path);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let num_items_to_recommend = config.model.num_items_to_recommend;
    let min_personalized_results = config.model.min_personalized_results;
    let qty_workers = config.server.num_workers;

    let ratings = io::read_ratings(&config.data.ratings_path)
        .with_context(|| format!("could not read ratings from {}", config.data.ratings_path))?;
    let purchases = io::read_purchases(&config.data.purchases_path).with_context(|| {
        format!(
            "could not read purchases from {}",
            config.data.purchases_path
        )
    })?;

    let popularity_rank = Arc::new(PopularityRank::new(
        &purchases,
        config.model.popularity_rank_length,
    ));
    let store = Arc::new(InteractionStore::new(&ratings, &purchases));

    let backend = select_backend(config.model.similarity_backend);
    let recommender = Arc::new(RecommenderService::new(
        backend,
        config.model.min_similarity,
    ));

    let snapshot = store.snapshot();
    io::log_snapshot_stats(&config.data.ratings_path, &snapshot);
    recommender.fit(&snapshot).context("initial fit failed")?;

    let recommend_stopwatch = Arc::new(Mutex::new(Stopwatch::new()));

    info!("start metrics");
    let prometheus = PrometheusMetrics::new("api", Some("/internal/prometheus"), None);

    info!("Done. start httpd at http://{}", &bind_address);
    HttpServer::new(move || {
        let handles_and_config = SharedHandlesAndConfig {
            store: store.clone(),
            recommender: recommender.clone(),
            popularity_rank: popularity_rank.clone(),
            recommend_stopwatch: recommend_stopwatch.clone(),
            num_items_to_recommend,
            min_personalized_results,
            qty_workers,
        };

        App::new()
            .wrap(middleware::Compress::new(ContentEncoding::Identity))
            .wrap(prometheus.clone())
            .wrap(
                middleware::DefaultHeaders::new()
                    .header("Cache-Control", "no-cache, no-store, must-revalidate")
                    .header("Pragma", "no-cache")
                    .header("Expires", "0"),
            )
            .data(handles_and_config)
            .service(v1_recommend)
            .service(v1_batch_recommend)
            .service(v1_rate)
            .service(internal)
            .service(web::resource("/").route(web::get().to(|_req: HttpRequest| {
                HttpResponse::Found()
                    .header(header::LOCATION, "/internal")
                    .finish()
            })))
    })
    .workers(qty_workers)
    .bind(&bind_address)
    .with_context(|| format!("Could not bind server to address {}", &bind_address))?
    .run()
    .await?;

    Ok(())
}
