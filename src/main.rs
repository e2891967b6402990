use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_classification::config::AppConfig;
use course_classification::db;
use course_classification::error::AppError;
use course_classification::search::{HttpSearchClient, NoopSearchClient, SearchClient};
use course_classification::services::{DiscoveryRequest, Pagination};
use course_classification::state::AppState;
use course_classification::time;

const USAGE: &str = "usage: course_classification [listing | featured | logos | institutions | search <term> [page] | institution <id> [lang]]";

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_id(value: Option<&String>) -> Result<i64, AppError> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AppError::BadRequest(USAGE.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "course_classification=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::new_from_env();
    let pool = db::connect(&config.database_url).await?;

    let search: Arc<dyn SearchClient> = match config.search.clone() {
        Some(search_config) => {
            info!("searching index {} at {}", search_config.index_name, search_config.base_url);
            Arc::new(HttpSearchClient::new(search_config)?)
        }
        None => {
            warn!("SEARCH_URL not set, discovery returns no results");
            Arc::new(NoopSearchClient)
        }
    };

    let state = AppState::new(pool, search, config.media_url.clone());
    let now = time::now();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str).unwrap_or("listing") {
        "listing" => print_json(&state.catalog().grouped_listing(now).await?)?,
        "featured" => print_json(&state.catalog().featured_courses(now).await?)?,
        "logos" => print_json(&state.catalog().institution_logos().await?)?,
        "institutions" => print_json(&state.catalog().search_institutions().await?)?,
        "search" => {
            let page_index = match args.get(2) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("invalid page: {}", raw)))?,
                None => 0,
            };
            let request = DiscoveryRequest {
                search_term: args.get(1).cloned(),
                page: Pagination::new(Pagination::default().size, page_index)?,
                ..Default::default()
            };
            print_json(&state.discovery().search(&request, now).await?)?
        }
        "institution" => {
            let id = parse_id(args.get(1))?;
            let lang = args.get(2).map(String::as_str);
            print_json(&state.institution_pages().page(id, lang, now).await?)?
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
