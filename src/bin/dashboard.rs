//! Terminal driver: fetch a page's data, compose it and play it back.
//!
//! Usage:
//!   cluster-dashboard --page net --start-date 2023-07-01 --end-date 2023-07-31 --ticks 5
//!
//! Example:
//!   DASHBOARD_API_URL=http://localhost:5001/api \
//!   RUST_LOG=info cluster-dashboard --page / --sum --play --ticks 10

use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use cluster_dashboard::pages::{compose, PageContent, PageInputs};
use cluster_dashboard::playback::{self, TransportCommand};
use cluster_dashboard::views::geo::OverlayKind;
use cluster_dashboard::{
    ApiClient, DashboardConfig, DashboardEngine, Page, PageStatus, PlaybackTimer, QueryHandle,
    QueryPatch, QueryStore, ViewMode,
};

#[derive(Parser, Debug)]
#[command(name = "cluster-dashboard")]
#[command(about = "Play back community activity for one dashboard page", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides config and DASHBOARD_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Page route or name: /, geo, net, structural, classical
    #[arg(short, long, default_value = "/")]
    page: String,

    #[arg(long)]
    start_date: Option<String>,

    #[arg(long)]
    end_date: Option<String>,

    #[arg(long)]
    activity_type: Option<String>,

    #[arg(long)]
    cluster: Option<String>,

    /// Show merged (SUM) views instead of per-activity (SET)
    #[arg(long)]
    sum: bool,

    /// Census overlay for the geo page: age, density or income
    #[arg(long)]
    overlay: Option<String>,

    /// Shortest path query for the net page, as `source,target`
    #[arg(long)]
    path: Option<String>,

    /// Frames to print
    #[arg(short, long, default_value_t = 1)]
    ticks: usize,

    /// Advance on the page's playback timer instead of stepping
    #[arg(long)]
    play: bool,
}

fn load_config(args: &Args) -> Result<DashboardConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_json_file(path)?,
        None => {
            let mut config = DashboardConfig::default();
            config.apply_env();
            config
        }
    };
    if let Some(url) = &args.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    config.validate()?;
    Ok(config)
}

fn query_patch(args: &Args) -> QueryPatch {
    QueryPatch {
        start_date: args.start_date.clone(),
        end_date: args.end_date.clone(),
        activity_type: args.activity_type.clone(),
        cluster: args.cluster.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let page = Page::parse(&args.page).ok_or_else(|| format!("Unknown page '{}'", args.page))?;
    let overlay = match &args.overlay {
        Some(name) => Some(
            OverlayKind::parse(name).ok_or_else(|| format!("Unknown overlay '{}'", name))?,
        ),
        None => None,
    };
    let config = load_config(&args)?;
    let client = ApiClient::new(&config)?;

    let store = QueryHandle::new(QueryStore::new(config.default_query.clone()));
    store.update_input_params(&query_patch(&args));
    let query = store.submit_inputs();

    println!("{}", page.title());
    println!("{}", PageStatus::Loading.render_placeholder().unwrap_or_default());

    let data = match client.load_page(page, &query).await {
        Ok(data) => data,
        Err(e) => {
            let status = PageStatus::Failed(e.to_string());
            println!("{}", status.render_placeholder().unwrap_or_default());
            std::process::exit(1);
        }
    };

    let census = match overlay {
        Some(kind) => Some((kind, client.census_data(kind).await?)),
        None => None,
    };
    let shortest_path = match args.path.as_deref().and_then(|p| p.split_once(',')) {
        Some((source, target)) if page == Page::Net => {
            Some(client.shortest_path(source.trim(), target.trim()).await)
        }
        _ => None,
    };

    let mut engine = DashboardEngine::with_records(data.records);
    store.sync_with_groups(engine.groups()?);
    let dates = Arc::new(engine.dates()?);
    info!("[Dashboard] {} dates in range", dates.len());

    let inputs = PageInputs {
        mode: if args.sum { ViewMode::Sum } else { ViewMode::Set },
        overlay: census.as_ref().map(|(kind, collection)| (*kind, collection)),
        centrality: data.centrality.as_ref(),
        ..PageInputs::default()
    };

    let interval = config.playback.interval_for(page);
    let mut timer = PlaybackTimer::new(page, interval);
    if args.play && !dates.is_empty() {
        store.toggle_playback();
        timer.start(store.clone(), Arc::clone(&dates))?;
    }

    for tick in 0..args.ticks.max(1) {
        if tick > 0 {
            if timer.is_running() {
                tokio::time::sleep(interval).await;
            } else {
                store.with(|s| playback::apply(TransportCommand::Next, dates.as_slice(), s));
            }
        }

        let mut snapshot = compose(page, &mut engine, &store.snapshot(), &config, &inputs)?;
        if let PageContent::Net(net) = &mut snapshot.content {
            net.shortest_path = shortest_path.clone();
        }

        println!();
        for line in snapshot.summary_lines() {
            println!("{}", line);
        }
    }

    timer.stop();
    Ok(())
}
