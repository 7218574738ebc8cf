//! HTTP dashboard serving live statistics reports.
//!
//! Every request collects a fresh snapshot, so the pages always show the
//! current state of the topology:
//!
//! - `GET /` HTML table
//! - `GET /stats.txt` plain text report
//! - `GET /stats.json` JSON report
//!
//! # Examples
//!
//! ```rust,no_run
//! use redwork::{
//!     config::DashboardConfig, dashboard::StatsDashboard, store::RedisStore,
//!     topology::RedisTopology, StatsCollector,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisStore::connect("redis://127.0.0.1:6379/0").await?;
//!     let collector = StatsCollector::new(Arc::new(RedisTopology::new(store)));
//!
//!     let dashboard = StatsDashboard::new(collector, &DashboardConfig::default())?;
//!     dashboard.start().await?;
//!     Ok(())
//! }
//! ```

use crate::{
    Result, StatsCollector, config::DashboardConfig, render::ReportFormat,
    topology::TopologyProvider,
};
use std::net::SocketAddr;
use tracing::{error, info};
use warp::{Filter, Reply, http::StatusCode};

/// Dashboard server bound to one collector.
pub struct StatsDashboard<P: ?Sized> {
    collector: StatsCollector<P>,
    addr: SocketAddr,
}

impl<P> StatsDashboard<P>
where
    P: TopologyProvider + ?Sized + 'static,
{
    pub fn new(collector: StatsCollector<P>, config: &DashboardConfig) -> Result<Self> {
        Ok(Self {
            collector,
            addr: config.socket_addr()?,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until the process exits.
    pub async fn start(self) -> Result<()> {
        info!("Starting stats dashboard on http://{}", self.addr);
        warp::serve(routes(self.collector)).run(self.addr).await;
        Ok(())
    }
}

/// Route table for the dashboard, usable on its own for embedding or testing.
pub fn routes<P>(
    collector: StatsCollector<P>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone
where
    P: TopologyProvider + ?Sized + 'static,
{
    let with_collector = warp::any().map(move || collector.clone());

    let html = warp::path::end()
        .and(with_collector.clone())
        .and_then(|collector| report(collector, ReportFormat::Html));
    let text = warp::path("stats.txt")
        .and(warp::path::end())
        .and(with_collector.clone())
        .and_then(|collector| report(collector, ReportFormat::Text));
    let json = warp::path("stats.json")
        .and(warp::path::end())
        .and(with_collector)
        .and_then(|collector| report(collector, ReportFormat::Json));

    warp::get().and(html.or(text).or(json))
}

async fn report<P>(
    collector: StatsCollector<P>,
    format: ReportFormat,
) -> std::result::Result<warp::reply::Response, warp::Rejection>
where
    P: TopologyProvider + ?Sized + 'static,
{
    let rendered = collector
        .collect_with_timeout()
        .await
        .and_then(|stats| format.render(&stats));

    match rendered {
        Ok(body) => {
            Ok(warp::reply::with_header(body, "content-type", format.content_type()).into_response())
        }
        Err(e) => {
            error!("Failed to build {:?} stats report: {}", format, e);
            Ok(warp::reply::with_status(e.to_string(), StatusCode::SERVICE_UNAVAILABLE)
                .into_response())
        }
    }
}
