use std::env;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use foundation::math::WorldPoint;
use layers::{EntitiesLayer, JobOverlay, JobsLayer};
use scene::{JobId, StateSnapshot, Target};
use streaming::{ClientConfig, HerdClient, LiveFeed, SyncConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use viewport::{Viewport, ViewportConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Live dashboard for the drone herding backend")]
struct Args {
    /// Backend base URL (default: $HERD_BASE_URL or http://127.0.0.1:8000)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the live feed and log every update until Ctrl-C
    Watch {
        /// Surface width in pixels
        #[arg(long, default_value_t = 800.0)]
        width: f64,

        /// Surface height in pixels
        #[arg(long, default_value_t = 600.0)]
        height: f64,

        /// Hide the view (tear the feed down) after this many seconds
        #[arg(long)]
        hidden_after_s: Option<u64>,
    },

    /// Fetch the state once and print a summary
    Snapshot,

    /// Assign a new target to a job
    AssignTarget {
        /// Job id as shown by `snapshot`
        job_id: String,

        /// Circle centre: X,Y
        #[arg(long, conflicts_with = "polygon", required_unless_present = "polygon")]
        circle: Option<String>,

        /// Circle radius (only with --circle)
        #[arg(long, requires = "circle")]
        radius: Option<f64>,

        /// Polygon vertices: "X,Y;X,Y;X,Y"
        #[arg(long)]
        polygon: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let defaults = ClientConfig::default();
    let base_url = args.base_url.unwrap_or_else(|| {
        env::var("HERD_BASE_URL").unwrap_or_else(|_| defaults.base_url.clone())
    });
    let client = HerdClient::new(defaults.with_base_url(base_url))?;

    let sync_defaults = SyncConfig::default();
    let sync = SyncConfig {
        retry_interval_ms: env_var_u64("HERD_RETRY_MS", sync_defaults.retry_interval_ms),
        poll_interval_ms: env_var_u64("HERD_POLL_MS", sync_defaults.poll_interval_ms),
        ..sync_defaults
    };

    match args.command {
        Command::Watch {
            width,
            height,
            hidden_after_s,
        } => watch(client, sync, width, height, hidden_after_s).await?,
        Command::Snapshot => {
            let snap = client.get_state().await?;
            print_summary(&snap);
        }
        Command::AssignTarget {
            job_id,
            circle,
            radius,
            polygon,
        } => {
            let target = match (circle, polygon) {
                (Some(center), _) => Target::circle(parse_point(&center)?, radius),
                (None, Some(points)) => Target::polygon(parse_polygon(&points)?),
                (None, None) => return Err("either --circle or --polygon is required".into()),
            };
            let id: JobId = job_id.parse()?;
            let job = client.assign_target(&id, target).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
    }

    Ok(())
}

async fn watch(
    client: HerdClient,
    sync: SyncConfig,
    width: f64,
    height: f64,
    hidden_after_s: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = Viewport::new(&ViewportConfig::default())?;
    view.resize(width, height);
    let entities = EntitiesLayer::new(1);
    let jobs = JobsLayer::new(2);

    let feed = LiveFeed::spawn(Arc::new(client), sync)?;
    let mut snapshots = feed.snapshots();
    let mut status = feed.status();
    feed.set_visible(true).await?;

    let hide = async {
        match hidden_after_s {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(hide);
    let mut hidden = false;
    let mut report_tick = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = &mut hide, if !hidden => {
                hidden = true;
                feed.set_visible(false).await?;
                view.reset();
                info!("view hidden, feed torn down");
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = snapshots.borrow_and_update().clone();
                if let Some(snap) = current {
                    let bounds = view.update_snapshot(&snap);
                    let overlay = JobOverlay::derive(&snap.jobs);
                    let markers = jobs.extract(&snap.jobs);
                    let frame = entities.extract(&snap, &view);
                    info!(
                        flock = snap.flock.len(),
                        drones = snap.drones.len(),
                        targets = markers.len(),
                        active = ?overlay.active_job(),
                        queue = ?overlay.queue(),
                        paused = snap.paused,
                        "snapshot"
                    );
                    debug!(?bounds, offset = ?view.offset(), projected = frame.is_some(), "viewport");
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let s = *status.borrow_and_update();
                info!(state = %s.state, use_push = s.use_push, polling = s.polling, "feed status");
            }
            _ = report_tick.tick() => {
                let report = feed.report().await?;
                if report.stale {
                    warn!(age_ms = ?report.staleness_ms, "data is stale");
                }
                debug!(counters = ?report.metrics.counters, "feed metrics");
            }
        }
    }

    feed.shutdown().await;
    Ok(())
}

fn print_summary(snap: &StateSnapshot) {
    let overlay = JobOverlay::derive(&snap.jobs);
    println!("flock:     {}", snap.flock.len());
    println!("drones:    {}", snap.drones.len());
    println!("obstacles: {}", snap.polygons.len());
    println!("paused:    {}", snap.paused);
    println!("jobs:");
    for job in &snap.jobs {
        let active = if overlay.is_active(&job.id) { "*" } else { " " };
        let queue = overlay
            .queue_position(&job.id)
            .map(|p| format!("#{p}"))
            .unwrap_or_else(|| "-".to_string());
        let status = format!("{:?}", job.status);
        println!(
            " {active} {:<8} {status:<10} drones={} queue={queue}",
            job.id.to_string(),
            job.drone_count
        );
    }
}

fn parse_point(s: &str) -> Result<WorldPoint, Box<dyn std::error::Error>> {
    let parts: Vec<_> = s.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("point must be X,Y (got {s:?})").into());
    }
    let x: f64 = parts[0].trim().parse()?;
    let y: f64 = parts[1].trim().parse()?;
    let p = WorldPoint::new(x, y);
    if !p.is_finite() {
        return Err(format!("point must be finite (got {s:?})").into());
    }
    Ok(p)
}

fn parse_polygon(s: &str) -> Result<Vec<WorldPoint>, Box<dyn std::error::Error>> {
    let points = s
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .map(parse_point)
        .collect::<Result<Vec<_>, _>>()?;
    if points.len() < 3 {
        return Err("polygon needs at least 3 points".into());
    }
    Ok(points)
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
