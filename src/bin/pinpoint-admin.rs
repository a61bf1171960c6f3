use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pinpoint::api::handlers::{HealthResponse, TrackingResponse};
use pinpoint::models::{CreateLinkResponse, LinkSummary, VisitRecord};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "pinpoint-admin")]
#[command(about = "Manage tracking links on a running pinpoint server", long_about = None)]
struct Cli {
    /// Base URL of the pinpoint server
    #[arg(long, default_value = "http://localhost:3001")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a tracking link
    Create {
        /// URL visitors are sent to
        redirect_url: String,
        /// Optional note shown in listings
        #[arg(long)]
        description: Option<String>,
    },
    /// List all tracking links
    List,
    /// Show the visits recorded for a link
    Show {
        link_id: String,
    },
    /// Delete a link and its visits
    Delete {
        link_id: String,
    },
    /// Check that the server is up
    Health,
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        bail!("{} ({})", message, status);
    }

    response
        .json::<T>()
        .await
        .context("server returned an unexpected response body")
}

fn maps_link(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps?q={latitude},{longitude}")
}

fn print_visit(index: usize, visit: &VisitRecord) {
    println!(
        "#{} [{}] {} at {}",
        index + 1,
        visit.id,
        visit.ip,
        visit.timestamp.to_rfc3339()
    );
    println!("    referer:    {}", visit.referer);
    if let Some(ref user_agent) = visit.user_agent {
        println!("    user agent: {}", user_agent);
    }

    match visit.location {
        Some(ref location) => {
            let place = [&location.city, &location.region, &location.country]
                .iter()
                .filter_map(|part| part.as_deref())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "    ip location: {} (via {})",
                if place.is_empty() { "unknown" } else { place.as_str() },
                location.source.as_deref().unwrap_or("unknown")
            );
            if let (Some(lat), Some(lon)) = (location.latitude, location.longitude) {
                println!("                 {}", maps_link(lat, lon));
            }
            if let Some(ref org) = location.org {
                println!("    network:    {}", org);
            }
        }
        None => println!("    ip location: pending or unavailable"),
    }

    if let Some(ref precise) = visit.precise_location {
        println!(
            "    precise:    ±{}m {}",
            precise.accuracy.round(),
            maps_link(precise.latitude, precise.longitude)
        );
        if let Some(altitude) = precise.altitude {
            println!("    altitude:   {}m", altitude.round());
        }
        if let Some(speed) = precise.speed {
            println!("    speed:      {} km/h", (speed * 3.6).round());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base = cli.server.trim_end_matches('/');
    let client = Client::builder()
        .user_agent(concat!("pinpoint-admin/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    match cli.command {
        Commands::Create {
            redirect_url,
            description,
        } => {
            let response = client
                .post(format!("{base}/api/create-link"))
                .json(&json!({ "redirectUrl": redirect_url, "description": description }))
                .send()
                .await?;
            let created: CreateLinkResponse = parse(response).await?;
            println!("✅ Created link {}", created.link_id);
            println!("   Tracking link: {}", created.tracking_link);
            println!("   Redirects to:  {}", created.redirect_url);
        }
        Commands::List => {
            let response = client.get(format!("{base}/api/links")).send().await?;
            let links: Vec<LinkSummary> = parse(response).await?;
            if links.is_empty() {
                println!("No links");
            } else {
                println!("Links:");
                for summary in links {
                    let link = summary.link;
                    println!(
                        "  - {} -> {} ({} clicks, {} visits) {}",
                        link.id, link.redirect_url, link.clicks, summary.tracking_count, link.description
                    );
                }
            }
        }
        Commands::Show { link_id } => {
            let response = client
                .get(format!("{base}/api/tracking/{link_id}"))
                .send()
                .await?;
            let tracking: TrackingResponse = parse(response).await?;
            let link = tracking.link;
            println!("{} -> {}", link.tracking_link, link.redirect_url);
            println!(
                "Created {}, {} clicks",
                link.created_at.to_rfc3339(),
                link.clicks
            );
            for (index, visit) in tracking.tracking.iter().enumerate() {
                print_visit(index, visit);
            }
        }
        Commands::Delete { link_id } => {
            let response = client
                .delete(format!("{base}/api/links/{link_id}"))
                .send()
                .await?;
            let _: Value = parse(response).await?;
            println!("✅ Deleted link {}", link_id);
        }
        Commands::Health => {
            let response = client.get(format!("{base}/api/health")).send().await?;
            let health: HealthResponse = parse(response).await?;
            println!("Server status: {}", health.status);
        }
    }

    Ok(())
}
