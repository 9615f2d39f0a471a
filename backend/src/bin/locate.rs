use aquaroute::{
    config::load_config,
    geocoder::Geocoder,
    models::{Coordinate, EmergencyRequestRef},
    resolver::LocationResolver,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Resolve an emergency address to coordinates and print it as JSON"
)]
struct Args {
    /// Free-text location, e.g. "Maradana, Baseline Road, Colombo 10"
    #[arg(long)]
    address: String,

    /// Latitude supplied with the request, if any
    #[arg(long, requires = "lng")]
    lat: Option<f64>,
    #[arg(long, requires = "lat")]
    lng: Option<f64>,

    /// Skip the external geocoders
    #[arg(long)]
    offline: bool,
}

impl Args {
    fn coordinates(&self) -> Option<Coordinate> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config()?;

    let mut resolver = LocationResolver::from_config(&config)?;
    if args.offline {
        resolver = resolver.with_geocoder(Geocoder::offline());
    }

    let request = EmergencyRequestRef {
        id: "cli".to_string(),
        brigade_name: String::new(),
        brigade_location: args.address.clone(),
        coordinates: args.coordinates(),
        priority: None,
        status: None,
    };
    let location = resolver.resolve(&request).await;
    println!("{}", serde_json::to_string_pretty(&location)?);
    Ok(())
}
