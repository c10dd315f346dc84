//! Create command: customized links (manual alias, passcode, expiry, geofence).

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use muri_core::api::{ApiClient, CustomLinkRequest, Geofence, RadiusUnit, links};
use muri_core::config::Config;
use muri_core::session;

pub struct CreateOptions<'a> {
    pub config: &'a Config,
    pub url: &'a str,
    pub aliases: Vec<String>,
    pub passcode: Option<String>,
    pub expires: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius: f64,
    pub unit: &'a str,
}

pub async fn run(opts: CreateOptions<'_>) -> Result<()> {
    if !session::is_authenticated() {
        anyhow::bail!("Customized links require sign-in. Run `muri login` first.");
    }

    let mut request = CustomLinkRequest::new(opts.url, opts.aliases)?;

    if let Some(passcode) = opts.passcode {
        request = request.with_passcode(passcode);
    }

    if let Some(expires) = &opts.expires {
        let naive = NaiveDateTime::parse_from_str(expires, "%Y-%m-%d %H:%M")
            .context("expiry must be formatted YYYY-MM-DD HH:MM (MST)")?;
        let expires_at = naive
            .and_local_timezone(links::mst())
            .single()
            .context("expiry does not resolve to a valid MST time")?;
        request = request.with_expiry(expires_at)?;
    }

    if let (Some(lat), Some(lon)) = (opts.lat, opts.lon) {
        let unit = RadiusUnit::parse(opts.unit)
            .with_context(|| format!("unknown radius unit '{}'; use miles or feet", opts.unit))?;
        request = request.with_geofence(Geofence::new(lat, lon, opts.radius, unit));
    }

    let api = ApiClient::new(opts.config)?;
    let short = api.create_custom(&request).await?;
    println!("{short}");
    Ok(())
}
