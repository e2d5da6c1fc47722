use anyhow::Context;
use medium_api::{MediumApi, MediumConfigBuilder};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  let env_filter = EnvFilter::builder()
    .with_default_directive(Level::WARN.into())
    .with_env_var("RUST_LOG")
    .from_env_lossy();

  // Logs go to stderr so stdout carries nothing but the resolved id.
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(env_filter)
    .init();

  let api_key = dotenvy::var("RAPIDAPI_KEY").unwrap_or_default();
  let username = std::env::args().nth(1).unwrap_or_else(|| "chirag127".to_owned());

  let config = MediumConfigBuilder::default()
    .api_key(api_key)
    .build()
    .context("building Medium API config")?;

  let api = MediumApi::new(config)?;

  let user = api.get_user_by_username(&username).await?;

  println!("{}", user.id);

  Ok(())
}
