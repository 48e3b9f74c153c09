#[macro_use]
extern crate tracing;

use foundations::{cli::Cli, telemetry, BootstrapResult};

use crate::settings::ServerSettings;

mod db;
mod metrics;
mod privileges;
mod server;
mod settings;
mod token_updater;
mod tokens;

#[tokio::main]
async fn main() -> BootstrapResult<()> {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .init();

  let service_info = foundations::service_info!();
  let cli = Cli::<ServerSettings>::new(&service_info, Vec::new())?;

  let telemetry_driver =
    telemetry::init_with_server(&service_info, &cli.settings.telemetry, Vec::new())?;
  if let Some(addr) = telemetry_driver.server_addr() {
    info!("Telemetry server is listening on http://{}", addr);
  }
  tokio::spawn(async move {
    if let Err(err) = telemetry_driver.await {
      error!("Telemetry server exited: {err}");
    }
  });

  server::start_server(&cli.settings).await
}
