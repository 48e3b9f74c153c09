use foundations::BootstrapResult;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::settings::SqlSettings;

pub(crate) async fn init_db_pool(settings: &SqlSettings) -> BootstrapResult<MySqlPool> {
  let pool = MySqlPoolOptions::new()
    .max_connections(settings.max_connections)
    .connect(&settings.db_url)
    .await?;
  Ok(pool)
}
