use mongodb::{bson::doc, options::ClientOptions, Client, Database};

use crate::config::Config;

const APP_NAME: &str = "expense-tracker";

/// Connects to MongoDB and pings the configured database, so an unreachable
/// server is reported here instead of on the first request.
pub async fn connect(config: &Config) -> mongodb::error::Result<Database> {
    let mut options = ClientOptions::parse(&config.mongodb_uri).await?;
    options.app_name.get_or_insert_with(|| APP_NAME.to_string());
    options
        .server_selection_timeout
        .get_or_insert(config.mongodb_timeout);
    options.connect_timeout.get_or_insert(config.mongodb_timeout);

    let client = Client::with_options(options)?;
    let db = client.database(&config.database_name);
    db.run_command(doc! { "ping": 1 }, None).await?;
    Ok(db)
}
