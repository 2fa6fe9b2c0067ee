use std::sync::Arc;

use od_dao::{
    capability::AbilityRules,
    collection::Collection,
    controller::CrudController,
    tenant::{TenantContext, TenantPolicy},
    Db,
};
use od_db_sqlite::db::SqliteDb;
use strum::IntoEnumIterator;

mod config_path;

#[tokio::main]
async fn main() {
    let config_path = match config_path::get() {
        Ok(path) => path,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let config = match od_config::from_path(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            return;
        }
    };

    if let Err(err) = od_log::init(config.log().display_level(), config.log().level_filter()) {
        eprintln!("Failed to initialize logging: {err}");
        return;
    }

    od_log::info("opsdesk", "Starting");

    let Some(console) = config.console() else {
        od_log::error("opsdesk", "No console caller is configured");
        return;
    };

    let sqlite = config.db().sqlite();
    let db = match SqliteDb::new(&sqlite.url(), sqlite.max_connections()).await {
        Ok(db) => Arc::new(Db::SqliteDb(db)),
        Err(err) => {
            od_log::error("opsdesk", format!("Opening database failed: {err}"));
            return;
        }
    };
    if let Err(err) = db.init().await {
        od_log::error("opsdesk", format!("Initializing database failed: {err}"));
        return;
    }

    let abilities = match AbilityRules::from_config(config.capability(), console.role()) {
        Ok(abilities) => Arc::new(abilities),
        Err(err) => {
            od_log::error(
                "opsdesk",
                format!(
                    "Invalid capability rules for role '{}': {err}",
                    console.role()
                ),
            );
            return;
        }
    };

    let policy = TenantPolicy::new(config.tenant());
    let ctx = TenantContext::new(
        console.organization_id(),
        console.user_id(),
        &policy.segment(console.segment()),
    );

    for collection in Collection::iter() {
        let controller = CrudController::new(
            db.clone(),
            abilities.clone(),
            &ctx,
            &collection,
            config.query(),
            &policy,
        );
        match controller.list(None, None).await {
            Some(records) => od_log::info(
                "opsdesk",
                format!(
                    "{}: {} record(s), {} in total",
                    collection.to_str(),
                    records.len(),
                    controller.total()
                ),
            ),
            None => match controller.error() {
                Some(err) => od_log::warn("opsdesk", format!("{}: {err}", collection.to_str())),
                None => od_log::info("opsdesk", format!("{}: skipped", collection.to_str())),
            },
        }
    }

    db.close().await;
    od_log::info("opsdesk", "Turned off");
}
