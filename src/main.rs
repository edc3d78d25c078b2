mod app;
mod ui;

use std::sync::Arc;

use gtk::prelude::*;
use relm4::prelude::*;
use tracing_subscriber::EnvFilter;

use app::App;
use confab::api::{BackendClient, ChatBackend};
use confab::config::{ApiConfig, APP_ID};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ApiConfig::from_env()?;
    tracing::info!("Using chat backend at {}", config.display_base());
    let backend: Arc<dyn ChatBackend> = Arc::new(BackendClient::new(config)?);

    let app = adw::Application::builder().application_id(APP_ID).build();

    app.connect_startup(|_| {
        let Some(display) = gtk::gdk::Display::default() else {
            tracing::warn!("No default display, skipping stylesheet");
            return;
        };
        let provider = gtk::CssProvider::new();
        provider.load_from_string(include_str!("../data/style.css"));
        gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    });

    RelmApp::from_app(app).run_async::<App>(backend);
    Ok(())
}
