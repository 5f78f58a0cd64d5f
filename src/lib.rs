pub mod ai;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod state;
pub mod storage;
pub use error::{AppError, AppResult};

use std::sync::Arc;

use ai::{GeminiClient, GeminiSettings};
use coordinator::ActionCoordinator;
use storage::ExportService;

/// A ready-to-use editing session plus the export target for downloads.
#[derive(Debug)]
pub struct Session {
    pub coordinator: ActionCoordinator<GeminiClient>,
    pub exporter: ExportService,
}

/// Entrypoint used by front ends: logging, config, the Gemini client and an
/// empty editing session.
pub fn connect() -> AppResult<Session> {
    logging::init();
    tracing::info!("starting pixshop");

    let app_config = config::load_app_config();
    let settings = GeminiSettings::from_config(&app_config)?;
    tracing::info!(model = %settings.model, "image service configured");
    let client = GeminiClient::new(settings)?;
    let exporter = ExportService::with_default_dir(app_config.export_dir.as_deref())?;

    let coordinator = ActionCoordinator::new(Arc::new(client))
        .with_device_pixel_ratio(app_config.device_pixel_ratio());
    tracing::info!(
        export_dir = %exporter.export_dir().display(),
        "session ready with state={:?}",
        coordinator.session_state()
    );
    Ok(Session {
        coordinator,
        exporter,
    })
}
