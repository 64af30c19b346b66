use std::path::PathBuf;
use std::sync::Arc;

use iced::Task;
use tracing::{error, info, warn};

use crate::api::{HtmlRowSource, PostboxClient, RowSource};
use crate::application::{
    build_tasks, BatchEvent, BatchOutcome, DownloadCoordinator, RunGuard, Toggle,
};
use crate::config::AppConfig;
use crate::domain::{AppError, DownloadTask, Phase};
use crate::settings::{JsonFileStore, KeyValueStore, MemoryStore, Settings, SettingsError};
use crate::ui::{PostboxView, ViewMessage};

const ERROR_PREFIX: &str = "Es ist ein Fehler aufgetreten: ";
const TEMPLATE_HINT: &str = "Bitte gib ein Template nach folgendem Muster ein: YYYY.MM.DD_ART_BETREFF";

pub struct PostboxApp {
    view: PostboxView,
    client: PostboxClient,
    coordinator: DownloadCoordinator,
    settings: Settings,
    store: Box<dyn KeyValueStore>,
    // Held between the click and the moment the task list is ready
    pending_run: Option<RunGuard>,
}

impl PostboxApp {
    pub fn new(config: &AppConfig, client: PostboxClient) -> Self {
        let mut view = PostboxView {
            page_location: config.page_location.clone(),
            ..PostboxView::default()
        };

        let store: Box<dyn KeyValueStore> = match JsonFileStore::open(&config.settings_file) {
            Ok(store) => {
                info!(path = %store.path().display(), "Loaded settings");
                Box::new(store)
            }
            Err(e) => {
                warn!(error = %e, "Settings unavailable, changes will not be saved");
                view.status_message = format!("Einstellungen nicht lesbar: {}", e);
                Box::new(MemoryStore::default())
            }
        };
        let settings = Settings::load(store.as_ref());
        view.rename_files = settings.rename_files;

        let coordinator = DownloadCoordinator::new(Arc::new(client.clone()), config.settle_delay);

        Self {
            view,
            client,
            coordinator,
            settings,
            store,
            pending_run: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Ui(ViewMessage),
    PageChosen(Option<PathBuf>),
    TasksPrepared(Result<Vec<DownloadTask>, AppError>),
    Batch(BatchEvent),
    AlertClosed,
}

pub fn update(app: &mut PostboxApp, message: Message) -> Task<Message> {
    match message {
        Message::Ui(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                ViewMessage::BrowsePressed => {
                    return Task::perform(
                        async {
                            rfd::AsyncFileDialog::new()
                                .add_filter("HTML", &["html", "htm"])
                                .pick_file()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::PageChosen,
                    );
                }
                ViewMessage::EditTemplatePressed => {
                    app.view
                        .open_template_editor(app.settings.filename_template.clone());
                }
                ViewMessage::TemplateConfirmed => {
                    if let Some(draft) = app.view.take_template_draft() {
                        match app.settings.update_template(app.store.as_mut(), &draft) {
                            Ok(()) => {
                                app.view.status_message = format!("Dateiname-Template: {}", draft);
                            }
                            Err(SettingsError::MissingPlaceholders(missing)) => {
                                warn!(template = %draft, ?missing, "Rejected filename template");
                                return alert(TEMPLATE_HINT.to_string());
                            }
                            Err(e) => return settings_alert(e),
                        }
                    }
                }
                ViewMessage::RenameTogglePressed => {
                    match app.settings.toggle_rename(app.store.as_mut()) {
                        Ok(enabled) => app.view.rename_files = enabled,
                        Err(e) => return settings_alert(e),
                    }
                }
                ViewMessage::DownloadAllPressed => match app.coordinator.controller().toggle() {
                    Toggle::AbortRequested => {
                        app.view.status_message =
                            "Wird nach dem aktuellen Dokument abgebrochen...".to_string();
                    }
                    Toggle::Started(guard) => {
                        app.pending_run = Some(guard);
                        app.view.preparing = true;
                        app.view.status_message = "Postfach wird gelesen...".to_string();

                        return Task::perform(
                            prepare_tasks(
                                app.client.clone(),
                                app.view.page_location.clone(),
                                app.settings.clone(),
                            ),
                            Message::TasksPrepared,
                        );
                    }
                },
                ViewMessage::PageLocationChanged(_)
                | ViewMessage::TemplateDraftChanged(_)
                | ViewMessage::TemplateCancelled => {}
            }
        }
        Message::PageChosen(path) => {
            if let Some(path) = path {
                app.view.page_location = path.display().to_string();
            }
        }
        Message::TasksPrepared(result) => {
            let guard = app.pending_run.take();
            match (result, guard) {
                (Ok(tasks), Some(guard)) => {
                    app.view.status_message = format!("{} Dokumente gefunden", tasks.len());
                    return Task::stream(app.coordinator.batch_stream(guard, tasks))
                        .map(Message::Batch);
                }
                (Ok(_), None) => {}
                (Err(e), _) => {
                    error!(error = %e, "Could not prepare downloads");
                    app.view.reset_progress();
                    app.view.status_message = e.to_string();
                    return alert(format!("{}{}", ERROR_PREFIX, e));
                }
            }
        }
        Message::Batch(BatchEvent::Progress { processed, total }) => {
            app.view.preparing = false;
            app.view.progress = Some((processed, total));
            if app.coordinator.controller().phase() == Phase::Running {
                app.view.status_message = format!("Lade Dokument {} von {}", processed, total);
            }
        }
        Message::Batch(BatchEvent::Finished(outcome)) => {
            app.view.reset_progress();
            match outcome {
                BatchOutcome::Completed { total } => {
                    app.view.status_message = format!("{} Dokumente heruntergeladen", total);
                }
                BatchOutcome::Aborted { processed, total } => {
                    app.view.status_message =
                        format!("Abgebrochen nach {} von {} Dokumenten", processed, total);
                }
                BatchOutcome::Failed { processed, error } => {
                    app.view.status_message =
                        format!("Fehler bei Dokument {}: {}", processed, error);
                    return alert(format!("{}{}", ERROR_PREFIX, error));
                }
            }
        }
        Message::AlertClosed => {}
    }
    Task::none()
}

pub fn view(app: &PostboxApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::Ui)
}

/// Read the postbox page and derive one task per row.
async fn prepare_tasks(
    client: PostboxClient,
    location: String,
    settings: Settings,
) -> Result<Vec<DownloadTask>, AppError> {
    let html = client
        .load_page(&location)
        .await
        .map_err(|e| AppError::Page(e.to_string()))?;
    let rows = HtmlRowSource::new(html).rows()?;
    build_tasks(&rows, &settings, &client.config().base_url)
}

fn settings_alert(e: SettingsError) -> Task<Message> {
    let e = AppError::from(e);
    error!(error = %e, "Could not save settings");
    alert(format!("{}{}", ERROR_PREFIX, e))
}

fn alert(message: String) -> Task<Message> {
    Task::perform(
        async move {
            rfd::AsyncMessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title("ING Postfach")
                .set_description(message)
                .set_buttons(rfd::MessageButtons::Ok)
                .show()
                .await;
        },
        |_| Message::AlertClosed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="ibbr-table-body">
          <div class="ibbr-table-row">
            <span class="ibbr-table-cell">Kontoauszug</span>
            <span class="ibbr-table-cell">Jahresabschluss</span>
            <span class="ibbr-table-cell">15.03.2024</span>
            <span class="ibbr-table-cell"><a href="./download?id=7">Download</a></span>
          </div>
        </div>
    "#;

    fn test_app(dir: &std::path::Path) -> PostboxApp {
        let config = AppConfig {
            settings_file: dir.join("settings.json"),
            ..AppConfig::default()
        };
        let client = PostboxClient::new(config.client.clone()).unwrap();
        PostboxApp::new(&config, client)
    }

    #[tokio::test]
    async fn test_prepare_tasks_from_saved_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("postbox.html");
        std::fs::write(&page, PAGE).unwrap();

        let app = test_app(dir.path());
        let tasks = prepare_tasks(
            app.client.clone(),
            page.display().to_string(),
            Settings::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            tasks,
            vec![DownloadTask {
                url: "https://banking.ing.de/app/postbox/download?id=7".to_string(),
                filename: Some("2024.03.15_Kontoauszug_Jahresabschluss.pdf".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_prepare_tasks_missing_page() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let err = prepare_tasks(
            app.client.clone(),
            dir.path().join("nope.html").display().to_string(),
            Settings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Page(_)));
    }

    #[tokio::test]
    async fn test_second_click_requests_abort() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());

        let _ = update(&mut app, Message::Ui(ViewMessage::DownloadAllPressed));
        assert!(app.pending_run.is_some());
        assert!(app.view.preparing);

        let _ = update(&mut app, Message::Ui(ViewMessage::DownloadAllPressed));
        assert_eq!(
            app.coordinator.controller().phase(),
            Phase::Aborting
        );

        let _ = update(
            &mut app,
            Message::TasksPrepared(Err(AppError::Page("offline".to_string()))),
        );
        assert!(app.pending_run.is_none());
        assert_eq!(app.coordinator.controller().phase(), Phase::Idle);
        assert_eq!(app.view.download_label(), "Alle herunterladen");
    }

    #[tokio::test]
    async fn test_rename_toggle_persists_to_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        assert!(app.view.rename_files);

        let _ = update(&mut app, Message::Ui(ViewMessage::RenameTogglePressed));
        assert!(!app.view.rename_files);

        let reloaded = test_app(dir.path());
        assert!(!reloaded.settings.rename_files);
        assert!(!reloaded.view.rename_files);
    }

    #[tokio::test]
    async fn test_valid_template_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());

        let _ = update(&mut app, Message::Ui(ViewMessage::EditTemplatePressed));
        let _ = update(
            &mut app,
            Message::Ui(ViewMessage::TemplateDraftChanged(
                "ART_BETREFF_YYYY-MM-DD".to_string(),
            )),
        );
        let _ = update(&mut app, Message::Ui(ViewMessage::TemplateConfirmed));

        assert_eq!(app.settings.filename_template, "ART_BETREFF_YYYY-MM-DD");
        assert_eq!(
            test_app(dir.path()).settings.filename_template,
            "ART_BETREFF_YYYY-MM-DD"
        );
    }
}
