use iced::{
    widget::{button, column, row, text, text_input, Space},
    Element, Length,
};

pub const DOWNLOAD_ALL_LABEL: &str = "Alle herunterladen";
pub const EDIT_TEMPLATE_LABEL: &str = "Dateinamen ändern";

pub fn rename_label(enabled: bool) -> &'static str {
    if enabled {
        "Umbenennung: AN"
    } else {
        "Umbenennung: AUS"
    }
}

pub fn progress_label(processed: usize, total: usize) -> String {
    format!(
        "{} / {} verarbeitet (erneut klicken um abzubrechen)",
        processed, total
    )
}

/// Main view state
pub struct PostboxView {
    pub page_location: String,
    pub rename_files: bool,
    /// Template being edited; `Some` while the prompt is open.
    pub template_draft: Option<String>,
    pub preparing: bool,
    pub progress: Option<(usize, usize)>,
    pub status_message: String,
}

impl Default for PostboxView {
    fn default() -> Self {
        Self {
            page_location: String::new(),
            rename_files: true,
            template_draft: None,
            preparing: false,
            progress: None,
            status_message: "Postfach-Seite angeben und herunterladen".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewMessage {
    PageLocationChanged(String),
    BrowsePressed,
    EditTemplatePressed,
    TemplateDraftChanged(String),
    TemplateConfirmed,
    TemplateCancelled,
    RenameTogglePressed,
    DownloadAllPressed,
}

impl PostboxView {
    pub fn update(&mut self, message: ViewMessage) {
        match message {
            ViewMessage::PageLocationChanged(location) => {
                self.page_location = location;
            }
            ViewMessage::TemplateDraftChanged(draft) => {
                if let Some(current) = self.template_draft.as_mut() {
                    *current = draft;
                }
            }
            ViewMessage::TemplateCancelled => {
                self.template_draft = None;
            }
            // The rest needs settings or the downloader, see app::update
            _ => {}
        }
    }

    pub fn open_template_editor(&mut self, current: String) {
        self.template_draft = Some(current);
    }

    pub fn take_template_draft(&mut self) -> Option<String> {
        self.template_draft.take()
    }

    /// Back to the idle label once a batch has ended, however it ended.
    pub fn reset_progress(&mut self) {
        self.preparing = false;
        self.progress = None;
    }

    pub fn download_label(&self) -> String {
        match self.progress {
            Some((processed, total)) => progress_label(processed, total),
            None if self.preparing => {
                "Postfach wird gelesen... (erneut klicken um abzubrechen)".to_string()
            }
            None => DOWNLOAD_ALL_LABEL.to_string(),
        }
    }

    pub fn view(&self) -> Element<'_, ViewMessage> {
        let mut content = column![
            text("ING Postfach").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Postfach-Seite (URL oder gespeicherte HTML-Datei):").size(16),
            row![
                text_input("https://banking.ing.de/app/postbox/postbox", &self.page_location)
                    .on_input(ViewMessage::PageLocationChanged)
                    .padding(10),
                button("Durchsuchen")
                    .on_press(ViewMessage::BrowsePressed)
                    .padding([10, 20]),
            ]
            .spacing(10),
            Space::new().height(Length::Fixed(10.0)),
            row![
                button(EDIT_TEMPLATE_LABEL)
                    .on_press(ViewMessage::EditTemplatePressed)
                    .padding([10, 20]),
                button(rename_label(self.rename_files))
                    .on_press(ViewMessage::RenameTogglePressed)
                    .padding([10, 20]),
                button(text(self.download_label()))
                    .on_press(ViewMessage::DownloadAllPressed)
                    .padding([10, 20]),
            ]
            .spacing(10),
        ]
        .padding(20)
        .spacing(10);

        if let Some(draft) = &self.template_draft {
            content = content.push(
                column![
                    text("Bitte gib ein Dateiname-Template ein:").size(14),
                    text_input("YYYY.MM.DD_ART_BETREFF", draft)
                        .on_input(ViewMessage::TemplateDraftChanged)
                        .on_submit(ViewMessage::TemplateConfirmed)
                        .padding(10),
                    row![
                        button("OK")
                            .on_press(ViewMessage::TemplateConfirmed)
                            .padding([10, 20]),
                        button("Abbrechen")
                            .on_press(ViewMessage::TemplateCancelled)
                            .padding([10, 20]),
                    ]
                    .spacing(10),
                ]
                .spacing(10),
            );
        }

        content.push(text(&self.status_message).size(14)).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_label_follows_progress() {
        let mut view = PostboxView::default();
        assert_eq!(view.download_label(), "Alle herunterladen");

        view.preparing = true;
        assert!(view.download_label().contains("erneut klicken"));

        view.progress = Some((3, 12));
        assert_eq!(
            view.download_label(),
            "3 / 12 verarbeitet (erneut klicken um abzubrechen)"
        );

        view.reset_progress();
        assert_eq!(view.download_label(), "Alle herunterladen");
    }

    #[test]
    fn test_rename_label() {
        assert_eq!(rename_label(true), "Umbenennung: AN");
        assert_eq!(rename_label(false), "Umbenennung: AUS");
    }

    #[test]
    fn test_template_editor_cancel_discards_draft() {
        let mut view = PostboxView::default();
        view.open_template_editor("YYYY.MM.DD_ART_BETREFF".to_string());
        view.update(ViewMessage::TemplateDraftChanged("DD".to_string()));
        assert_eq!(view.template_draft.as_deref(), Some("DD"));

        view.update(ViewMessage::TemplateCancelled);
        assert_eq!(view.template_draft, None);
        assert_eq!(view.take_template_draft(), None);
    }
}
