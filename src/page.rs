#![cfg(feature = "web")]
use crate::downloader::{self, CSV_FILE_NAME, TableView};
use crate::filter::FilterParams;
use crate::graph::GraphOptions;
use crate::pipeline::Outcome;
use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

const INDEX_TEMPLATE: &str = "index";

/// One entry of the test type selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

/// Data handed to the page template
///
/// Optional sections are `None` when they should not appear. After an error
/// only the form and the message are filled in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageView {
    pub options: Vec<SelectOption>,
    pub all_selected: bool,
    pub start_date: String,
    pub end_date: String,
    pub error_message: Option<String>,
    pub chart_svg: Option<String>,
    pub table: Option<TableView>,
    pub download_link: Option<String>,
    pub csv_file_name: &'static str,
}

impl PageView {
    /// The blank form shown before anything is uploaded.
    pub fn empty() -> Self {
        PageView {
            all_selected: true,
            csv_file_name: CSV_FILE_NAME,
            ..Default::default()
        }
    }

    /// Projects a pipeline outcome onto the page
    ///
    /// The submitted fields are echoed back so the form keeps its state. A
    /// chart that fails to draw is dropped on its own; any other failure
    /// leaves only the error message.
    pub fn from_outcome(params: &FilterParams, outcome: &Outcome, graph: &GraphOptions) -> Self {
        let selected = params.test_type.as_str();
        let mut view = PageView {
            options: outcome
                .options
                .iter()
                .map(|value| SelectOption {
                    value: value.clone(),
                    selected: value == selected,
                })
                .collect(),
            all_selected: selected.is_empty(),
            start_date: params.start_date.trim().to_string(),
            end_date: params.end_date.trim().to_string(),
            csv_file_name: CSV_FILE_NAME,
            ..Default::default()
        };

        let filtered = match &outcome.result {
            Ok(filtered) => filtered,
            Err(e) => {
                view.error_message = Some(e.user_message());
                return view;
            }
        };

        if filtered.rows.is_empty() {
            return view;
        }

        match filtered.csv() {
            Ok(csv) => view.download_link = Some(downloader::csv_data_uri(&csv)),
            Err(e) => {
                view.error_message = Some(e.user_message());
                return view;
            }
        }

        view.table = filtered.table();
        view.chart_svg = filtered.chart().and_then(|chart| match chart.render_svg(graph) {
            Ok(svg) => Some(svg),
            Err(e) => {
                log::warn!("chart rendering failed: {}", e);
                None
            }
        });

        view
    }
}

/// Compiled page templates.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string(INDEX_TEMPLATE, include_str!("./static/index.html"))?;
        Ok(Templates { registry })
    }

    pub fn render_page(&self, view: &PageView) -> Result<String, RenderError> {
        self.registry.render(INDEX_TEMPLATE, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Upload, UploadForm, process};

    const CSV: &[u8] = b"date,test_type,value\n2024-01-01,pH,6.5\n2024-02-01,pH,6.8\n2024-01-15,N,12\n";

    fn form(test_type: &str, start: &str, end: &str) -> UploadForm {
        UploadForm {
            file: Some(Upload {
                file_name: Some("lab.csv".into()),
                bytes: CSV.to_vec(),
            }),
            params: FilterParams {
                test_type: test_type.into(),
                start_date: start.into(),
                end_date: end.into(),
            },
        }
    }

    fn view_for(form: &UploadForm) -> PageView {
        PageView::from_outcome(&form.params, &process(form), &GraphOptions::default())
    }

    #[test]
    fn prior_selection_is_echoed() {
        let view = view_for(&form("N", "2024-01-01", ""));
        assert!(!view.all_selected);
        assert_eq!(
            view.options,
            vec![
                SelectOption { value: "pH".into(), selected: false },
                SelectOption { value: "N".into(), selected: true },
            ]
        );
        assert_eq!(view.start_date, "2024-01-01");
        assert!(view.download_link.unwrap().starts_with("data:text/csv;base64,"));
    }

    #[test]
    fn invalid_bound_keeps_options_but_drops_output() {
        let view = view_for(&form("pH", "not-a-date", ""));
        assert_eq!(view.options.len(), 2);
        assert!(view.error_message.unwrap().starts_with("Error processing file:"));
        assert!(view.chart_svg.is_none());
        assert!(view.table.is_none());
        assert!(view.download_link.is_none());
    }

    #[test]
    fn empty_form_renders() {
        let templates = Templates::new().unwrap();
        let html = templates.render_page(&PageView::empty()).unwrap();
        assert!(html.contains("name=\"test_type\""));
        assert!(!html.contains("Filtered Data Table"));
    }

    #[test]
    fn table_cells_are_escaped() {
        let templates = Templates::new().unwrap();
        let mut upload = form("", "", "");
        upload.file.as_mut().unwrap().bytes =
            b"date,test_type,value,note\n2024-01-01,pH,6.5,<b>dry</b>\n".to_vec();
        let html = templates.render_page(&view_for(&upload)).unwrap();
        assert!(html.contains("&lt;b&gt;dry&lt;/b&gt;"));
        assert!(html.contains("Filtered Data Table"));
    }
}
