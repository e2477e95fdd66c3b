//! Survey rendering from a tab-separated question file
//!
//! Each row of `survey.tsv` is one question. Rows are grouped into pages in
//! file order: a change of `page_number` closes the current page. The renderer
//! never sorts, so authored files must list pages in the order shown.

pub mod fragments;
pub mod script;

use csv::{ReaderBuilder, StringRecord};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::manifest::Manifest;

pub const SURVEY_FILE: &str = "survey.tsv";

/// Columns that must be present in the header (case-insensitive)
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "question_type",
    "question_text",
    "page_number",
    "option_text",
    "option_values",
    "required",
];

/// Columns accepted but not used for rendering
pub const OPTIONAL_COLUMNS: [&str; 1] = ["variables"];

const FORM_CLASSES: &str =
    "experiment-layout mdl-layout mdl-layout--fixed-header mdl-js-layout mdl-color--grey-100";

const TEXTAREA_ROWS: usize = 3;

#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("Cannot read question file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Question file is not valid tab-separated text: {0}")]
    Malformed(#[from] csv::Error),

    #[error("Question file is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Row {row}: unknown question type '{value}'")]
    UnknownQuestionType { row: usize, value: String },

    #[error("Row {row}: {options} options provided, and {values} values. Must define one option per value")]
    OptionMismatch {
        row: usize,
        options: usize,
        values: usize,
    },
}

/// Closed set of question types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionType {
    Radio,
    Checkbox,
    Textfield,
    Textarea,
    Numeric,
    Table,
    Instruction,
}

impl QuestionType {
    pub const ALL: [QuestionType; 7] = [
        QuestionType::Radio,
        QuestionType::Checkbox,
        QuestionType::Textfield,
        QuestionType::Textarea,
        QuestionType::Numeric,
        QuestionType::Table,
        QuestionType::Instruction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Textfield => "textfield",
            QuestionType::Textarea => "textarea",
            QuestionType::Numeric => "numeric",
            QuestionType::Table => "table",
            QuestionType::Instruction => "instruction",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// One parsed row of the question file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub question_type: QuestionType,
    pub text: String,
    pub page: String,
    pub options: Option<String>,
    pub values: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Reject unknown question types and option/value count mismatches
    pub strict: bool,
    /// Form `action` attribute (defaults to `#`)
    pub form_action: Option<String>,
}

impl RenderOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// One `<fieldset class="step">` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyPage {
    pub page: String,
    pub questions: Vec<String>,
    /// Number of required questions on the page
    pub required: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSurvey {
    pub html: String,
    pub validation: String,
    pub pages: Vec<SurveyPage>,
}

/// Empty cells and pandas-style `nan` count as missing
fn cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    let value = record.get(index?)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value.to_string())
    }
}

fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("1" | "1.0" | "true" | "yes" | "y")
    )
}

/// Parse question rows from tab-separated text
///
/// Cells may be double-quoted, so a quoted question can hold tabs or line
/// breaks. Unknown question types are an error in strict mode and are skipped
/// with a warning otherwise.
pub fn parse_questions(text: &str, options: &RenderOptions) -> Result<Vec<Question>, SurveyError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(text.as_bytes());

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    for column in REQUIRED_COLUMNS {
        if !header.iter().any(|h| h == column) {
            return Err(SurveyError::MissingColumn(column.to_string()));
        }
    }
    let index = |name: &str| header.iter().position(|h| h == name);
    let (type_col, text_col, page_col) = (
        index("question_type"),
        index("question_text"),
        index("page_number"),
    );
    let (option_col, value_col, required_col) = (
        index("option_text"),
        index("option_values"),
        index("required"),
    );

    let mut questions = Vec::new();
    let mut row = 0;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        row += 1;
        let raw_type = cell(&record, type_col).unwrap_or_default();

        let question_type = match raw_type.to_lowercase().parse::<QuestionType>() {
            Ok(t) => t,
            Err(value) if options.strict => {
                return Err(SurveyError::UnknownQuestionType { row, value });
            }
            Err(value) => {
                tracing::warn!(row, question_type = %value, "Unknown question type, skipping row");
                continue;
            }
        };

        questions.push(Question {
            row,
            question_type,
            text: cell(&record, text_col).unwrap_or_default(),
            page: cell(&record, page_col).unwrap_or_default(),
            options: cell(&record, option_col),
            values: cell(&record, value_col),
            required: truthy(cell(&record, required_col).as_deref()),
        });
    }
    Ok(questions)
}

fn split_list(list: &str) -> Vec<&str> {
    list.split(',').map(str::trim).collect()
}

/// Fragment for one question, `None` when the row is skipped
fn render_question(
    question: &Question,
    id: &str,
    options: &RenderOptions,
) -> Result<Option<String>, SurveyError> {
    let text = question.text.as_str();
    let fragment = match question.question_type {
        QuestionType::Instruction => fragments::instruction(text),
        QuestionType::Radio => {
            let (Some(option_text), Some(value_text)) = (&question.options, &question.values) else {
                tracing::warn!(row = question.row, question = %text, "Radio question has no options or values, skipping");
                return Ok(None);
            };
            let labels = split_list(option_text);
            let values = split_list(value_text);
            if labels.len() != values.len() {
                let err = SurveyError::OptionMismatch {
                    row: question.row,
                    options: labels.len(),
                    values: values.len(),
                };
                if options.strict {
                    return Err(err);
                }
                tracing::warn!(row = question.row, error = %err, "Skipping radio question");
                return Ok(None);
            }
            fragments::radio(text, id, &labels, &values, question.required)
        }
        QuestionType::Checkbox => {
            let Some(option_text) = &question.options else {
                tracing::warn!(row = question.row, question = %text, "Checkbox question has no options, skipping");
                return Ok(None);
            };
            fragments::checkbox(text, id, &split_list(option_text))
        }
        QuestionType::Textfield => fragments::textfield(text, id),
        QuestionType::Textarea => fragments::textarea(text, id, TEXTAREA_ROWS),
        QuestionType::Numeric => fragments::numeric(text, id),
        QuestionType::Table => {
            tracing::info!(row = question.row, "Table questions are not yet supported, skipping");
            return Ok(None);
        }
    };

    if question.required && question.question_type != QuestionType::Instruction {
        Ok(Some(fragments::required_wrapper(id, &fragment)))
    } else {
        Ok(Some(fragment))
    }
}

/// Group questions into pages and render each fragment
///
/// Question ids are `<exp_id>_<n>`, `n` counting every row of a known type.
pub fn render_pages(
    questions: &[Question],
    exp_id: &str,
    options: &RenderOptions,
) -> Result<Vec<SurveyPage>, SurveyError> {
    let mut pages: Vec<SurveyPage> = Vec::new();

    for (count, question) in questions.iter().enumerate() {
        let id = format!("{}_{}", exp_id, count);
        let Some(fragment) = render_question(question, &id, options)? else {
            continue;
        };

        let starts_page = pages.last().map(|p| p.page != question.page).unwrap_or(true);
        if starts_page {
            pages.push(SurveyPage {
                page: question.page.clone(),
                questions: Vec::new(),
                required: 0,
            });
        }
        if let Some(page) = pages.last_mut() {
            page.questions.push(fragment);
            if question.required && question.question_type != QuestionType::Instruction {
                page.required += 1;
            }
        }
    }
    Ok(pages)
}

fn form_html(pages: &[SurveyPage], exp_id: &str, form_action: &str) -> String {
    let mut html = format!(
        "<form action=\"{}\">\n<div class=\"{}\">\n<div class=\"experiment-ribbon\"></div>\n\
         <main class=\"experiment-main mdl-layout__content\">\n<div class=\"experiment-container mdl-grid\">\n\
         <div class=\"mdl-cell mdl-cell--2-col mdl-cell--hide-tablet mdl-cell--hide-phone\"></div>\n\
         <div class=\"experiment-content mdl-color--white mdl-shadow--4dp content mdl-color-text--grey-800 mdl-cell mdl-cell--8-col\">",
        form_action, FORM_CLASSES
    );
    for (index, page) in pages.iter().enumerate() {
        html.push_str(&format!(
            "\n<fieldset class=\"step\" id=\"{}_page_{}\" data-page=\"{}\">",
            exp_id, index, page.page
        ));
        for question in &page.questions {
            html.push('\n');
            html.push_str(question);
        }
        html.push_str("\n</fieldset>");
    }
    html.push_str("\n</div>\n</div>\n</main>\n</div>\n</form>");
    html
}

/// Render already loaded question text for `exp_id`
pub fn render_text(
    text: &str,
    exp_id: &str,
    options: &RenderOptions,
) -> Result<RenderedSurvey, SurveyError> {
    let questions = parse_questions(text, options)?;
    let pages = render_pages(&questions, exp_id, options)?;
    let form_action = options.form_action.as_deref().unwrap_or("#");

    Ok(RenderedSurvey {
        html: form_html(&pages, exp_id, form_action),
        validation: script::validation_script(&pages),
        pages,
    })
}

/// Render `<folder>/survey.tsv` for a survey item
pub fn render_survey(
    manifest: &Manifest,
    folder: &Path,
    options: &RenderOptions,
) -> Result<RenderedSurvey, SurveyError> {
    let path = folder.join(SURVEY_FILE);
    let text = fs::read_to_string(&path).map_err(|source| SurveyError::Io {
        path: path.clone(),
        source,
    })?;

    let rendered = render_text(&text, &manifest.exp_id, options)?;
    tracing::debug!(
        survey = %manifest.exp_id,
        pages = rendered.pages.len(),
        "Rendered survey"
    );
    Ok(rendered)
}
