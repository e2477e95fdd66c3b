//! Static web site listing every valid content item with demo pages

use csv::WriterBuilder;
use rand::Rng;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::battery::move_items;
use crate::files::{clean_up, copy_directory};
use crate::manifest::ItemKind;
use crate::page::{render_item_page, Deployment};
use crate::selection::{load_valid, ContentItem};
use crate::template::{save_template, Substitutions};
use crate::validation::ValidateOptions;
use crate::{Error, Result};

const TABLE_PAGE: &str = include_str!("../templates/table.html");
const INDEX_PAGE: &str = include_str!("../templates/index.html");

/// Columns of the item table and data exports
pub const TABLE_FIELDS: [&str; 6] = [
    "preview",
    "exp_id",
    "template",
    "contributors",
    "time",
    "cognitive_atlas_task_id",
];

pub const DATA_STEM: &str = "expfactory-experiments";

/// Content and skeleton folders feeding the site
#[derive(Debug, Clone, Default)]
pub struct SiteSources {
    /// Battery skeleton providing `static/` (and optionally `templates/`)
    pub battery: PathBuf,
    pub experiments: Option<PathBuf>,
    pub surveys: Option<PathBuf>,
    pub games: Option<PathBuf>,
}

impl SiteSources {
    fn repos(&self) -> Vec<(ItemKind, &Path)> {
        [
            (ItemKind::Experiments, &self.experiments),
            (ItemKind::Surveys, &self.surveys),
            (ItemKind::Games, &self.games),
        ]
        .into_iter()
        .filter_map(|(kind, repo)| repo.as_deref().map(|path| (kind, path)))
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub make_table: bool,
    pub make_index: bool,
    pub make_pages: bool,
    pub make_data: bool,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            make_table: true,
            make_index: true,
            make_pages: true,
            make_data: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SiteSummary {
    pub items: usize,
    pub pages: usize,
    pub skipped: Vec<PathBuf>,
}

/// Table cell text for one manifest field
fn field_text(item: &ContentItem, field: &str) -> String {
    if field == "preview" {
        return format!("<a href=\"{}.html\" target=\"_blank\">DEMO</a>", item.exp_id());
    }
    match item.manifest.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// `<table>` markup for the item table page
pub fn render_table(items: &[ContentItem]) -> String {
    let mut table = String::from("<table id=\"fresh-table\" class=\"table\">\n<thead>\n");
    for field in TABLE_FIELDS {
        table.push_str(&format!(
            "<th data-field=\"{}\" data-sortable=\"true\">{}</th>",
            field, field
        ));
    }
    table.push_str("\n</thead>\n<tbody>\n");
    for item in items {
        table.push_str("<tr>\n");
        for field in TABLE_FIELDS {
            table.push_str(&format!("<td>{}</td>\n", field_text(item, field)));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</tbody></table>\n");
    table
}

/// Node list for the index visualisation, one randomly coloured node per item
pub fn render_nodes(items: &[ContentItem]) -> String {
    let mut rng = rand::thread_rng();
    items
        .iter()
        .map(|item| {
            format!(
                "{{\"cluster\": 1, \"radius\": \"10\", \"color\": colors[{}], \"exp_id\": \"{}\" }}",
                rng.gen_range(0..3),
                item.exp_id()
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Records for `data/expfactory-experiments.json`
pub fn data_records(items: &[ContentItem]) -> Vec<Map<String, Value>> {
    items
        .iter()
        .map(|item| {
            TABLE_FIELDS
                .iter()
                .map(|field| (field.to_string(), Value::String(field_text(item, field))))
                .collect()
        })
        .collect()
}

/// Tab-separated export with a header row
pub fn data_tsv(items: &[ContentItem]) -> Result<String> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(Vec::new());
    writer.write_record(TABLE_FIELDS)?;
    for item in items {
        writer.write_record(TABLE_FIELDS.iter().map(|field| field_text(item, field)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::Internal(format!("TSV export is not UTF-8: {}", e)))
}

/// Write the site into `output` (created if missing, refreshed otherwise)
pub fn generate_site(output: &Path, sources: &SiteSources, options: &SiteOptions) -> Result<SiteSummary> {
    fs::create_dir_all(output)?;
    let quiet = ValidateOptions::quiet();

    let mut items = Vec::new();
    for (kind, repo) in sources.repos() {
        let found = load_valid(repo, &quiet)?;
        tracing::info!(kind = kind.namespace(), count = found.len(), "Collected site items");
        items.extend(found);
    }

    for folder in ["templates", "static"] {
        let from = sources.battery.join(folder);
        let to = output.join(folder);
        if from.is_dir() {
            clean_up(&to)?;
            copy_directory(&from, &to)?;
        }
    }
    let favicon = sources.battery.join("static").join("favicon.ico");
    if favicon.is_file() {
        fs::copy(&favicon, output.join("favicon.ico"))?;
    }

    for kind in ItemKind::ALL {
        clean_up(&output.join("static").join(kind.namespace()))?;
    }
    let (items, skipped) = move_items(&items, output);

    if options.make_index {
        let index = Substitutions::new()
            .with("[SUB_NODES_SUB]", render_nodes(&items))
            .with("[SUB_TOTAL_SUB]", items.len().to_string())
            .apply(INDEX_PAGE);
        save_template(&output.join("index.html"), &index)?;
    }

    if options.make_table {
        let table = Substitutions::new()
            .with("[[SUB_TABLE_SUB]]", render_table(&items))
            .apply(TABLE_PAGE);
        save_template(&output.join("table.html"), &table)?;
    }

    let mut pages = 0;
    if options.make_pages {
        for item in &items {
            match render_item_page(&item.manifest, &item.folder, "", Deployment::Local) {
                Ok(page) => {
                    save_template(&output.join(format!("{}.html", item.exp_id())), &page)?;
                    pages += 1;
                }
                Err(e) => {
                    tracing::warn!(item = %item.exp_id(), error = %e, "No demo page for item");
                }
            }
        }
    }

    if options.make_data {
        let data = output.join("data");
        fs::create_dir_all(&data)?;
        let json = serde_json::to_string_pretty(&data_records(&items))?;
        save_template(&data.join(format!("{}.json", DATA_STEM)), &json)?;
        save_template(&data.join(format!("{}.tsv", DATA_STEM)), &data_tsv(&items)?)?;
    }

    tracing::info!(output = %output.display(), items = items.len(), pages, "Generated site");
    Ok(SiteSummary {
        items: items.len(),
        pages,
        skipped,
    })
}
