//! Battery validation and generation endpoints

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use efx_common::battery::{generate, GenerateOptions};
use efx_common::validation::is_valid_identifier;
use efx_common::vm::{database_url, prepare_vm, specify_experiments, DatabaseSpec, DbPreset, VmType};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Database section of a deployment form
///
/// A preset wins over the explicit parts.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseForm {
    pub preset: Option<String>,
    pub dbtype: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub table: String,
}

impl DatabaseForm {
    fn spec(&self) -> ApiResult<DatabaseSpec> {
        match &self.preset {
            Some(preset) => Ok(DatabaseSpec::Preset(preset.parse::<DbPreset>()?)),
            None => Ok(DatabaseSpec::Explicit {
                dbtype: self.dbtype.clone(),
                username: self.username.clone(),
                password: self.password.clone(),
                host: self.host.clone(),
                table: self.table.clone(),
            }),
        }
    }
}

/// Body of `POST /battery/validate` and `POST /battery/generate`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeploymentRequest {
    /// Chosen identifiers; empty means every loaded item
    pub experiments: Vec<String>,
    /// `folder`, `vagrant` or `aws`
    pub deploy: Option<String>,
    /// Deployment config fields (`config.txt` keys or VM settings)
    pub config: BTreeMap<String, String>,
    pub database: Option<DatabaseForm>,
    /// Output folder name under the output root
    pub name: Option<String>,
}

/// Deployment settings after checking a request
#[derive(Debug, Serialize)]
pub struct DeploymentConfig {
    pub experiments: Vec<String>,
    pub database_url: Option<String>,
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub deploy: String,
    pub destination: PathBuf,
    pub experiments: Vec<String>,
    /// Source folders left out because they could not be copied
    pub skipped: Vec<PathBuf>,
}

fn resolve_deployment(state: &AppState, request: &DeploymentRequest) -> ApiResult<DeploymentConfig> {
    let experiments: Vec<String> = if request.experiments.is_empty() {
        state.items.iter().map(|item| item.exp_id().to_string()).collect()
    } else {
        request.experiments.clone()
    };

    let unknown: Vec<&str> = experiments
        .iter()
        .filter(|id| !state.lookup.contains_key(id.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Unknown experiments: {}",
            unknown.join(", ")
        )));
    }
    if experiments.is_empty() {
        return Err(ApiError::BadRequest("No experiments selected".to_string()));
    }

    let database_url = match &request.database {
        Some(form) => Some(database_url(&form.spec()?)?),
        None => None,
    };
    let mut config = request.config.clone();
    if let Some(url) = &database_url {
        config.insert("database_url".to_string(), url.clone());
    }

    Ok(DeploymentConfig {
        experiments,
        database_url,
        config,
    })
}

fn destination(state: &AppState, prefix: &str, name: Option<&str>) -> ApiResult<PathBuf> {
    match name {
        Some(name) if !is_valid_identifier(name) => Err(ApiError::BadRequest(format!(
            "'{}' is not a valid folder name",
            name
        ))),
        Some(name) => Ok(state.output_root.join(name)),
        None => Ok(state
            .output_root
            .join(format!("{}-{}", prefix, uuid::Uuid::new_v4()))),
    }
}

/// POST /battery/validate
pub async fn validate_battery(
    State(state): State<AppState>,
    Json(request): Json<DeploymentRequest>,
) -> ApiResult<Json<DeploymentConfig>> {
    Ok(Json(resolve_deployment(&state, &request)?))
}

/// POST /battery/generate
///
/// Copies run on a blocking thread; a VM deployment may clone its template
/// repository first.
pub async fn generate_battery(
    State(state): State<AppState>,
    Json(request): Json<DeploymentRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let deployment = resolve_deployment(&state, &request)?;
    let deploy = request.deploy.clone().unwrap_or_else(|| "folder".to_string());

    let response = if deploy == "folder" {
        let options = GenerateOptions {
            destination: destination(&state, "battery", request.name.as_deref())?,
            battery_repo: state.battery.clone(),
            content_repos: vec![state.base.clone()],
            selection: deployment.experiments,
            make_config: true,
            config: deployment.config,
            max_minutes: None,
            subject_id: None,
            warnings: false,
        };
        let battery = tokio::task::spawn_blocking(move || generate(&options))
            .await
            .map_err(|e| ApiError::Internal(format!("Battery task failed: {}", e)))??;

        GenerateResponse {
            deploy,
            experiments: battery.items.iter().map(|item| item.exp_id().to_string()).collect(),
            destination: battery.destination,
            skipped: battery.skipped,
        }
    } else {
        let vm_type: VmType = deploy.parse()?;
        let dest = destination(&state, "vm", request.name.as_deref())?;
        if dest.exists() {
            return Err(efx_common::Error::DestinationExists(dest).into());
        }
        tokio::fs::create_dir_all(&dest).await?;

        let experiments = deployment.experiments;
        let config = deployment.config;
        let task_dest = dest.clone();
        let task_experiments = experiments.clone();
        tokio::task::spawn_blocking(move || -> efx_common::Result<()> {
            prepare_vm(&task_dest, Some(&config), None, vm_type)?;
            specify_experiments(&task_dest, &task_experiments)?;
            Ok(())
        })
        .await
        .map_err(|e| ApiError::Internal(format!("VM task failed: {}", e)))??;

        GenerateResponse {
            deploy,
            destination: dest,
            experiments,
            skipped: Vec::new(),
        }
    };

    tracing::info!(
        deploy = %response.deploy,
        dest = %response.destination.display(),
        items = response.experiments.len(),
        "Generated deployment"
    );
    Ok(Json(response))
}
