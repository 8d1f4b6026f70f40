//! Template bundle import

use std::path::{Path, PathBuf};

use plugwatch_api::{ConfigurationImport, ImportFormat, ImportRules};
use plugwatch_client::{ManagementApi, SessionHandle};
use tracing::{error, info, instrument};

use crate::outcome::ImportOutcome;

/// Template bundle read from disk, forwarded to the server verbatim
#[derive(Debug, Clone)]
pub struct TemplateBundle {
    pub path: PathBuf,
    pub format: ImportFormat,
    pub source: String,
}

impl TemplateBundle {
    /// Read a bundle, taking its format from the file extension
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be read.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let source = tokio::fs::read_to_string(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            format: ImportFormat::from_path(path),
            source,
        })
    }
}

/// Import the bundle at `path` with merge-style rules
///
/// Failures are logged and reported as [`ImportOutcome::Failed`]; host
/// reconciliation runs regardless.
#[instrument(skip(api, session, rules))]
pub async fn import_template(
    api: &dyn ManagementApi,
    session: &SessionHandle,
    path: Option<&Path>,
    rules: &ImportRules,
) -> ImportOutcome {
    let Some(path) = path else {
        info!("no template bundle configured");
        return ImportOutcome::Skipped;
    };

    let bundle = match TemplateBundle::read(path).await {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(template = %path.display(), error = %e, "cannot read template bundle");
            return ImportOutcome::Failed {
                template: path.to_path_buf(),
                reason: e.to_string(),
            };
        }
    };

    let import = ConfigurationImport {
        format: bundle.format,
        source: bundle.source,
        rules: *rules,
    };

    match api.import_configuration(session, &import).await {
        Ok(()) => {
            info!(template = %path.display(), "template bundle imported");
            ImportOutcome::Imported {
                template: bundle.path,
            }
        }
        Err(e) => {
            error!(template = %path.display(), error = %e, "template import failed");
            ImportOutcome::Failed {
                template: bundle.path,
                reason: e.to_string(),
            }
        }
    }
}
