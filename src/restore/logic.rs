// restoretool/src/restore/logic.rs
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::errors::{RestoreError, Result};
use crate::restore::archive::{StagingDir, extract_archive};
use crate::restore::components::{ComponentReport, ComponentRestorer};
use crate::restore::confirm::{ConfirmationGate, render_plan};
use crate::restore::manifest::{Component, Manifest, verify_manifest};

/// Lifecycle of a single restore run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    Idle,
    Extracted,
    Verified,
    Confirmed,
    Declined,
    Restoring(Component),
    Failed,
    Cleaned,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Completed(Vec<ComponentReport>),
    /// The operator answered anything but yes. Not an error.
    Declined,
}

impl RestoreOutcome {
    pub fn exit_code(&self) -> u8 {
        0
    }
}

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Fixed root under which the per-run staging directory is created.
    pub temp_root: PathBuf,
    /// Skip the interactive prompt (the plan is still printed).
    pub auto_confirm: bool,
    /// Engine description shown in the plan for the database component.
    pub database_engine: String,
}

/// Sequences extraction, verification, confirmation and the component restorers,
/// and removes the staging directory on every path.
pub struct RestoreOrchestrator {
    options: RestoreOptions,
    restorers: Vec<Box<dyn ComponentRestorer>>,
    state: RestoreState,
    staging: Option<StagingDir>,
    manifest: Option<Manifest>,
}

impl RestoreOrchestrator {
    pub fn new(options: RestoreOptions, restorers: Vec<Box<dyn ComponentRestorer>>) -> Self {
        RestoreOrchestrator {
            options,
            restorers,
            state: RestoreState::Idle,
            staging: None,
            manifest: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> RestoreState {
        self.state
    }

    fn require(&self, expected: RestoreState, action: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(RestoreError::InvalidTransition {
                action,
                state: format!("{:?}", self.state),
            });
        }
        Ok(())
    }

    /// Idle -> Extracted
    pub fn extract(&mut self, archive_path: &Path) -> Result<()> {
        self.require(RestoreState::Idle, "extract")?;
        println!("📦 Extracting archive {}...", archive_path.display());

        let staging = extract_archive(archive_path, &self.options.temp_root)?;
        println!("✓ Archive extracted to {}", staging.root().display());

        self.staging = Some(staging);
        self.state = RestoreState::Extracted;
        Ok(())
    }

    /// Extracted -> Verified
    pub fn verify(&mut self) -> Result<&Manifest> {
        self.require(RestoreState::Extracted, "verify")?;
        let staged_root = self.staged_root()?;
        println!("🔍 Verifying manifest...");

        let manifest = verify_manifest(&staged_root)?;
        println!(
            "✓ Manifest verified: {} backup from {} with {} component(s)",
            manifest.backup_type,
            manifest.timestamp.to_rfc3339(),
            manifest.components.enabled().len()
        );

        self.state = RestoreState::Verified;
        Ok(&*self.manifest.insert(manifest))
    }

    /// Verified -> Confirmed, or Verified -> Declined.
    pub fn confirm(&mut self, gate: &mut dyn ConfirmationGate) -> Result<bool> {
        self.require(RestoreState::Verified, "confirm")?;
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| RestoreError::InvalidManifest("manifest not loaded".to_string()))?;

        println!("{}", render_plan(manifest, &self.options.database_engine));

        let confirmed = if self.options.auto_confirm {
            println!("✓ Auto-confirm enabled, skipping prompt");
            true
        } else {
            gate.confirm(manifest)?
        };

        if confirmed {
            println!("✓ Restore confirmed");
            self.state = RestoreState::Confirmed;
        } else {
            println!("Restore cancelled by operator. No changes were made.");
            self.state = RestoreState::Declined;
        }
        Ok(confirmed)
    }

    /// Restorers for the flagged components, in canonical order.
    fn planned_components(&self, manifest: &Manifest) -> Result<Vec<usize>> {
        Component::ORDER
            .into_iter()
            .filter(|component| manifest.components.includes(*component))
            .map(|component| {
                self.restorers
                    .iter()
                    .position(|r| r.component() == component)
                    .ok_or(RestoreError::MissingRestorer(component))
            })
            .collect()
    }

    /// Confirmed -> Restoring(component)... The first fatal error moves to Failed.
    pub async fn restore_components(&mut self) -> Result<Vec<ComponentReport>> {
        self.require(RestoreState::Confirmed, "restore")?;
        let staged_root = self.staged_root()?;
        let manifest = self
            .manifest
            .clone()
            .ok_or_else(|| RestoreError::InvalidManifest("manifest not loaded".to_string()))?;

        let plan = match self.planned_components(&manifest) {
            Ok(plan) => plan,
            Err(e) => {
                self.state = RestoreState::Failed;
                return Err(e);
            }
        };

        let mut reports = Vec::with_capacity(plan.len());
        for index in plan {
            let restorer = &self.restorers[index];
            let component = restorer.component();
            self.state = RestoreState::Restoring(component);
            println!("\n🔄 Restoring {}...", component);

            match restorer.restore(&staged_root).await {
                Ok(report) => {
                    println!("✅ {}", report.summary());
                    reports.push(report);
                }
                Err(e) if !e.is_fatal() && restorer.continues_on_item_failure() => {
                    warn!("{} continued past a non-fatal error: {}", component, e);
                    println!("⚠️ {} skipped: {}", component, e);
                    reports.push(ComponentReport::skipped(component, e.to_string()));
                }
                Err(e) => {
                    error!("{} restore failed: {}", component, e);
                    println!("❌ {} restore failed: {}", component, e);
                    self.state = RestoreState::Failed;
                    return Err(e);
                }
            }
        }
        Ok(reports)
    }

    /// Removes the staging directory. Never fails; problems are logged.
    pub fn cleanup(&mut self) {
        if let Some(staging) = self.staging.take() {
            println!("🧹 Removing staging directory {}...", staging.path().display());
            match staging.cleanup() {
                Ok(()) => println!("✓ Staging directory removed"),
                Err(e) => {
                    warn!("{}", e);
                    eprintln!("⚠️ {}", e);
                }
            }
        }
        self.state = RestoreState::Cleaned;
    }

    /// Runs every stage in order. Cleanup always runs before this returns.
    pub async fn run(
        &mut self,
        archive_path: &Path,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<RestoreOutcome> {
        let result = self.drive(archive_path, gate).await;
        if result.is_err() {
            self.state = RestoreState::Failed;
        }
        self.cleanup();

        if let Ok(RestoreOutcome::Completed(_)) = &result {
            self.state = RestoreState::Done;
            info!("Restore of {} completed", archive_path.display());
        }
        result
    }

    async fn drive(
        &mut self,
        archive_path: &Path,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<RestoreOutcome> {
        self.extract(archive_path)?;
        self.verify()?;
        if !self.confirm(gate)? {
            return Ok(RestoreOutcome::Declined);
        }
        let reports = self.restore_components().await?;
        Ok(RestoreOutcome::Completed(reports))
    }

    fn staged_root(&self) -> Result<PathBuf> {
        self.staging
            .as_ref()
            .map(|s| s.root().to_path_buf())
            .ok_or_else(|| RestoreError::Extraction("no staged archive".to_string()))
    }
}
