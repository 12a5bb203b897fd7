//! Maintenance dialogs: factory reset, configuration backup, firmware update.
//!
//! Each request is validated synchronously before anything is submitted. The
//! work itself is delegated to a [`MaintenanceBackend`]; the shipped
//! [`SimulatedMaintenance`] just waits and reports success. The device
//! documents `POST /api/system/factory-reset`, `POST /api/system/backup` and
//! `POST /api/firmware/update`, but nothing here calls them.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Minimum length of a backup encryption password.
pub const MIN_BACKUP_PASSWORD_LEN: usize = 8;

/// Default delay of a simulated maintenance operation.
pub const SIMULATED_DELAY: Duration = Duration::from_millis(2000);

/// User input rejected by a dialog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please acknowledge that all settings will be lost")]
    ResetNotAcknowledged,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {MIN_BACKUP_PASSWORD_LEN} characters")]
    PasswordTooShort,
    #[error("please select a firmware image")]
    NoFirmwareImage,
    #[error("please acknowledge the firmware update risks")]
    FirmwareNotAcknowledged,
}

/// Restore factory defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactoryResetRequest {
    pub acknowledged: bool,
}

impl FactoryResetRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if !self.acknowledged {
            return Err(ValidationError::ResetNotAcknowledged);
        }
        Ok(())
    }
}

/// What a configuration backup contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    pub network: bool,
    pub security: bool,
    pub users: bool,
    pub applications: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            network: true,
            security: true,
            users: true,
            applications: true,
        }
    }
}

/// Download a configuration backup, optionally encrypted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupRequest {
    pub options: BackupOptions,
    /// Empty means an unencrypted backup.
    pub password: String,
    pub confirm_password: String,
}

impl BackupRequest {
    pub fn is_encrypted(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if !self.is_encrypted() {
            return Ok(());
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_BACKUP_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(())
    }
}

/// Flash a firmware image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareUpdateRequest {
    pub image: Option<PathBuf>,
    pub acknowledged: bool,
}

impl FirmwareUpdateRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.image.is_none() {
            return Err(ValidationError::NoFirmwareImage);
        }
        if !self.acknowledged {
            return Err(ValidationError::FirmwareNotAcknowledged);
        }
        Ok(())
    }
}

/// A maintenance request from one of the dialogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceAction {
    FactoryReset(FactoryResetRequest),
    Backup(BackupRequest),
    FirmwareUpdate(FirmwareUpdateRequest),
}

/// The dialog an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceKind {
    FactoryReset,
    Backup,
    FirmwareUpdate,
}

impl MaintenanceKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::FactoryReset => "Factory Reset",
            Self::Backup => "Backup Configuration",
            Self::FirmwareUpdate => "Firmware Update",
        }
    }
}

impl MaintenanceAction {
    pub fn kind(&self) -> MaintenanceKind {
        match self {
            Self::FactoryReset(_) => MaintenanceKind::FactoryReset,
            Self::Backup(_) => MaintenanceKind::Backup,
            Self::FirmwareUpdate(_) => MaintenanceKind::FirmwareUpdate,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        match self {
            Self::FactoryReset(r) => r.validate(),
            Self::Backup(r) => r.validate(),
            Self::FirmwareUpdate(r) => r.validate(),
        }
    }
}

/// Performs a validated maintenance action and returns a status message.
pub trait MaintenanceBackend: Send + Sync + 'static {
    fn perform(&self, action: MaintenanceAction) -> impl Future<Output = Result<String>> + Send;
}

/// Timer-only stand-in that always succeeds after `delay`.
#[derive(Debug, Clone)]
pub struct SimulatedMaintenance {
    delay: Duration,
}

impl SimulatedMaintenance {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedMaintenance {
    fn default() -> Self {
        Self::new(SIMULATED_DELAY)
    }
}

impl MaintenanceBackend for SimulatedMaintenance {
    async fn perform(&self, action: MaintenanceAction) -> Result<String> {
        action.validate()?;
        log::debug!("simulating {:?} for {:?}", action.kind(), self.delay);
        tokio::time::sleep(self.delay).await;
        let message = match action {
            MaintenanceAction::FactoryReset(_) => {
                "Factory reset initiated. The device will restart.".to_string()
            }
            MaintenanceAction::Backup(req) => {
                if req.is_encrypted() {
                    "Encrypted backup created.".to_string()
                } else {
                    "Backup created.".to_string()
                }
            }
            MaintenanceAction::FirmwareUpdate(req) => {
                let name = req
                    .image
                    .as_deref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("Firmware {name} uploaded. The device will restart.")
            }
        };
        Ok(message)
    }
}
