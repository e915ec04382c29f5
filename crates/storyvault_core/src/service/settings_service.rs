//! Settings state store with optimistic updates.

use crate::model::settings::{Settings, SettingsPatch, SettingsValidationError};
use crate::repo::settings_repo::SettingsRepository;
use crate::store::StoreError;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SettingsServiceError {
    /// `update` was called before `load`.
    NotLoaded,
    /// Merged settings violate an invariant; nothing was applied.
    Invalid(SettingsValidationError),
    /// Persistence failed; in-memory settings were rolled back.
    Store(StoreError),
}

impl Display for SettingsServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "settings have not been loaded"),
            Self::Invalid(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotLoaded => None,
            Self::Invalid(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for SettingsServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub struct SettingsService<R: SettingsRepository> {
    repo: R,
    current: Option<Settings>,
}

impl<R: SettingsRepository> SettingsService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            current: None,
        }
    }

    pub fn load(&mut self) -> Result<&Settings, SettingsServiceError> {
        let settings = self.repo.read_settings()?;
        Ok(self.current.insert(settings))
    }

    pub fn current(&self) -> Option<&Settings> {
        self.current.as_ref()
    }

    /// Merges `patch` into the current settings and persists the result.
    ///
    /// The in-memory value only changes after a successful write, so a
    /// failed save leaves the previous settings in place.
    pub fn update(&mut self, patch: &SettingsPatch) -> Result<&Settings, SettingsServiceError> {
        let merged = self
            .current
            .as_ref()
            .ok_or(SettingsServiceError::NotLoaded)?
            .apply(patch);
        merged.validate().map_err(SettingsServiceError::Invalid)?;

        if let Err(err) = self.repo.write_settings(&merged) {
            error!(
                "event=settings_save module=service status=error error_kind={}",
                err.kind()
            );
            return Err(err.into());
        }

        info!("event=settings_save module=service status=ok");
        Ok(self.current.insert(merged))
    }

    /// Switches between light and dark theme and persists the choice.
    pub fn toggle_theme(&mut self) -> Result<&Settings, SettingsServiceError> {
        let theme = self
            .current
            .as_ref()
            .ok_or(SettingsServiceError::NotLoaded)?
            .theme
            .toggled();
        self.update(&SettingsPatch {
            theme: Some(theme),
            ..SettingsPatch::default()
        })
    }
}
