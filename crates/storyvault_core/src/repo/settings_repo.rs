//! Settings repository contract and file-store implementation.
//!
//! # Invariants
//! - Reading settings never returns "nothing": a missing file is seeded
//!   with defaults for the store's base directory.

use crate::model::settings::Settings;
use crate::store::{FileStore, StoreResult};
use log::info;

pub trait SettingsRepository {
    /// Reads settings, writing defaults first when none exist yet.
    fn read_settings(&self) -> StoreResult<Settings>;
    /// Validates then atomically replaces settings.
    fn write_settings(&self, settings: &Settings) -> StoreResult<()>;
}

impl<T: SettingsRepository + ?Sized> SettingsRepository for &T {
    fn read_settings(&self) -> StoreResult<Settings> {
        (**self).read_settings()
    }

    fn write_settings(&self, settings: &Settings) -> StoreResult<()> {
        (**self).write_settings(settings)
    }
}

impl SettingsRepository for FileStore {
    fn read_settings(&self) -> StoreResult<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            let defaults = Settings::defaults_for(self.base_dir());
            self.write_settings(&defaults)?;
            info!("event=settings_seed module=repo status=ok");
            return Ok(defaults);
        }
        self.read_record(&path, |settings: &Settings| {
            settings.validate().map_err(Into::into)
        })
    }

    fn write_settings(&self, settings: &Settings) -> StoreResult<()> {
        let path = self.settings_path();
        self.write_record(&path, settings, settings.validate().map_err(Into::into))
    }
}
