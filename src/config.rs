use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

pub fn app_paths(override_home: Option<PathBuf>) -> Result<AppPaths> {
    if let Some(home) = override_home {
        return Ok(AppPaths {
            data_dir: home.join("data"),
        });
    }

    let proj = ProjectDirs::from("com", "finshell", "finshell")
        .context("Failed to resolve platform directories")?;

    Ok(AppPaths {
        data_dir: proj.data_dir().to_path_buf(),
    })
}

impl AppPaths {
    pub fn db_path(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create data dir {}", self.data_dir.display()))?;
        Ok(self.data_dir.join("finshell.sqlite3"))
    }
}

/// All timestamps in the ledger are naive local time.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
