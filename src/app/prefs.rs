use anyhow::Context;

use crate::{ArcPath, fs::Fs, log::Log};

const SCOPE: &str = "app.prefs";
const DARK_MODE: &str = "darkMode";

/// Durable user preferences, a flat TOML table of strings.
///
/// Only the display theme lives here, stored under `darkMode` as `"true"` or
/// `"false"`. Other keys found in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct Prefs {
    fs: Fs,
    log: Log,
    path: ArcPath,
}

impl Prefs {
    pub fn new(fs: Fs, log: Log, path: ArcPath) -> Self {
        Self { fs, log, path }
    }

    async fn table(&self) -> anyhow::Result<toml::Table> {
        let content = match self.fs.read_to_string(self.path.clone()).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Reading prefs from {:?}", self.path));
            }
        };
        toml::from_str(&content).with_context(|| format!("Parsing prefs at {:?}", self.path))
    }

    /// Whether the dark theme is on. Anything but `"true"` reads as off,
    /// and so does an unreadable file.
    pub async fn dark_mode(&self) -> bool {
        match self.table().await {
            Ok(table) => table.get(DARK_MODE).and_then(|v| v.as_str()) == Some("true"),
            Err(e) => {
                self.log.warn(SCOPE, format!("{e:#}"));
                false
            }
        }
    }

    pub async fn set_dark_mode(&self, on: bool) -> anyhow::Result<()> {
        // A corrupt file is replaced rather than kept
        let mut table = self.table().await.unwrap_or_default();
        table.insert(DARK_MODE.to_string(), on.to_string().into());
        let content = toml::to_string(&table).context("Serializing prefs")?;
        self.fs
            .write_string(self.path.clone(), content)
            .await
            .with_context(|| format!("Writing prefs to {:?}", self.path))?;
        self.log.info(SCOPE, format!("{DARK_MODE} set to {on}"));
        Ok(())
    }
}
