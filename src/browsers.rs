use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Chromium-family browsers whose `Bookmarks` file can be sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserType {
    Chrome,
    Chromium,
    Brave,
    BraveNightly,
    Edge,
    Vivaldi,
}

impl BrowserType {
    pub fn all() -> &'static [BrowserType] {
        &[
            BrowserType::Chrome,
            BrowserType::Chromium,
            BrowserType::Brave,
            BrowserType::BraveNightly,
            BrowserType::Edge,
            BrowserType::Vivaldi,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BrowserType::Chrome => "Chrome",
            BrowserType::Chromium => "Chromium",
            BrowserType::Brave => "Brave",
            BrowserType::BraveNightly => "Brave Nightly",
            BrowserType::Edge => "Edge",
            BrowserType::Vivaldi => "Vivaldi",
        }
    }

    /// Parse a browser name as typed on the command line.
    pub fn parse(name: &str) -> Option<BrowserType> {
        match name.trim().to_lowercase().as_str() {
            "chrome" => Some(BrowserType::Chrome),
            "chromium" => Some(BrowserType::Chromium),
            "brave" => Some(BrowserType::Brave),
            "brave-nightly" | "bravenightly" => Some(BrowserType::BraveNightly),
            "edge" => Some(BrowserType::Edge),
            "vivaldi" => Some(BrowserType::Vivaldi),
            _ => None,
        }
    }

    /// User data directory relative to the platform config root.
    fn user_data_dir(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        {
            match self {
                BrowserType::Chrome => "Google/Chrome",
                BrowserType::Chromium => "Chromium",
                BrowserType::Brave => "BraveSoftware/Brave-Browser",
                BrowserType::BraveNightly => "BraveSoftware/Brave-Browser-Nightly",
                BrowserType::Edge => "Microsoft Edge",
                BrowserType::Vivaldi => "Vivaldi",
            }
        }

        #[cfg(not(target_os = "macos"))]
        {
            match self {
                BrowserType::Chrome => "google-chrome",
                BrowserType::Chromium => "chromium",
                BrowserType::Brave => "BraveSoftware/Brave-Browser",
                BrowserType::BraveNightly => "BraveSoftware/Brave-Browser-Nightly",
                BrowserType::Edge => "microsoft-edge",
                BrowserType::Vivaldi => "vivaldi",
            }
        }
    }

    pub fn profile_root(&self) -> Result<PathBuf> {
        Ok(config_root()?.join(self.user_data_dir()))
    }
}

fn config_root() -> Result<PathBuf> {
    let home = PathBuf::from(std::env::var("HOME").context("HOME is not set")?);

    #[cfg(target_os = "macos")]
    {
        Ok(home.join("Library/Application Support"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        Ok(std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config")))
    }
}

/// A `Bookmarks` file found under a browser profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedProfile {
    pub browser: BrowserType,
    pub profile: String,
    pub bookmarks: PathBuf,
}

/// Find the `Bookmarks` files of every profile below `root`
/// (`Default`, `Profile 1`, ...).
pub fn find_bookmark_files(browser: BrowserType, root: &Path) -> Vec<DetectedProfile> {
    if !root.is_dir() {
        debug!("{} not found at {:?}", browser.name(), root);
        return Vec::new();
    }

    let mut found: Vec<DetectedProfile> = WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == "Bookmarks")
        .filter_map(|entry| {
            let profile = entry.path().parent()?.file_name()?.to_string_lossy().into_owned();
            Some(DetectedProfile {
                browser,
                profile,
                bookmarks: entry.into_path(),
            })
        })
        .collect();

    found.sort_by(|a, b| a.profile.cmp(&b.profile));
    debug!("Found {} {} profiles", found.len(), browser.name());
    found
}

/// Detect profiles of every supported browser.
pub fn detect_all() -> Result<Vec<DetectedProfile>> {
    let mut detected = Vec::new();
    for browser in BrowserType::all() {
        detected.extend(find_bookmark_files(*browser, &browser.profile_root()?));
    }
    Ok(detected)
}

/// Resolve the `Bookmarks` file of `browser`'s `profile`.
pub fn locate_bookmarks(browser: BrowserType, profile: &str) -> Result<PathBuf> {
    let root = browser.profile_root()?;
    find_bookmark_files(browser, &root)
        .into_iter()
        .find(|p| p.profile == profile)
        .map(|p| p.bookmarks)
        .with_context(|| format!("{} profile {:?} has no Bookmarks file under {:?}", browser.name(), profile, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_browser_names() {
        assert_eq!(BrowserType::parse("Chrome"), Some(BrowserType::Chrome));
        assert_eq!(BrowserType::parse(" brave-nightly "), Some(BrowserType::BraveNightly));
        assert_eq!(BrowserType::parse("safari"), None);
    }

    #[test]
    fn test_find_bookmark_files() {
        let dir = TempDir::new().unwrap();
        for profile in ["Default", "Profile 1", "System Profile"] {
            std::fs::create_dir_all(dir.path().join(profile)).unwrap();
        }
        std::fs::write(dir.path().join("Default").join("Bookmarks"), "{}").unwrap();
        std::fs::write(dir.path().join("Profile 1").join("Bookmarks"), "{}").unwrap();
        std::fs::write(dir.path().join("Bookmarks"), "{}").unwrap();

        let found = find_bookmark_files(BrowserType::Chrome, dir.path());
        let profiles: Vec<_> = found.iter().map(|p| p.profile.as_str()).collect();
        assert_eq!(profiles, vec!["Default", "Profile 1"]);
        assert!(found[0].bookmarks.ends_with("Default/Bookmarks"));
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(find_bookmark_files(BrowserType::Brave, &dir.path().join("nope")).is_empty());
    }
}
