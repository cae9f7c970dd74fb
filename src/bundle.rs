// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The application bundle being validated.

use {
    crate::error::AppStoreValidatorError,
    std::path::{Path, PathBuf},
};

/// Location of the App Store purchase receipt relative to `Contents/`.
///
/// The App Store drops the receipt here at install time.
const RECEIPT_RELATIVE_PATH: &str = "_MASReceipt/receipt";

/// A macOS application bundle backed by a filesystem directory.
///
/// Only deep (`Contents/`) bundles are modeled, which is what `.app`
/// bundles on macOS are.
#[derive(Clone, Debug)]
pub struct AppBundle {
    /// Root directory of the bundle.
    root: PathBuf,

    /// Parsed `Info.plist` file.
    info_plist: plist::Dictionary,
}

impl AppBundle {
    /// Open an existing bundle from a filesystem path.
    ///
    /// The specified path should be the root directory of the bundle.
    /// Validation is limited to locating and parsing `Contents/Info.plist`,
    /// which every application bundle carries.
    pub fn new_from_path(directory: &Path) -> Result<Self, AppStoreValidatorError> {
        if !directory.is_dir() {
            return Err(AppStoreValidatorError::BundleNotFound(
                directory.to_path_buf(),
            ));
        }

        let info_plist_path = directory.join("Contents").join("Info.plist");

        if !info_plist_path.is_file() {
            return Err(AppStoreValidatorError::BundleNotFound(
                directory.to_path_buf(),
            ));
        }

        let info_plist_data = std::fs::read(&info_plist_path)?;
        let cursor = std::io::Cursor::new(info_plist_data);
        let value =
            plist::Value::from_reader(cursor).map_err(AppStoreValidatorError::PlistParse)?;
        let info_plist = value
            .into_dictionary()
            .ok_or_else(|| AppStoreValidatorError::BundleNotFound(directory.to_path_buf()))?;

        Ok(Self {
            root: directory.to_path_buf(),
            info_plist,
        })
    }

    /// Resolve the bundle containing the running executable.
    ///
    /// Walks up from [std::env::current_exe] to the nearest `.app`
    /// ancestor. Errors when the executable does not live inside an
    /// application bundle, e.g. when run from a build directory.
    pub fn host() -> Result<Self, AppStoreValidatorError> {
        let exe = std::env::current_exe()?;

        let mut current = exe.as_path();

        while let Some(parent) = current.parent() {
            if parent.extension().map_or(false, |ext| ext == "app") {
                return Self::new_from_path(parent);
            }

            current = parent;
        }

        Err(AppStoreValidatorError::BundleNotFound(exe))
    }

    /// The root directory of this bundle.
    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    /// Resolve the absolute path to a file under `Contents/`.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join("Contents").join(path.as_ref())
    }

    /// Obtain the parsed `Info.plist` file.
    pub fn info_plist(&self) -> &plist::Dictionary {
        &self.info_plist
    }

    /// Obtain an `Info.plist` key as a `String`.
    ///
    /// Returns `None` if the key doesn't exist or its value is not a string.
    pub fn info_plist_key_string(&self, key: &str) -> Option<String> {
        self.info_plist
            .get(key)
            .and_then(|value| value.as_string())
            .map(|value| value.to_string())
    }

    /// Obtain the bundle identifier.
    ///
    /// This retrieves `CFBundleIdentifier` from the `Info.plist`.
    pub fn identifier(&self) -> Option<String> {
        self.info_plist_key_string("CFBundleIdentifier")
    }

    /// Obtain the name of the bundle's main executable file.
    ///
    /// This retrieves `CFBundleExecutable` from the `Info.plist`.
    pub fn main_executable(&self) -> Option<String> {
        self.info_plist_key_string("CFBundleExecutable")
    }

    /// Path where the App Store purchase receipt lives, when present.
    pub fn receipt_path(&self) -> PathBuf {
        self.resolve_path(RECEIPT_RELATIVE_PATH)
    }

    /// Resolve the absolute path to the bundle's main executable.
    ///
    /// Errors if the `Info.plist` does not define `CFBundleExecutable`.
    /// The returned path is not verified to exist.
    pub fn main_executable_path(&self) -> Result<PathBuf, AppStoreValidatorError> {
        let name = self.main_executable().ok_or_else(|| {
            AppStoreValidatorError::BundleNoMainExecutable(self.root.clone())
        })?;

        Ok(self.resolve_path(Path::new("MacOS").join(name)))
    }
}
