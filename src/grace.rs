// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! First-launch recording and expiry cutoffs.

use {
    crate::error::AppStoreValidatorError,
    chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime},
    log::{debug, warn},
    std::{
        path::{Path, PathBuf},
        time::{SystemTime, UNIX_EPOCH},
    },
};

/// Key under which the first observed launch time is stored.
pub const FIRST_LAUNCH_TIMESTAMP_KEY: &str = "FirstLaunchTimestamp";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Persistence for the first-launch timestamp.
///
/// A store is shared across processes that name the same suite, which is
/// how App Group members observe a common first launch.
pub trait TimestampStore {
    /// Read the recorded timestamp, if any.
    fn read(&self) -> Result<Option<f64>, AppStoreValidatorError>;

    /// Record a timestamp. Only called when nothing is recorded yet.
    fn write(&self, timestamp: f64) -> Result<(), AppStoreValidatorError>;
}

/// [TimestampStore] backed by a property list file in the user
/// preferences directory.
#[derive(Clone, Debug)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    /// Store for a named suite in the default preferences directory.
    pub fn new(suite_name: &str) -> Result<Self, AppStoreValidatorError> {
        let dir = dirs::preference_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no preferences directory for current user",
            )
        })?;

        Ok(Self {
            path: dir.join(format!("{}.plist", suite_name)),
        })
    }

    /// Store backed by an explicit plist path.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing plist file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_dictionary(&self) -> Result<plist::Dictionary, AppStoreValidatorError> {
        if !self.path.is_file() {
            return Ok(plist::Dictionary::new());
        }

        Ok(plist::Value::from_file(&self.path)
            .map_err(AppStoreValidatorError::PlistParse)?
            .into_dictionary()
            .unwrap_or_else(plist::Dictionary::new))
    }
}

impl TimestampStore for PreferencesStore {
    fn read(&self) -> Result<Option<f64>, AppStoreValidatorError> {
        Ok(self
            .read_dictionary()?
            .get(FIRST_LAUNCH_TIMESTAMP_KEY)
            .and_then(|value| value.as_real()))
    }

    fn write(&self, timestamp: f64) -> Result<(), AppStoreValidatorError> {
        // Preserve unrelated keys so a shared suite file isn't clobbered.
        let mut dict = self.read_dictionary()?;
        dict.insert(
            FIRST_LAUNCH_TIMESTAMP_KEY.to_string(),
            plist::Value::Real(timestamp),
        );

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        plist::Value::Dictionary(dict)
            .to_file_xml(&self.path)
            .map_err(AppStoreValidatorError::PlistSerialize)
    }
}

/// Tracks days elapsed since the first observed launch.
pub struct GracePeriodTimer<S: TimestampStore> {
    store: S,
}

impl<S: TimestampStore> GracePeriodTimer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether at least `days` whole days have passed since first launch.
    ///
    /// The very first call records the current time and reports false: a
    /// grace period cannot have elapsed at the instant it starts. The
    /// recorded value is never rewritten afterwards, so it anchors "days
    /// since first launch" for the lifetime of the store. Store failures
    /// also report false, since elapsed time cannot be proven.
    pub fn should_enforce(&self, days: u32) -> bool {
        self.should_enforce_at(days, unix_now())
    }

    fn should_enforce_at(&self, days: u32, now: f64) -> bool {
        match self.store.read() {
            Ok(Some(first_launch)) if first_launch > 0.0 => {
                let elapsed_days = ((now - first_launch) / SECONDS_PER_DAY).floor() as i64;
                debug!("{} whole days since first launch", elapsed_days);

                elapsed_days >= i64::from(days)
            }
            Ok(_) => {
                debug!("recording first launch timestamp {}", now);

                if let Err(e) = self.store.write(now) {
                    warn!("unable to record first launch: {}", e);
                }

                false
            }
            Err(e) => {
                warn!("unable to read first launch timestamp: {}", e);

                false
            }
        }
    }
}

/// Whether the wall clock has passed a fixed cutoff date.
///
/// The cutoff is local midnight at the start of the given day and the
/// comparison is strict, so the boundary instant itself has not expired.
/// Components that do not form a real calendar date report not expired:
/// a malformed cutoff must not lock out a working install.
pub fn is_expired(year: i32, month: u32, day: u32) -> bool {
    is_expired_at(year, month, day, Local::now().naive_local())
}

fn is_expired_at(year: i32, month: u32, day: u32, now: NaiveDateTime) -> bool {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => now > date.and_time(NaiveTime::MIN),
        None => {
            warn!(
                "{}",
                AppStoreValidatorError::InvalidCutoffDate { year, month, day }
            );

            false
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
