// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Check orchestration and the warning/termination seam.

use {
    crate::{
        bundle::AppBundle,
        error::AppStoreValidatorError,
        grace::{self, GracePeriodTimer, PreferencesStore, TimestampStore},
        inspect::SignatureInspector,
        provenance::{self, DetectionStrategy},
    },
    log::{debug, warn},
};

/// How the user responded to the blocking warning.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Acknowledgement {
    Acknowledged,
    Dismissed,
}

/// Collaborator owning the warning UI and process teardown.
///
/// The validator only decides *that* termination is warranted. Presenting
/// the alert, opening the App Store page, and exiting the process are
/// delegated, so hosts keep control of their UI toolkit and tests can
/// observe the outcome without a real process exit.
pub trait EnforcementDelegate {
    /// Present a blocking warning that the install is not from the App Store.
    fn present_blocking_warning(&self) -> Acknowledgement;

    /// Open an external URL, typically the application's App Store page.
    fn open_url(&self, url: &str) -> Result<(), AppStoreValidatorError>;

    /// Terminate the process with an exit code.
    fn terminate(&self, code: i32);
}

/// Static configuration for a validator instance.
///
/// Passed explicitly into constructors; there is no process-wide state,
/// so parallel instances with different configurations are fine.
#[derive(Clone, Debug, Default)]
pub struct ValidatorConfig {
    /// App Store application identifier used for the store page redirect.
    ///
    /// When empty, enforcement skips the redirect but still terminates.
    pub app_id: String,

    /// Preferences suite shared across an App Group, when set.
    ///
    /// Defaults to the bundle identifier.
    pub suite_name: Option<String>,
}

/// Build the App Store product page URL for an application ID.
pub fn app_store_page_url(app_id: &str) -> Option<String> {
    if app_id.is_empty() {
        None
    } else {
        Some(format!("https://apps.apple.com/cn/app/id{}", app_id))
    }
}

/// Validates App Store provenance of a bundle and enforces the outcome.
pub struct Validator<'a, S: TimestampStore> {
    config: ValidatorConfig,
    bundle: AppBundle,
    timer: GracePeriodTimer<S>,
    inspector: &'a dyn SignatureInspector,
    delegate: &'a dyn EnforcementDelegate,
}

impl<'a, S: TimestampStore> Validator<'a, S> {
    /// Construct a validator with explicit collaborators.
    pub fn new(
        config: ValidatorConfig,
        bundle: AppBundle,
        store: S,
        inspector: &'a dyn SignatureInspector,
        delegate: &'a dyn EnforcementDelegate,
    ) -> Self {
        Self {
            config,
            bundle,
            timer: GracePeriodTimer::new(store),
            inspector,
            delegate,
        }
    }

    /// Enforce once at least `days` days have passed since first launch.
    ///
    /// Before the grace period elapses this is a no-op (and the very
    /// first call only records the first-launch timestamp). Afterwards
    /// the receipt-and-owner heuristic runs; installs it classifies as
    /// App Store continue untouched, anything else is warned and
    /// terminated.
    pub fn check_after_days(&self, days: u32) {
        if !self.timer.should_enforce(days) {
            debug!("{} day grace period has not elapsed; skipping validation", days);
            return;
        }

        self.validate(DetectionStrategy::ReceiptAndOwner);
    }

    /// Enforce once the wall clock passes a fixed cutoff date.
    ///
    /// Uses the signature authority heuristic. An invalid cutoff date
    /// reports not expired and skips validation entirely.
    pub fn check_expiry_date(&self, year: i32, month: u32, day: u32) {
        if !grace::is_expired(year, month, day) {
            debug!(
                "cutoff {:04}-{:02}-{:02} has not passed; skipping validation",
                year, month, day
            );
            return;
        }

        self.validate(DetectionStrategy::SignatureAuthority);
    }

    fn validate(&self, strategy: DetectionStrategy) {
        let verdict = provenance::detect(strategy, &self.bundle, self.inspector);

        if verdict.is_app_store() {
            debug!("App Store provenance established via {:?}", strategy);
            return;
        }

        warn!(
            "no App Store provenance via {:?} (verdict {:?}); enforcing",
            strategy, verdict
        );
        self.enforce();
    }

    /// Warn, redirect to the App Store page, request termination.
    ///
    /// The redirect happens whether or not the warning was acknowledged,
    /// and a failed redirect never prevents termination.
    fn enforce(&self) {
        let ack = self.delegate.present_blocking_warning();
        debug!("warning {:?}", ack);

        match app_store_page_url(&self.config.app_id) {
            Some(url) => {
                if let Err(e) = self.delegate.open_url(&url) {
                    warn!("unable to open {}: {}", url, e);
                }
            }
            None => warn!("{}", AppStoreValidatorError::EmptyAppId),
        }

        self.delegate.terminate(0);
    }
}

impl<'a> Validator<'a, PreferencesStore> {
    /// Validator for the bundle containing the running executable.
    ///
    /// The timestamp suite is the configured suite name, falling back to
    /// the bundle identifier.
    pub fn for_host_bundle(
        config: ValidatorConfig,
        inspector: &'a dyn SignatureInspector,
        delegate: &'a dyn EnforcementDelegate,
    ) -> Result<Self, AppStoreValidatorError> {
        let bundle = AppBundle::host()?;

        let suite = match &config.suite_name {
            Some(name) => name.clone(),
            None => bundle.identifier().ok_or_else(|| {
                AppStoreValidatorError::BundleNoIdentifier(bundle.root_dir().to_path_buf())
            })?,
        };

        let store = PreferencesStore::new(&suite)?;

        Ok(Self::new(config, bundle, store, inspector, delegate))
    }
}
