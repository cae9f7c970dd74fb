// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mac App Store source validation.
//!
//! This crate determines whether the host application was installed
//! through the Mac App Store and, once a grace period has elapsed or a
//! fixed cutoff date has passed without App Store provenance, decides
//! that a blocking warning should be shown and the process terminated.
//!
//! # Features and Capabilities
//!
//! This crate can:
//!
//! * Resolve the application bundle containing the running executable
//!   and the conventional paths inside it. (See [AppBundle].)
//! * Test for the presence of the App Store purchase receipt. (See
//!   [receipt_present].)
//! * Classify the install from the owner account of the main executable.
//!   (See [likely_from_app_store_by_receipt] and
//!   [owned_by_developer_account] for the two failure polarities.)
//! * Parse the signing certificate authority chain reported by the
//!   system `codesign` tool, behind a pluggable [SignatureInspector] so
//!   tests never spawn subprocesses. (See [signature_authority].)
//! * Record a first-launch timestamp in a shared preferences suite and
//!   compute whole days elapsed since. (See [GracePeriodTimer].)
//! * Orchestrate the whole check via [Validator::check_after_days] and
//!   [Validator::check_expiry_date], delegating the alert, the App Store
//!   page redirect, and process exit to an [EnforcementDelegate]
//!   implemented by the host application.
//!
//! These are best-effort heuristics, not DRM: receipt presence is
//! spoofable, the owner UID is an OS convention, and the signature check
//! parses the output of an external tool. The goal is classifying honest
//! installs, not resisting a motivated adversary.
//!
//! # Getting Started
//!
//! ```no_run
//! use app_store_validator::{
//!     Acknowledgement, AppStoreValidatorError, CodesignInspector, EnforcementDelegate,
//!     Validator, ValidatorConfig,
//! };
//!
//! struct Quit;
//!
//! impl EnforcementDelegate for Quit {
//!     fn present_blocking_warning(&self) -> Acknowledgement {
//!         // Show your alert here.
//!         Acknowledgement::Acknowledged
//!     }
//!
//!     fn open_url(&self, _url: &str) -> Result<(), AppStoreValidatorError> {
//!         Ok(())
//!     }
//!
//!     fn terminate(&self, code: i32) {
//!         std::process::exit(code)
//!     }
//! }
//!
//! fn main() -> Result<(), AppStoreValidatorError> {
//!     let inspector = CodesignInspector::default();
//!     let delegate = Quit;
//!
//!     let validator = Validator::for_host_bundle(
//!         ValidatorConfig {
//!             app_id: "123456789".to_string(),
//!             suite_name: None,
//!         },
//!         &inspector,
//!         &delegate,
//!     )?;
//!
//!     validator.check_after_days(7);
//!
//!     Ok(())
//! }
//! ```

mod bundle;
pub use bundle::*;
mod enforce;
pub use enforce::*;
mod error;
pub use error::*;
mod grace;
pub use grace::*;
mod inspect;
pub use inspect::*;
mod provenance;
pub use provenance::*;

#[cfg(test)]
mod testutil;
