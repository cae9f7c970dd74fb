// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {crate::bundle::AppBundle, anyhow::Result, std::path::Path};

/// Materialize a minimal `.app` bundle fixture under `dir`.
///
/// The bundle carries an `Info.plist` with identifier
/// `com.example.<name>` and a placeholder main executable.
pub(crate) fn create_bundle(dir: &Path, name: &str) -> Result<AppBundle> {
    let root = dir.join(format!("{}.app", name));
    let macos_dir = root.join("Contents").join("MacOS");
    std::fs::create_dir_all(&macos_dir)?;

    let mut info = plist::Dictionary::new();
    info.insert(
        "CFBundleIdentifier".to_string(),
        plist::Value::String(format!("com.example.{}", name)),
    );
    info.insert(
        "CFBundleExecutable".to_string(),
        plist::Value::String(name.to_string()),
    );
    plist::Value::Dictionary(info).to_file_xml(root.join("Contents").join("Info.plist"))?;

    std::fs::write(macos_dir.join(name), b"not a real binary")?;

    Ok(AppBundle::new_from_path(&root)?)
}

/// Place an empty receipt file at the bundle's conventional receipt path.
pub(crate) fn create_receipt(bundle: &AppBundle) -> Result<()> {
    let receipt = bundle.receipt_path();

    if let Some(parent) = receipt.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(receipt, b"receipt")?;

    Ok(())
}
