// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Apple backend (iOS and macOS).
//!
//! Signed builds run against a dedicated throwaway keychain and an
//! installed provisioning profile; both are torn down on every exit
//! path, success or failure. Archives are produced with code-signing
//! disabled and signed at export time.

use super::{collect_matching, download_cert, pack_artifacts, PlatformBackend};
use crate::error::StageError;
use crate::BuildContext;
use anvil_adapters::subprocess::{run_logged, run_with_timeout, TOOL_TIMEOUT};
use anvil_core::{Platform, SigningKey};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Signing identity used for both development and distribution builds.
pub const MAC_SIGNING_IDENTITY: &str = "Mac Developer";

const KEYCHAIN_NAME: &str = "anvil-build.keychain";
const KEYCHAIN_PASSWORD: &str = "anvil";
const P12_FILE: &str = "signing.p12";
const PROFILE_FILE: &str = "profile.mobileprovision";

const IPA_PATTERN: &str = r"(?i)\.(ipa|xcarchive\.zip)$";
const PKG_PATTERN: &str = r"(?i)\.(pkg|app\.zip)$";

pub struct AppleBackend {
    pub target: Platform,
}

#[async_trait]
impl PlatformBackend for AppleBackend {
    async fn build_json(&self, ctx: &BuildContext) -> Result<(), StageError> {
        // The export step consumes the descriptor for signed and
        // unsigned builds alike.
        let plist = match self.target {
            Platform::Ios => ios_export_options(),
            _ => osx_export_options(),
        };
        std::fs::write(export_options_path(ctx), plist)
            .map_err(|e| StageError::io("writing exportOptions.plist", e))
    }

    async fn build(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let signing = match &ctx.job.key {
            Some(SigningKey::Apple {
                p12,
                provisioning,
                password,
            }) => Some(SigningSetup::install(ctx, p12, provisioning, password).await?),
            _ => None,
        };

        let result = self.run_native_build(ctx, signing.as_ref()).await;

        // Cleanup runs on every exit path.
        if let Some(signing) = signing {
            signing.cleanup(ctx).await;
        }
        result
    }

    async fn pack(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let pattern = match self.target {
            Platform::Ios => IPA_PATTERN,
            _ => PKG_PATTERN,
        };
        let pattern =
            Regex::new(pattern).map_err(|e| StageError::internal(format!("pattern: {}", e)))?;
        let artifacts = collect_matching(&export_dir(ctx), &pattern);
        pack_artifacts(ctx, artifacts).await
    }
}

impl AppleBackend {
    async fn run_native_build(
        &self,
        ctx: &BuildContext,
        signing: Option<&SigningSetup>,
    ) -> Result<(), StageError> {
        let platform_dir = ctx
            .ws
            .project_dir()
            .join("platforms")
            .join(self.target.to_string());
        let archive = export_dir(ctx).join("app.xcarchive");

        if let Some(signing) = signing {
            signing.write_scheme(&platform_dir)?;
            disable_codesign_in_xcconfig(&platform_dir)?;
        }

        std::fs::create_dir_all(export_dir(ctx))
            .map_err(|e| StageError::io("creating export dir", e))?;

        // Archive with signing disabled; identities apply at export.
        let mut cmd = Command::new("xcodebuild");
        cmd.arg("archive")
            .arg("-archivePath")
            .arg(&archive)
            .arg("CODE_SIGNING_REQUIRED=NO")
            .arg("CODE_SIGN_IDENTITY=")
            .current_dir(&platform_dir);
        run_build_step(ctx, cmd, "xcodebuild archive").await?;

        match self.target {
            Platform::Ios => {
                let mut cmd = Command::new("xcodebuild");
                cmd.arg("-exportArchive")
                    .arg("-archivePath")
                    .arg(&archive)
                    .arg("-exportOptionsPlist")
                    .arg(export_options_path(ctx))
                    .arg("-exportPath")
                    .arg(export_dir(ctx))
                    .current_dir(&platform_dir);
                run_build_step(ctx, cmd, "xcodebuild export").await
            }
            _ => {
                let app = archive.join("Products/Applications");
                let mut cmd = Command::new("productbuild");
                cmd.arg("--component")
                    .arg(&app)
                    .arg("/Applications")
                    .arg(export_dir(ctx).join("app.pkg"))
                    .current_dir(&platform_dir);
                run_build_step(ctx, cmd, "productbuild").await
            }
        }
    }
}

/// Installed signing state: the throwaway keychain and the provisioning
/// profile keyed by its UUID.
struct SigningSetup {
    profile_uuid: String,
}

impl SigningSetup {
    async fn install(
        ctx: &BuildContext,
        p12_url: &str,
        provisioning_url: &str,
        password: &str,
    ) -> Result<SigningSetup, StageError> {
        let p12 = download_cert(ctx, p12_url, P12_FILE).await?;
        let profile = download_cert(ctx, provisioning_url, PROFILE_FILE).await?;

        security(ctx, &["create-keychain", "-p", KEYCHAIN_PASSWORD, KEYCHAIN_NAME]).await?;
        security(ctx, &["unlock-keychain", "-p", KEYCHAIN_PASSWORD, KEYCHAIN_NAME]).await?;
        security(
            ctx,
            &[
                "import",
                &p12.display().to_string(),
                "-k",
                KEYCHAIN_NAME,
                "-P",
                password,
                "-T",
                "/usr/bin/codesign",
            ],
        )
        .await?;

        let profile_uuid = extract_profile_uuid(&profile).await?;
        let dest = profiles_dir().join(format!("{}.mobileprovision", profile_uuid));
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StageError::io("creating profiles dir", e))?;
        }
        std::fs::copy(&profile, &dest)
            .map_err(|e| StageError::io("installing provisioning profile", e))?;

        Ok(SigningSetup { profile_uuid })
    }

    /// Write the shared build scheme the archive step selects.
    fn write_scheme(&self, platform_dir: &Path) -> Result<(), StageError> {
        let schemes = platform_dir.join("xcshareddata/xcschemes");
        std::fs::create_dir_all(&schemes)
            .map_err(|e| StageError::io("creating schemes dir", e))?;
        std::fs::write(schemes.join("anvil.xcscheme"), scheme_template())
            .map_err(|e| StageError::io("writing build scheme", e))
    }

    async fn cleanup(&self, ctx: &BuildContext) {
        let profile = profiles_dir().join(format!("{}.mobileprovision", self.profile_uuid));
        if let Err(err) = std::fs::remove_file(&profile) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %err, "provisioning profile removal failed");
            }
        }
        if let Err(err) = security(ctx, &["delete-keychain", KEYCHAIN_NAME]).await {
            tracing::warn!(error = %err, "keychain removal failed");
        }
    }
}

async fn security(ctx: &BuildContext, args: &[&str]) -> Result<(), StageError> {
    let mut cmd = Command::new("security");
    cmd.args(args);
    let context = format!("security {}", args.first().unwrap_or(&""));
    let status = run_logged(cmd, TOOL_TIMEOUT, &context, &ctx.ws.cordova_log()).await?;
    if !status.success() {
        return Err(StageError::new(
            format!("{} exited with {}", context, status),
            "The signing keychain could not be prepared on this worker.",
        ));
    }
    Ok(())
}

/// Decode the provisioning profile and pull its UUID.
async fn extract_profile_uuid(profile: &Path) -> Result<String, StageError> {
    let mut cmd = Command::new("security");
    cmd.arg("cms").arg("-D").arg("-i").arg(profile);
    let output = run_with_timeout(cmd, TOOL_TIMEOUT, "security cms").await?;
    if !output.status.success() {
        return Err(StageError::new(
            format!("security cms exited with {}", output.status),
            "The provisioning profile could not be read.",
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_profile_uuid(&text).ok_or_else(|| {
        StageError::new(
            "provisioning profile has no UUID",
            "The provisioning profile is missing its UUID.",
        )
    })
}

/// The UUID is the 36-char token following the UUID key in the decoded
/// plist.
pub(crate) fn parse_profile_uuid(plist: &str) -> Option<String> {
    let after = plist.split("UUID").nth(1)?;
    let re = Regex::new(r"[-A-Za-z0-9]{36}").ok()?;
    re.find(after).map(|m| m.as_str().to_uppercase())
}

async fn run_build_step(
    ctx: &BuildContext,
    cmd: Command,
    context: &str,
) -> Result<(), StageError> {
    let status = run_logged(cmd, TOOL_TIMEOUT, context, &ctx.ws.cordova_log()).await?;
    if !status.success() {
        return Err(StageError::new(
            format!("{} exited with {}", context, status),
            format!("The {} build failed.", ctx.job.platform),
        ));
    }
    Ok(())
}

/// Append signing-disable overrides to the project xcconfig files so the
/// archive step never demands an identity.
fn disable_codesign_in_xcconfig(platform_dir: &Path) -> Result<(), StageError> {
    let cordova_dir = platform_dir.join("cordova");
    let Ok(entries) = std::fs::read_dir(&cordova_dir) else {
        return Ok(());
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "xcconfig") {
            let mut text = std::fs::read_to_string(&path)
                .map_err(|e| StageError::io("reading xcconfig", e))?;
            text.push_str("\nCODE_SIGNING_REQUIRED = NO\nCODE_SIGN_IDENTITY =\n");
            std::fs::write(&path, text).map_err(|e| StageError::io("writing xcconfig", e))?;
        }
    }
    Ok(())
}

fn export_dir(ctx: &BuildContext) -> PathBuf {
    ctx.ws.dir().join("build")
}

fn export_options_path(ctx: &BuildContext) -> PathBuf {
    ctx.ws.dir().join("exportOptions.plist")
}

fn profiles_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join("Library/MobileDevice/Provisioning Profiles")
}

fn ios_export_options() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>method</key>
    <string>ad-hoc</string>
    <key>compileBitcode</key>
    <false/>
</dict>
</plist>
"#
    .to_string()
}

fn osx_export_options() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>method</key>
    <string>development</string>
    <key>signingCertificate</key>
    <string>{}</string>
</dict>
</plist>
"#,
        MAC_SIGNING_IDENTITY
    )
}

fn scheme_template() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Scheme LastUpgradeVersion="1500" version="1.3">
   <BuildAction parallelizeBuildables="YES" buildImplicitDependencies="YES">
   </BuildAction>
   <ArchiveAction buildConfiguration="Release" revealArchiveInOrganizer="NO">
   </ArchiveAction>
</Scheme>
"#
}

#[cfg(test)]
#[path = "apple_tests.rs"]
mod tests;
