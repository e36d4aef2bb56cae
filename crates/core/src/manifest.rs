//! Over-the-air install manifests.
//!
//! iOS devices install an `.ipa` by fetching a property list that points at
//! the package URL (`itms-services://?action=download-manifest&url=...`).

use crate::config::ManifestConfig;

/// An install manifest for a single software package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallManifest {
    pub bundle_id: String,
    pub version: String,
    pub title: String,
    /// Absolute URL of the package.
    pub package_url: String,
}

impl InstallManifest {
    /// Build a manifest from configuration and a package URL.
    pub fn new(config: &ManifestConfig, package_url: impl Into<String>) -> Self {
        Self {
            bundle_id: config.bundle_id.clone(),
            version: config.version.clone(),
            title: config.title.clone(),
            package_url: package_url.into(),
        }
    }

    /// Render as an XML property list.
    pub fn to_plist(&self) -> crate::Result<String> {
        if !self.package_url.starts_with("http://") && !self.package_url.starts_with("https://") {
            return Err(crate::Error::InvalidManifest(format!(
                "package URL must be absolute: {}",
                self.package_url
            )));
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>items</key>
	<array>
		<dict>
			<key>assets</key>
			<array>
				<dict>
					<key>kind</key>
					<string>software-package</string>
					<key>url</key>
					<string>{url}</string>
				</dict>
			</array>
			<key>metadata</key>
			<dict>
				<key>bundle-identifier</key>
				<string>{bundle_id}</string>
				<key>bundle-version</key>
				<string>{version}</string>
				<key>kind</key>
				<string>software</string>
				<key>title</key>
				<string>{title}</string>
			</dict>
		</dict>
	</array>
</dict>
</plist>
"#,
            url = escape_xml(&self.package_url),
            bundle_id = escape_xml(&self.bundle_id),
            version = escape_xml(&self.version),
            title = escape_xml(&self.title),
        ))
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
