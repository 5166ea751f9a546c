//! Purpose: Centralize snapshot container tagging and version gating.
//! Exports: `SNAPSHOT_TAG`, `SNAPSHOT_FORMAT_VERSION`, `SUPPORTED_SNAPSHOT_VERSIONS`, `check_header`.
//! Role: Shared policy for deciding whether a container file is loadable at all.
//! Invariants: Version list is additive; bump only for incompatible layout changes.
//! Invariants: Rejections are `Load` errors with an actionable hint.

use std::path::Path;

use crate::core::error::{Error, ErrorKind};

pub const SNAPSHOT_TAG: &str = "tabex";
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
pub const SUPPORTED_SNAPSHOT_VERSIONS: &[u32] = &[SNAPSHOT_FORMAT_VERSION];

pub fn check_header(tag: &str, version: u32, path: &Path) -> Result<(), Error> {
    if tag != SNAPSHOT_TAG {
        return Err(Error::new(ErrorKind::Load)
            .with_message(format!("unrecognized container tag `{tag}`"))
            .with_path(path)
            .with_hint("Re-dump the legacy database with a supported snapshot exporter."));
    }
    if !SUPPORTED_SNAPSHOT_VERSIONS.contains(&version) {
        return Err(snapshot_version_error(version).with_path(path));
    }
    Ok(())
}

fn snapshot_version_error(detected: u32) -> Error {
    let supported = SUPPORTED_SNAPSHOT_VERSIONS
        .iter()
        .map(|version| version.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Error::new(ErrorKind::Load)
        .with_message(format!(
            "unsupported snapshot version {detected} (supported: {supported})"
        ))
        .with_hint("Upgrade tabex or re-dump the database with a matching exporter version.")
}

#[cfg(test)]
mod tests {
    use super::{SNAPSHOT_FORMAT_VERSION, SNAPSHOT_TAG, check_header};
    use crate::core::error::ErrorKind;
    use std::path::Path;

    #[test]
    fn accepts_current_header() {
        check_header(SNAPSHOT_TAG, SNAPSHOT_FORMAT_VERSION, Path::new("db.json")).expect("ok");
    }

    #[test]
    fn rejects_foreign_tag_and_future_version() {
        let err = check_header("other", 1, Path::new("db.json")).expect_err("tag");
        assert_eq!(err.kind(), ErrorKind::Load);
        assert!(err.hint().is_some());

        let err = check_header(SNAPSHOT_TAG, 99, Path::new("db.json")).expect_err("version");
        assert_eq!(err.kind(), ErrorKind::Load);
        assert!(err.message().unwrap_or_default().contains("99"));
    }
}
