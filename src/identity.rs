//! Stable device identity derived from a hardware network address.
//!
//! The colon-stripped MAC of a configured interface is read once at startup
//! and stays immutable for the process lifetime. It namespaces the status
//! topics of this device on a shared broker.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read hardware address from {path}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("hardware address read from {path} is empty")]
    Empty { path: PathBuf },
}

/// Colon-stripped, lowercased MAC address, e.g. `b827eb974fea`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Reads the identity from `/sys/class/net/<interface>/address`.
    pub fn from_interface(interface: &str) -> Result<Self, IdentityError> {
        let path = Path::new("/sys/class/net")
            .join(interface)
            .join("address");
        Self::from_address_file(&path)
    }

    /// Reads the identity from an explicit address file.
    pub fn from_address_file(path: &Path) -> Result<Self, IdentityError> {
        let raw = fs::read_to_string(path).map_err(|source| IdentityError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_raw(&raw).ok_or_else(|| IdentityError::Empty {
            path: path.to_path_buf(),
        })
    }

    /// Normalizes a raw address string; `None` if nothing is left after
    /// stripping separators and whitespace.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let id: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != ':')
            .collect();

        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn strips_colons_and_normalizes_case() {
        let id = DeviceIdentity::from_raw("B8:27:EB:97:4F:EA\n").expect("identity");
        assert_eq!(id.as_str(), "b827eb974fea");
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(DeviceIdentity::from_raw("  \n").is_none());
    }

    #[test]
    fn reads_address_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("address");
        let mut file = fs::File::create(&path).expect("create");
        writeln!(file, "b8:27:eb:97:4f:ea").expect("write");

        let id = DeviceIdentity::from_address_file(&path).expect("identity");
        assert_eq!(id.as_str(), "b827eb974fea");
    }

    #[test]
    fn missing_address_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing");
        assert!(matches!(
            DeviceIdentity::from_address_file(&path),
            Err(IdentityError::Unreadable { .. })
        ));
    }
}
