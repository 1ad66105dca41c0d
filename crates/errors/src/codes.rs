//! Fixed wire error-code table
//!
//! The admin/installer UI renders errors from a stable `{code, message}` pair.
//! Codes are part of the wire contract with deployed front-ends and must not
//! be renumbered. Only the codes this subsystem can emit are listed; the rest
//! of the platform's table lives with the API layer.

/// Stable wire codes emitted on the progress channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Course bundle download failed
    CourseDownloadFail = 69,
    /// Tool bundle download failed
    ToolDownloadFail = 72,
    /// Login against the update service failed
    UpgradeLoginToken = 78,
    /// Update check failed
    UpgradeCheckFail = 79,
    /// Upgrade apply (backup/extract/swap) failed
    UpgradeFail = 80,
    /// Upgrade asset download failed
    UpgradeDownload = 81,
    /// Reboot hand-off failed
    UpgradeReboot = 82,
    /// Already on the latest version (informational)
    UpgradeDone = 83,
}

impl ErrorCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Pre-localized message for this code
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::CourseDownloadFail => "course download failed",
            ErrorCode::ToolDownloadFail => "tool download failed",
            ErrorCode::UpgradeLoginToken => "could not sign in to the update service",
            ErrorCode::UpgradeCheckFail => "update check failed",
            ErrorCode::UpgradeFail => "upgrade failed",
            ErrorCode::UpgradeDownload => "upgrade package download failed",
            ErrorCode::UpgradeReboot => "system restart failed",
            ErrorCode::UpgradeDone => "already on the latest version",
        }
    }

    /// Message for a raw wire code; unknown codes render a generic message
    /// instead of failing to respond.
    #[must_use]
    pub fn message_for(code: i32) -> &'static str {
        match Self::from_i32(code) {
            Some(known) => known.message(),
            None => "unknown error",
        }
    }

    #[must_use]
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            69 => Some(ErrorCode::CourseDownloadFail),
            72 => Some(ErrorCode::ToolDownloadFail),
            78 => Some(ErrorCode::UpgradeLoginToken),
            79 => Some(ErrorCode::UpgradeCheckFail),
            80 => Some(ErrorCode::UpgradeFail),
            81 => Some(ErrorCode::UpgradeDownload),
            82 => Some(ErrorCode::UpgradeReboot),
            83 => Some(ErrorCode::UpgradeDone),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::UpgradeLoginToken.as_i32(), 78);
        assert_eq!(ErrorCode::UpgradeDone.as_i32(), 83);
        assert_eq!(ErrorCode::CourseDownloadFail.as_i32(), 69);
    }

    #[test]
    fn unknown_code_renders_generic_message() {
        assert_eq!(ErrorCode::message_for(9999), "unknown error");
        assert_eq!(ErrorCode::message_for(79), "update check failed");
    }
}
