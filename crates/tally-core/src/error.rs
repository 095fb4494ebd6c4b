use std::fmt;

/// Machine-readable error codes for logs and frontends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ValidationFailed,
    DuplicateIndexDrift,
    CorruptAggregates,
    StreakInvariantViolation,
    UnknownAchievementKind,
    StoreSaveFailed,
    StoreLoadFailed,
    PublishFailed,
    LockContention,
    StaleGuestFlag,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ValidationFailed => "E2001",
            Self::DuplicateIndexDrift => "E3001",
            Self::CorruptAggregates => "E3002",
            Self::StreakInvariantViolation => "E3003",
            Self::UnknownAchievementKind => "E3004",
            Self::StoreSaveFailed => "E4001",
            Self::StoreLoadFailed => "E4002",
            Self::PublishFailed => "E4003",
            Self::LockContention => "E5001",
            Self::StaleGuestFlag => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Data directory not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ValidationFailed => "Completion event failed validation",
            Self::DuplicateIndexDrift => "Duplicate index disagrees with the event log",
            Self::CorruptAggregates => "Persisted aggregates unreadable",
            Self::StreakInvariantViolation => "Streak aggregate invariant violated",
            Self::UnknownAchievementKind => "Unknown achievement category in persisted state",
            Self::StoreSaveFailed => "Store save failed",
            Self::StoreLoadFailed => "Store load failed",
            Self::PublishFailed => "Share publish failed",
            Self::LockContention => "Lock contention",
            Self::StaleGuestFlag => "Guest session flag left over from a previous run",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `tally init` to create the data directory."),
            Self::ConfigParseError => Some("Fix syntax in config.toml and retry."),
            Self::ValidationFailed => None,
            Self::DuplicateIndexDrift => {
                Some("The index is rebuilt from the event log automatically.")
            }
            Self::CorruptAggregates => Some("Run `tally rebuild` to replay the event log."),
            Self::StreakInvariantViolation => Some("Run `tally rebuild` to replay the event log."),
            Self::UnknownAchievementKind => {
                Some("The category is skipped; upgrade tally if it should exist.")
            }
            Self::StoreSaveFailed => Some("Check disk space and write permissions."),
            Self::StoreLoadFailed => Some("Check the data directory; run `tally rebuild`."),
            Self::PublishFailed => None,
            Self::LockContention => Some("Retry after the other tally process exits."),
            Self::StaleGuestFlag => {
                Some("Forced back to host mode; guest sessions never write durable data.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 12] = [
        ErrorCode::NotInitialized,
        ErrorCode::ConfigParseError,
        ErrorCode::ValidationFailed,
        ErrorCode::DuplicateIndexDrift,
        ErrorCode::CorruptAggregates,
        ErrorCode::StreakInvariantViolation,
        ErrorCode::UnknownAchievementKind,
        ErrorCode::StoreSaveFailed,
        ErrorCode::StoreLoadFailed,
        ErrorCode::PublishFailed,
        ErrorCode::LockContention,
        ErrorCode::StaleGuestFlag,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let s = code.code();
            assert_eq!(s.len(), 5);
            assert!(s.starts_with('E'));
            assert!(s.chars().skip(1).all(|c| c.is_ascii_digit()));
            assert!(!code.message().is_empty());
        }
    }
}
