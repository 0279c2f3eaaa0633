pub mod application;
pub mod candidate;
pub mod interview;
pub mod job;

/// A closed set of lowercase snake_case values stored as TEXT.
pub trait Choice: Sized + Copy + 'static {
    /// Request field name used in validation messages.
    const FIELD: &'static str;
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    /// Accepts any case, with `-` or spaces in place of `_`.
    fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL.iter().copied().find(|c| c.as_str() == wanted)
    }

    fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::job::JobStatus;
    use super::Choice;

    #[test]
    fn test_parse_is_lenient_about_case_and_separators() {
        assert_eq!(JobStatus::parse("On-Hold"), Some(JobStatus::OnHold));
        assert_eq!(JobStatus::parse(" on hold "), Some(JobStatus::OnHold));
        assert_eq!(JobStatus::parse("OPEN"), Some(JobStatus::Open));
        assert_eq!(JobStatus::parse("archived"), None);
    }

    #[test]
    fn test_allowed_lists_every_value() {
        assert_eq!(JobStatus::allowed(), "open, draft, on_hold, closed");
    }
}
