use serde::{Deserialize, Serialize};

/// Caller attributes threaded through service calls for structured logging.
///
/// Carries no authority: authorization decisions are always made from the
/// identifiers passed to the operation itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    caller_id: Option<String>,
    caller_location: Option<String>,
}

impl RequestContext {
    /// Creates a context with no caller attributes.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates a context for an identified caller.
    #[must_use]
    pub fn for_caller(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: non_blank(caller_id.into()),
            caller_location: None,
        }
    }

    /// Returns a copy with the caller location (for example a viewer country code).
    #[must_use]
    pub fn with_location(mut self, caller_location: impl Into<String>) -> Self {
        self.caller_location = non_blank(caller_location.into());
        self
    }

    /// Returns the caller identifier, if known.
    #[must_use]
    pub fn caller_id(&self) -> Option<&str> {
        self.caller_id.as_deref()
    }

    /// Returns the caller location, if known.
    #[must_use]
    pub fn caller_location(&self) -> Option<&str> {
        self.caller_location.as_deref()
    }

    /// Caller identifier for log fields, `-` when unknown.
    #[must_use]
    pub fn caller_label(&self) -> &str {
        self.caller_id().unwrap_or("-")
    }

    /// Caller location for log fields, `-` when unknown.
    #[must_use]
    pub fn location_label(&self) -> &str {
        self.caller_location().unwrap_or("-")
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::RequestContext;

    #[test]
    fn blank_attributes_are_dropped() {
        let context = RequestContext::for_caller("  ").with_location("");
        assert_eq!(context.caller_id(), None);
        assert_eq!(context.caller_location(), None);
        assert_eq!(context.caller_label(), "-");
    }

    #[test]
    fn attributes_are_trimmed() {
        let context = RequestContext::for_caller(" user-7 ").with_location("SG");
        assert_eq!(context.caller_id(), Some("user-7"));
        assert_eq!(context.location_label(), "SG");
    }
}
