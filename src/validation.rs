//! Fault aggregation.
//!
//! Table operations fail fast. [`Validation`] is for callers that would
//! rather run a batch to the end and look at everything that went wrong, for
//! example when verifying every entry of a container.
//!
//! ```rust
//! use assetpak::{Error, Validation};
//!
//! let mut validation = Validation::new();
//! validation.add_error("missing palette");
//! validation.add_fault(Error::file_not_found("data\\a.spr"));
//!
//! assert!(!validation.is_valid());
//! assert_eq!(validation.len(), 2);
//! // Display shows only the most recent fault.
//! assert_eq!(validation.to_string(), "file not found: data\\a.spr");
//! // message() joins all of them.
//! assert!(validation.message().contains("missing palette"));
//! ```

use std::fmt;

use crate::Error;

/// One recorded fault.
#[derive(Debug)]
pub struct Fault {
    message: String,
    error: Option<Error>,
}

impl Fault {
    /// Returns the fault message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the originating error, if one was recorded.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Append-only list of faults. Valid iff empty.
#[derive(Debug, Default)]
pub struct Validation {
    faults: Vec<Fault>,
}

impl Validation {
    /// Creates an empty (valid) validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no fault has been recorded.
    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }

    /// Number of recorded faults.
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    /// Returns true if no fault has been recorded.
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Records a fault with only a message.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.faults.push(Fault {
            message: message.into(),
            error: None,
        });
    }

    /// Records an error, using its display text as the message.
    pub fn add_fault(&mut self, error: Error) {
        self.faults.push(Fault {
            message: error.to_string(),
            error: Some(error),
        });
    }

    /// Records an error under a custom message.
    pub fn add_fault_with_message(&mut self, message: impl Into<String>, error: Error) {
        self.faults.push(Fault {
            message: message.into(),
            error: Some(error),
        });
    }

    /// Records the error of `result`, if any, and passes the value through.
    pub fn record<T>(&mut self, result: crate::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add_fault(e);
                None
            }
        }
    }

    /// Absorbs every fault of `other`, keeping their order.
    pub fn merge(&mut self, other: Validation) {
        self.faults.extend(other.faults);
    }

    /// Returns all faults in the order they were recorded.
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Returns the most recent fault.
    pub fn last_fault(&self) -> Option<&Fault> {
        self.faults.last()
    }

    /// Returns every fault message joined by newlines.
    pub fn message(&self) -> String {
        self.faults
            .iter()
            .map(Fault::message)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Shows only the most recent fault; use [`Validation::message`] for all of
/// them.
impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_fault() {
            Some(fault) => f.write_str(fault.message()),
            None => Ok(()),
        }
    }
}

impl Extend<Error> for Validation {
    fn extend<I: IntoIterator<Item = Error>>(&mut self, iter: I) {
        for error in iter {
            self.add_fault(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_empty_is_valid() {
        let v = Validation::new();
        assert!(v.is_valid());
        assert_eq!(v.to_string(), "");
        assert_eq!(v.message(), "");
    }

    #[test]
    fn test_display_shows_last_fault_only() {
        let mut v = Validation::new();
        v.add_error("first");
        v.add_error("second");
        assert_eq!(v.to_string(), "second");
        assert_eq!(v.message(), "first\nsecond");
    }

    #[test]
    fn test_fault_keeps_error() {
        let mut v = Validation::new();
        v.add_fault_with_message("could not open", Error::NotOpened);
        let fault = v.last_fault().unwrap();
        assert_eq!(fault.message(), "could not open");
        assert_eq!(fault.error().unwrap().kind(), ErrorKind::NotOpened);
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut a = Validation::new();
        a.add_error("a1");
        let mut b = Validation::new();
        b.add_error("b1");
        b.add_error("b2");
        a.merge(b);
        let messages: Vec<_> = a.faults().iter().map(|f| f.message()).collect();
        assert_eq!(messages, vec!["a1", "b1", "b2"]);
    }

    #[test]
    fn test_record() {
        let mut v = Validation::new();
        assert_eq!(v.record(Ok::<_, Error>(5)), Some(5));
        assert_eq!(v.record::<u32>(Err(Error::Busy)), None);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_extend_with_errors() {
        let mut v = Validation::new();
        v.extend([Error::Busy, Error::Saving]);
        assert_eq!(v.len(), 2);
        assert_eq!(v.to_string(), "the container is being saved");
    }
}
