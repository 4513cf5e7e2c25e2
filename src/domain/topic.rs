//! Named one-shot topics.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

/// Name of a one-shot topic on the [`super::EventBus`].
///
/// The well-known lifecycle topics are associated constants; any other
/// name is accepted so collaborators can coordinate on their own topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    /// Hosting environment now permits async work; builds collaborators.
    pub const READY: Self = Self(Cow::Borrowed("ready"));
    /// All collaborators are constructed; requests may be dispatched.
    pub const STEADY: Self = Self(Cow::Borrowed("steady"));
    /// The instance is ending; long-lived resources must be released.
    pub const STOP: Self = Self(Cow::Borrowed("stop"));
    /// Teardown has finished.
    pub const CLOSED: Self = Self(Cow::Borrowed("closed"));

    /// Creates a topic with an arbitrary name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the topic name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Topic {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_and_borrowed_names_are_equal() {
        assert_eq!(Topic::new(String::from("stop")), Topic::STOP);
        assert_eq!(Topic::from("ready"), Topic::READY);
    }

    #[test]
    fn display_is_the_name() {
        assert_eq!(Topic::STEADY.to_string(), "steady");
    }
}
