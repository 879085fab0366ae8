//! Channel identity

use std::fmt;

/// Unique identifier for a channel (numeric id + name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// Numeric channel id
    pub id: u32,
    /// Channel (session) name, e.g. "camera1"
    pub name: String,
}

impl ChannelKey {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ChannelKey::new(7, "lobby").to_string(), "7/lobby");
    }
}
