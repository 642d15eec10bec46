//! Action names and the subscription members derived from them.
//!
//! Every registered action `name` comes with a subscription member
//! `on<Name>`: the first character is upper-cased and prefixed with `on`, so
//! `addMessage` yields `onAddMessage`.

use thiserror::Error;

/// Key of the listener list notified for every action
pub const WILDCARD: &str = "*";

/// Prefix of derived subscription members
pub const SUBSCRIPTION_PREFIX: &str = "on";

/// Reasons an action name is rejected at registration
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// The name is the empty string
    #[error("action name is empty")]
    Empty,

    /// The name is the wildcard key
    #[error("`*` is reserved for wildcard subscribers")]
    Reserved,

    /// The name contains whitespace or control characters
    #[error("action name contains whitespace or control characters")]
    InvalidCharacter,
}

/// Check that `name` can be registered as an action
///
/// # Errors
///
/// Returns a [`NameError`] describing why the name was rejected.
pub fn validate_action_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name == WILDCARD {
        return Err(NameError::Reserved);
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(NameError::InvalidCharacter);
    }
    Ok(())
}

/// Derive the subscription member for an action name
///
/// ```
/// use simple_state_core::subscription_name;
///
/// assert_eq!(subscription_name("addMessage"), "onAddMessage");
/// assert_eq!(subscription_name("x"), "onX");
/// ```
#[must_use]
pub fn subscription_name(name: &str) -> String {
    let mut chars = name.chars();
    let mut member = String::with_capacity(SUBSCRIPTION_PREFIX.len() + name.len());
    member.push_str(SUBSCRIPTION_PREFIX);
    if let Some(first) = chars.next() {
        member.extend(first.to_uppercase());
        member.push_str(chars.as_str());
    }
    member
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_empty_and_reserved() {
        assert_eq!(validate_action_name(""), Err(NameError::Empty));
        assert_eq!(validate_action_name("*"), Err(NameError::Reserved));
        assert_eq!(validate_action_name("add message"), Err(NameError::InvalidCharacter));
        assert_eq!(validate_action_name("tab\there"), Err(NameError::InvalidCharacter));
    }

    #[test]
    fn test_accepts_identifiers() {
        assert_eq!(validate_action_name("addMessage"), Ok(()));
        assert_eq!(validate_action_name("reset_all"), Ok(()));
        assert_eq!(validate_action_name("ünïcode"), Ok(()));
    }

    #[test]
    fn test_subscription_name_capitalizes_first_char() {
        assert_eq!(subscription_name("addMessage"), "onAddMessage");
        assert_eq!(subscription_name("AddMessage"), "onAddMessage");
        assert_eq!(subscription_name("élan"), "onÉlan");
        assert_eq!(subscription_name("_private"), "on_private");
    }

    proptest! {
        #[test]
        fn prop_subscription_name_keeps_tail(name in "[a-z][a-zA-Z0-9_]{0,16}") {
            let member = subscription_name(&name);
            prop_assert!(member.starts_with(SUBSCRIPTION_PREFIX));
            prop_assert_eq!(&member[3..], &name[1..]);
            prop_assert_eq!(member[2..3].to_lowercase(), name[..1].to_string());
        }
    }
}
