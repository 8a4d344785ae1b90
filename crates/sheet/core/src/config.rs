//! Engine configuration.

/// Which history records `undo` accepts.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum UndoPolicy {
    /// Any record still in history may be undone, in any order.
    #[default]
    AnyRecord,
    /// Only the most recent record may be undone.
    MostRecentOnly,
}

/// Rules the spend engine applies on top of the catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetConfig {
    pub undo_policy: UndoPolicy,
}

impl SheetConfig {
    pub fn strict() -> Self {
        Self {
            undo_policy: UndoPolicy::MostRecentOnly,
        }
    }

    pub fn with_undo_policy(mut self, policy: UndoPolicy) -> Self {
        self.undo_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_policy_parses_leniently() {
        assert_eq!(
            "mostRecentOnly".parse::<UndoPolicy>(),
            Ok(UndoPolicy::MostRecentOnly)
        );
        assert_eq!("anyrecord".parse::<UndoPolicy>(), Ok(UndoPolicy::AnyRecord));
        assert!("stack".parse::<UndoPolicy>().is_err());
        assert_eq!(UndoPolicy::default().to_string(), "anyRecord");
    }
}
