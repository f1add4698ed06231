use crate::validate::string_enum;

string_enum! {
    /// Lifecycle of records that are retired rather than deleted.
    ///
    /// `Active` may move to `Deactivated` or `Revoked`; `Deactivated` may
    /// still be revoked. Nothing returns to `Active`.
    Lifecycle ("state") {
        Active => "active",
        /// Retired by its owner or by a cascade.
        Deactivated => "deactivated",
        /// Withdrawn administratively.
        Revoked => "revoked",
    }
}

impl Lifecycle {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    pub fn can_transition_to(self, next: Lifecycle) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Deactivated)
                | (Self::Active, Self::Revoked)
                | (Self::Deactivated, Self::Revoked)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_one_way() {
        assert!(Lifecycle::Active.can_transition_to(Lifecycle::Deactivated));
        assert!(Lifecycle::Active.can_transition_to(Lifecycle::Revoked));
        assert!(Lifecycle::Deactivated.can_transition_to(Lifecycle::Revoked));

        assert!(!Lifecycle::Deactivated.can_transition_to(Lifecycle::Active));
        assert!(!Lifecycle::Revoked.can_transition_to(Lifecycle::Active));
        assert!(!Lifecycle::Revoked.can_transition_to(Lifecycle::Deactivated));
        assert!(!Lifecycle::Active.can_transition_to(Lifecycle::Active));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!("revoked".parse::<Lifecycle>(), Ok(Lifecycle::Revoked));
        let err = "deleted".parse::<Lifecycle>().unwrap_err();
        assert_eq!(err.field, "state");
    }
}
