/// Broad failure categories the poll loop dispatches on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Kind {
    /// Missing or invalid settings; only ever seen at startup.
    Configuration,
    Transport,
    ResponseShape,
    DomainValidation,
    Delivery,
}

impl Kind {
    /// Whether the chat should hear about a failure of this kind.
    pub(crate) fn is_reportable(self) -> bool {
        match self {
            Self::Transport | Self::ResponseShape | Self::DomainValidation => true,
            Self::Configuration | Self::Delivery => false,
        }
    }
}

pub(crate) trait Classify {
    fn kind(&self) -> Kind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_failures_are_not_reported() {
        assert!(!Kind::Delivery.is_reportable());
        assert!(!Kind::Configuration.is_reportable());
        assert!(Kind::Transport.is_reportable());
        assert!(Kind::ResponseShape.is_reportable());
        assert!(Kind::DomainValidation.is_reportable());
    }
}
