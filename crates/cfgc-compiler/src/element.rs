/// Element names the compiler reacts to. Anything else is walked through
/// without effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Domain,
    ParamName,
    Type,
    Value,
    AccessPolicy,
    Component,
    Read,
    Write,
}

impl ElementKind {
    pub fn classify(name: &str) -> Option<Self> {
        match name {
            "domain" => Some(Self::Domain),
            "param_name" => Some(Self::ParamName),
            "type" => Some(Self::Type),
            "value" => Some(Self::Value),
            "access_policy" => Some(Self::AccessPolicy),
            "component" => Some(Self::Component),
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::ParamName => "param_name",
            Self::Type => "type",
            Self::Value => "value",
            Self::AccessPolicy => "access_policy",
            Self::Component => "component",
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Attribute of `<domain>` holding the domain name.
pub const DOMAIN_NAME_ATTRIBUTE: &str = "name";
