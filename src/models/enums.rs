use serde::{Deserialize, Serialize};

/// Returned when a wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct UnknownVariant {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(UnknownVariant {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(UrgencyLevel {
    Routine => "routine",
    Urgent => "urgent",
    Emergency => "emergency",
});

str_enum!(StageStatus {
    Ok => "ok",
    Failed => "failed",
    Timeout => "timeout",
});

str_enum!(SoapSection {
    Subjective => "subjective",
    Objective => "objective",
    Assessment => "assessment",
    Plan => "plan",
});

impl Default for UrgencyLevel {
    fn default() -> Self {
        Self::Routine
    }
}

impl SoapSection {
    pub const ALL: [SoapSection; 4] = [
        SoapSection::Subjective,
        SoapSection::Objective,
        SoapSection::Assessment,
        SoapSection::Plan,
    ];
}
