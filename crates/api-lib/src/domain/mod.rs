//! Closed vocabularies for request fields and model output
//!
//! Every categorical input and the predicted label is a fixed set of
//! literal strings. Order inside `VALUES` is part of the contract: the
//! frequency scale and the obesity severity scale compare by position.

use crate::error::InvalidEnumValue;

/// Declares a string-backed enum and wires it into [`DomainEnum`],
/// `Display`, `FromStr` and serde.
macro_rules! domain_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $type_name:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $literal:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $literal)]
                $variant,
            )+
        }

        impl $crate::domain::DomainEnum for $name {
            const NAME: &'static str = $type_name;
            const VARIANTS: &'static [Self] = &[$($name::$variant),+];
            const VALUES: &'static [&'static str] = &[$($literal),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $literal),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::domain::DomainEnum::as_str(self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as $crate::domain::DomainEnum>::from_value(s)
            }
        }
    };
}

mod bmi;
mod frequency;
mod gender;
mod obesity;
mod transport;
mod yes_no;

pub use bmi::BmiCategory;
pub use frequency::{Frequency, FREQUENCY_ORDER};
pub use gender::Gender;
pub use obesity::{ObesityLevel, NUM_CLASSES};
pub use transport::Transport;
pub use yes_no::YesNo;

/// Behaviour shared by every closed vocabulary
pub trait DomainEnum: Sized + Copy + PartialEq + 'static {
    /// Type name used in error messages
    const NAME: &'static str;
    /// Every member, in declaration order
    const VARIANTS: &'static [Self];
    /// Literal string of every member, in declaration order
    const VALUES: &'static [&'static str];

    /// Literal string of this member
    fn as_str(&self) -> &'static str;

    fn values() -> &'static [&'static str] {
        Self::VALUES
    }

    fn has_value(value: &str) -> bool {
        Self::VALUES.contains(&value)
    }

    /// Exact, case-sensitive lookup of a member by its literal
    fn from_value(value: &str) -> Result<Self, InvalidEnumValue> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.as_str() == value)
            .ok_or_else(|| InvalidEnumValue {
                type_name: Self::NAME,
                value: value.to_string(),
            })
    }
}
