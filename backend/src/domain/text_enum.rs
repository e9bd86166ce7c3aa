//! Enumerations persisted as text columns.

/// Raised when a stored string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} value `{value}`")]
pub struct UnknownValue {
    kind: &'static str,
    value: String,
}

impl UnknownValue {
    /// Record the enumeration name and the offending value.
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Name of the enumeration that failed to parse.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

/// Declare an enum whose variants map to fixed lowercase strings.
///
/// The generated type serialises with serde using the same strings, exposes
/// `as_str`, `ALL`, `Display` and `FromStr`.
macro_rules! text_enum {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Text stored for this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::domain::UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::domain::UnknownValue::new(stringify!($name), other)),
                }
            }
        }
    };
}

pub(crate) use text_enum;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    text_enum! {
        /// Sample enumeration.
        pub enum Flavour {
            Sweet => "sweet",
            Umami => "umami",
        }
    }

    #[rstest]
    #[case("sweet", Flavour::Sweet)]
    #[case("umami", Flavour::Umami)]
    fn parses_stored_text(#[case] text: &str, #[case] expected: Flavour) {
        assert_eq!(text.parse::<Flavour>(), Ok(expected));
        assert_eq!(expected.to_string(), text);
    }

    #[rstest]
    fn unknown_text_names_the_enum() {
        let err = "sour".parse::<Flavour>().expect_err("sour is not a flavour");

        assert_eq!(err.kind(), "Flavour");
        assert_eq!(err.to_string(), "unrecognised Flavour value `sour`");
    }

    #[rstest]
    fn serde_uses_stored_text() {
        let json = serde_json::to_string(&Flavour::Umami).expect("serialise");

        assert_eq!(json, "\"umami\"");
        assert_eq!(Flavour::ALL.len(), 2);
    }
}
