//! Closed status enums for pipeline entities.
//!
//! Every status/phase field is parsed exactly once, at the serde or store
//! boundary, into an enum. Parsing ignores case and collapses whitespace so
//! that `"qualified"`, `"QUALIFIED"` and `" Qualified "` all land on the same
//! variant; rules then compare variants only.

/// Normalizes a raw status label for comparison.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Declares a status enum with its canonical labels.
///
/// The generated type serializes as its canonical label and deserializes
/// from any case variant of it.
macro_rules! define_status {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Default,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Canonical label stored and broadcast for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::errors::ValidationError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let normalized = $crate::utils::status::normalize_label(s);
                $(
                    if normalized == $crate::utils::status::normalize_label($label) {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::errors::ValidationError::UnknownStatus {
                    field: $field,
                    value: s.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::errors::ValidationError;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

pub(crate) use define_status;

#[cfg(test)]
mod tests {
    use super::normalize_label;

    #[test]
    fn test_normalize_label_collapses_whitespace_and_case() {
        assert_eq!(normalize_label("  Closed   Won "), "closed won");
        assert_eq!(normalize_label("NO ORDER"), "no order");
        assert_eq!(normalize_label(""), "");
    }
}
