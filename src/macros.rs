/// Defines a string-keyed identifier, e.g. a group type or a region.
///
/// The generated type is a newtype over `String` that serializes as a plain string, converts from
/// `&str` and `String`, and displays as its key.
macro_rules! define_string_id {
    ($(#[$meta:meta])* $id:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $id(String);

        impl $id {
            pub fn new(id: impl Into<String>) -> Self {
                $id(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $id {
            fn from(id: &str) -> Self {
                $id(id.to_string())
            }
        }

        impl From<String> for $id {
            fn from(id: String) -> Self {
                $id(id)
            }
        }

        impl std::fmt::Display for $id {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}
pub(crate) use define_string_id;

#[cfg(test)]
mod tests {
    define_string_id!(
        /// A test key.
        SiteId
    );

    #[test]
    fn string_ids_convert_and_display() {
        let id = SiteId::from("north");
        assert_eq!(id, SiteId::new("north".to_string()));
        assert_eq!(id.as_str(), "north");
        assert_eq!(id.to_string(), "north");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""north""#);
        let parsed: SiteId = serde_json::from_str(r#""south""#).unwrap();
        assert_eq!(parsed, SiteId::from("south"));
    }
}
