//! Status helper enum mapping to the SMALLINT `export_statuses` lookup table.
//!
//! The variant discriminants match the seed data in the migrations. Status
//! ids in queries are always bound from this enum, never as literals.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// The lookup-table name for this status.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }

            /// Parse a lookup-table name (used by path parameters).
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Clip export lifecycle status.
    ExportStatus {
        Queued = 1 => "queued",
        Processing = 2 => "processing",
        Ready = 3 => "ready",
        Error = 4 => "error",
    }
}

impl ExportStatus {
    /// Statuses that still hold the pending slot.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_status_ids_match_seed_data() {
        assert_eq!(ExportStatus::Queued.id(), 1);
        assert_eq!(ExportStatus::Processing.id(), 2);
        assert_eq!(ExportStatus::Ready.id(), 3);
        assert_eq!(ExportStatus::Error.id(), 4);
    }

    #[test]
    fn names_round_trip() {
        for status in [
            ExportStatus::Queued,
            ExportStatus::Processing,
            ExportStatus::Ready,
            ExportStatus::Error,
        ] {
            assert_eq!(ExportStatus::from_name(status.name()), Some(status));
        }
        assert_eq!(ExportStatus::from_name("done"), None);
    }

    #[test]
    fn pending_covers_queued_and_processing() {
        assert!(ExportStatus::Queued.is_pending());
        assert!(ExportStatus::Processing.is_pending());
        assert!(!ExportStatus::Ready.is_pending());
        assert!(!ExportStatus::Error.is_pending());
    }
}
