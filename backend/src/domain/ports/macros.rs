//! Helper macro generating driven-port error enums.
//!
//! Every driven port fails in one of two ways: its backend is unreachable,
//! or the backend rejected the operation. The macro emits the enum,
//! `impl Into<String>` constructors, and the mapping into the domain
//! [`Error`](crate::domain::Error) envelope so services can use `?` directly.
//!
//! Repositories declared `with revisions` also get a `RevisionMismatch`
//! variant, raised when a save states a revision the store no longer holds.
//! It maps to a `conflict` carrying both revisions.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident for $subject:literal
    ) => {
        define_port_error! { @emit $(#[$outer])* $name, $subject, {}, {} }
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident for $subject:literal with revisions
    ) => {
        define_port_error! {
            @emit $(#[$outer])* $name, $subject,
            {
                /// The stored row moved past the revision the caller read.
                #[error("{} revision mismatch: expected {expected}, found {actual}", $subject)]
                RevisionMismatch {
                    /// Revision the caller read.
                    expected: u32,
                    /// Revision the store holds.
                    actual: u32,
                },
            },
            {
                $name::RevisionMismatch { expected, actual } => {
                    ::tracing::debug!(subject = $subject, expected, actual, "stale write rejected");
                    $crate::domain::Error::conflict("revision mismatch").with_details(
                        ::serde_json::json!({
                            "code": "revision_mismatch",
                            "expectedRevision": expected,
                            "actualRevision": actual,
                        }),
                    )
                }
            }
        }
    };
    (
        @emit $(#[$outer:meta])* $name:ident, $subject:literal,
        { $($variants:tt)* }, { $($arms:tt)* }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            /// Backend could not be reached.
            #[error("{} connection failed: {message}", $subject)]
            Connection {
                /// Adapter-supplied description.
                message: String,
            },
            /// Backend rejected or failed the operation.
            #[error("{} query failed: {message}", $subject)]
            Query {
                /// Adapter-supplied description.
                message: String,
            },
            $($variants)*
        }

        impl $name {
            ::paste::paste! {
                /// Build a [`Self::Connection`] error.
                pub fn connection(message: impl Into<String>) -> Self {
                    Self::Connection { message: message.into() }
                }

                /// Build a [`Self::Query`] error.
                pub fn query(message: impl Into<String>) -> Self {
                    Self::Query { message: message.into() }
                }

                #[doc = "Subject named in messages produced by [`" $name "`]."]
                pub const SUBJECT: &'static str = $subject;
            }
        }

        impl From<$name> for $crate::domain::Error {
            fn from(error: $name) -> Self {
                match error {
                    $name::Connection { message } => {
                        ::tracing::error!(subject = $subject, %message, "driven port unavailable");
                        $crate::domain::Error::service_unavailable(format!(
                            "{} unavailable: {message}",
                            $subject
                        ))
                    }
                    $name::Query { message } => {
                        ::tracing::error!(subject = $subject, %message, "driven port failed");
                        $crate::domain::Error::internal(format!("{} error: {message}", $subject))
                    }
                    $($arms)*
                }
            }
        }
    };
}

pub(crate) use define_port_error;
