// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared across the crate.

/// `Display` impl mapping unit enum variants to their wire names.
///
/// Every tag in the system (environments, platforms, host OSes, cache
/// folders, service states) renders as a fixed lower-case token used in
/// paths, bucket keys, and API payloads; this keeps each mapping next to
/// its enum without a serde round-trip.
///
/// ```ignore
/// anvil_core::simple_display! {
///     Environment {
///         Develop => "develop",
///         Testing => "testing",
///         Production => "production",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant => $str, )+
                })
            }
        }
    };
}
