//! Enum bridging.
//!
//! Enums tagged as string-sum types serialize to their variant name and
//! re-parse case-insensitively; other enums bridge as their variant index.
//! Conversion may fall back to a declared default variant.

use core_types::{MouseButton, RuntimeError, ScriptValue, WindowMode};

/// An enum the bridge knows how to convert.
pub trait ScriptEnum: Sized + Copy + PartialEq + 'static {
    /// Type name used in conversion error messages.
    const NAME: &'static str;

    /// Whether the enum bridges as a string-sum type (variant names)
    /// rather than as integers.
    const STRING_SUM: bool;

    /// All variants with their script-visible names, in declaration order.
    fn variants() -> &'static [(&'static str, Self)];

    /// Fallback used when conversion fails, if the enum declares one.
    fn fallback() -> Option<Self> {
        None
    }

    /// The declaration index of this variant.
    fn index(self) -> i32 {
        Self::variants()
            .iter()
            .position(|(_, v)| *v == self)
            .map(|i| i as i32)
            .unwrap_or(0)
    }

    /// The script-visible name of this variant.
    fn name(self) -> &'static str {
        Self::variants()
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(n, _)| *n)
            .unwrap_or(Self::NAME)
    }
}

impl ScriptEnum for MouseButton {
    const NAME: &'static str = "MouseButton";
    const STRING_SUM: bool = true;

    fn variants() -> &'static [(&'static str, Self)] {
        &[
            ("left", MouseButton::Left),
            ("right", MouseButton::Right),
            ("middle", MouseButton::Middle),
        ]
    }
}

impl ScriptEnum for WindowMode {
    const NAME: &'static str = "WindowMode";
    const STRING_SUM: bool = true;

    fn variants() -> &'static [(&'static str, Self)] {
        &[
            ("windowed", WindowMode::Windowed),
            ("fullscreen", WindowMode::Fullscreen),
            ("borderless", WindowMode::Borderless),
        ]
    }

    fn fallback() -> Option<Self> {
        Some(WindowMode::Windowed)
    }
}

/// Converts an enum to its script representation.
pub fn enum_to_script<E: ScriptEnum + 'static>(value: E) -> ScriptValue {
    if E::STRING_SUM {
        ScriptValue::String(value.name().to_string())
    } else {
        ScriptValue::Int(value.index())
    }
}

/// Converts a script value back to an enum.
///
/// Strings match variant names case-insensitively; integers match the
/// declaration index. Anything else uses the declared fallback or fails
/// with `CantConvert`.
pub fn enum_from_script<E: ScriptEnum + 'static>(value: &ScriptValue) -> Result<E, RuntimeError> {
    let found = match value {
        ScriptValue::String(s) => E::variants()
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, v)| *v),
        ScriptValue::Int(n) => E::variants().get(*n as usize).map(|(_, v)| *v),
        _ => None,
    };
    found.or_else(E::fallback).ok_or_else(|| {
        RuntimeError::CantConvert(format!("{} expected, found {}", E::NAME, value.type_of()))
    })
}
