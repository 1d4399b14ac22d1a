//! Toast categories.
//!
//! Each category maps to the style class the notification surface applies.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastCategory {
    Success,
    Error,
    #[default]
    Neutral,
}

impl ToastCategory {
    /// Style class applied to the notification surface.
    pub fn class_name(&self) -> &'static str {
        match self {
            ToastCategory::Success => "toast success",
            ToastCategory::Error => "toast error",
            ToastCategory::Neutral => "toast",
        }
    }

    /// Short label used by text-only surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            ToastCategory::Success => "ok",
            ToastCategory::Error => "error",
            ToastCategory::Neutral => "info",
        }
    }
}

impl fmt::Display for ToastCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names() {
        assert_eq!(ToastCategory::Success.class_name(), "toast success");
        assert_eq!(ToastCategory::Error.class_name(), "toast error");
        assert_eq!(ToastCategory::Neutral.class_name(), "toast");
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(ToastCategory::default(), ToastCategory::Neutral);
        assert_eq!(ToastCategory::default().to_string(), "info");
    }
}
