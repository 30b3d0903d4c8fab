//! Localised user-facing copy for domain failures.
//!
//! The dashboard ships in English and Arabic. Domain errors carry developer
//! oriented messages; screens show the short, actionable text returned by
//! [`ErrorCode::user_message`] instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Error as DomainError, ErrorCode};

/// Display language of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English copy.
    #[default]
    English,
    /// Arabic copy.
    Arabic,
}

/// Errors returned when parsing a [`Locale`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleParseError {
    /// The language tag does not name a supported language.
    #[error("unsupported locale '{tag}'")]
    Unsupported {
        /// Raw tag supplied by the caller.
        tag: String,
    },
}

impl Locale {
    /// Primary language subtag (`en` or `ar`).
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Arabic => "ar",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = LocaleParseError;

    /// Accept a BCP 47 tag and match on its primary language subtag, so
    /// `ar-SA` and `en-GB` resolve to their base language.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Self::English),
            "ar" => Ok(Self::Arabic),
            _ => Err(LocaleParseError::Unsupported {
                tag: tag.to_owned(),
            }),
        }
    }
}

impl ErrorCode {
    /// Short message suitable for showing to a dashboard operator.
    ///
    /// # Examples
    /// ```
    /// use fleet_backend::domain::{ErrorCode, Locale};
    ///
    /// let text = ErrorCode::RefidUnavailable.user_message(Locale::English);
    /// assert!(text.contains("try again"));
    /// ```
    pub fn user_message(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::InvalidRequest, Locale::English) => "The submitted data is invalid.",
            (Self::InvalidRequest, Locale::Arabic) => "البيانات المرسلة غير صالحة.",
            (Self::NotFound, Locale::English) => "The requested record was not found.",
            (Self::NotFound, Locale::Arabic) => "السجل المطلوب غير موجود.",
            (Self::Conflict, Locale::English) => {
                "The record conflicts with existing data. Please try again."
            }
            (Self::Conflict, Locale::Arabic) => {
                "السجل يتعارض مع بيانات موجودة. يرجى المحاولة مرة أخرى."
            }
            (Self::RefidUnavailable, Locale::English) => {
                "Failed to generate a reference code. Please try again."
            }
            (Self::RefidUnavailable, Locale::Arabic) => {
                "تعذر إنشاء رمز مرجعي. يرجى المحاولة مرة أخرى."
            }
            (Self::ServiceUnavailable, Locale::English) => {
                "The data service is unavailable. Please try again later."
            }
            (Self::ServiceUnavailable, Locale::Arabic) => {
                "خدمة البيانات غير متاحة. يرجى المحاولة لاحقاً."
            }
            (Self::InternalError, Locale::English) => "Something went wrong.",
            (Self::InternalError, Locale::Arabic) => "حدث خطأ ما.",
        }
    }
}

impl DomainError {
    /// Localised operator-facing message for this error's code.
    pub fn user_message(&self, locale: Locale) -> &'static str {
        self.code().user_message(locale)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for locale parsing and localised copy.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("en", Locale::English)]
    #[case("en-GB", Locale::English)]
    #[case("AR", Locale::Arabic)]
    #[case(" ar_SA ", Locale::Arabic)]
    fn parses_primary_language_subtag(#[case] tag: &str, #[case] expected: Locale) {
        assert_eq!(tag.parse::<Locale>(), Ok(expected));
    }

    #[rstest]
    #[case("fr")]
    #[case("")]
    fn rejects_unsupported_tags(#[case] tag: &str) {
        let err = tag.parse::<Locale>().expect_err("unsupported locale");
        assert!(matches!(err, LocaleParseError::Unsupported { .. }));
    }

    #[rstest]
    fn every_code_has_distinct_copy_per_locale() {
        let codes = [
            ErrorCode::InvalidRequest,
            ErrorCode::NotFound,
            ErrorCode::Conflict,
            ErrorCode::RefidUnavailable,
            ErrorCode::ServiceUnavailable,
            ErrorCode::InternalError,
        ];
        for code in codes {
            let english = code.user_message(Locale::English);
            let arabic = code.user_message(Locale::Arabic);
            assert!(!english.trim().is_empty());
            assert!(!arabic.trim().is_empty());
            assert_ne!(english, arabic);
        }
    }

    #[rstest]
    fn domain_error_delegates_to_code() {
        let error = DomainError::refid_unavailable("exhausted after 10 attempts");
        assert_eq!(
            error.user_message(Locale::Arabic),
            ErrorCode::RefidUnavailable.user_message(Locale::Arabic)
        );
    }
}
