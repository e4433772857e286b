//! Lookup requests for the Estonian linguistics service.

use async_trait::async_trait;

use crate::errors::IntegrationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranslationDirection {
    EstonianToEnglish,
    EnglishToEstonian,
}

impl TranslationDirection {
    /// `et …` translates from Estonian, `en …` from English.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.trim().to_ascii_lowercase().as_str() {
            "et" => Some(Self::EstonianToEnglish),
            "en" => Some(Self::EnglishToEstonian),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EstonianToEnglish => "et-en",
            Self::EnglishToEstonian => "en-et",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Translation,
    Examples,
    Lemma,
    Etymology,
}

impl LookupKind {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Translation => "translate",
            Self::Examples => "examples",
            Self::Lemma => "lemma",
            Self::Etymology => "etymology",
        }
    }

    pub fn usage(&self) -> &'static str {
        match self {
            Self::Translation => "(et|en) <word-to-translate>",
            Self::Examples => "ekss <word-to-lookup>",
            Self::Lemma => "lemma <word-to-lookup>",
            Self::Etymology => "ety <word>",
        }
    }
}

/// Text following the command keyword that matched, trimmed. `None` when the
/// keyword is missing from the message or nothing follows it.
pub fn lookup_subject<'a>(message: &'a str, matched: &str) -> Option<&'a str> {
    let start = message.find(matched)? + matched.len();
    let subject = message[start..].trim();
    (!subject.is_empty()).then_some(subject)
}

#[async_trait]
pub trait Linguistics: Send + Sync {
    async fn translate(
        &self,
        word: &str,
        direction: TranslationDirection,
    ) -> Result<String, IntegrationError>;

    async fn examples(&self, word: &str) -> Result<String, IntegrationError>;

    async fn lemma(&self, word: &str) -> Result<String, IntegrationError>;

    async fn etymology(&self, word: &str) -> Result<String, IntegrationError>;
}

/// Stand-in used when no linguistics service URL is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredLinguistics;

#[async_trait]
impl Linguistics for UnconfiguredLinguistics {
    async fn translate(
        &self,
        _word: &str,
        _direction: TranslationDirection,
    ) -> Result<String, IntegrationError> {
        Err(IntegrationError::NotConfigured("linguistics service".to_owned()))
    }

    async fn examples(&self, _word: &str) -> Result<String, IntegrationError> {
        Err(IntegrationError::NotConfigured("linguistics service".to_owned()))
    }

    async fn lemma(&self, _word: &str) -> Result<String, IntegrationError> {
        Err(IntegrationError::NotConfigured("linguistics service".to_owned()))
    }

    async fn etymology(&self, _word: &str) -> Result<String, IntegrationError> {
        Err(IntegrationError::NotConfigured("linguistics service".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        lookup_subject, Linguistics, LookupKind, TranslationDirection, UnconfiguredLinguistics,
    };
    use crate::errors::IntegrationError;

    #[test]
    fn direction_follows_command_prefix() {
        assert_eq!(
            TranslationDirection::from_prefix("et "),
            Some(TranslationDirection::EstonianToEnglish)
        );
        assert_eq!(
            TranslationDirection::from_prefix("EN"),
            Some(TranslationDirection::EnglishToEstonian)
        );
        assert_eq!(TranslationDirection::from_prefix("fi"), None);
        assert_eq!(TranslationDirection::EnglishToEstonian.as_str(), "en-et");
        assert_eq!(TranslationDirection::EstonianToEnglish.as_str(), "et-en");
    }

    #[test]
    fn subject_is_text_after_matched_keyword() {
        assert_eq!(lookup_subject("ekss tere", "ekss "), Some("tere"));
        assert_eq!(lookup_subject("et  hea päev ", "et "), Some("hea päev"));
        assert_eq!(lookup_subject("lemma ", "lemma "), None);
        assert_eq!(lookup_subject("ety sauna", "lemma "), None);
    }

    #[test]
    fn lookup_kinds_name_their_operations() {
        assert_eq!(LookupKind::Examples.operation(), "examples");
        assert_eq!(LookupKind::Etymology.usage(), "ety <word>");
    }

    #[tokio::test]
    async fn unconfigured_service_reports_not_configured() {
        let error = UnconfiguredLinguistics.lemma("tere").await.expect_err("must fail");
        assert!(matches!(error, IntegrationError::NotConfigured(_)));
    }
}
