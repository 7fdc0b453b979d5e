use crate::core::state::Notice;
use crate::services::ClientBounds;
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fmt;

/// Selectable target languages, code and display name.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("hi", "Hindi"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("ja", "Japanese"),
    ("zh", "Chinese"),
    ("ar", "Arabic"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("bn", "Bengali"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
];

pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Translator: ClientBounds {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetLanguage {
    #[default]
    Original,
    Code(String),
}

impl TargetLanguage {
    /// `"original"` in any case is the sentinel; anything else is a language
    /// code. Blank input names no language.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            None
        } else if input.eq_ignore_ascii_case("original") {
            Some(TargetLanguage::Original)
        } else {
            Some(TargetLanguage::Code(input.to_string()))
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetLanguage::Original => write!(f, "Original"),
            TargetLanguage::Code(code) => match language_name(code) {
                Some(name) => write!(f, "{} ({})", name, code),
                None => write!(f, "{}", code),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationState {
    Original,
    Translating,
    Translated,
    Failed,
}

/// Identifies the view a translation request was issued for. A response is
/// only applied while its key is still the pending one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    pub page: usize,
    pub language: String,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub key: TranslationKey,
    pub text: String,
}

#[derive(Debug)]
pub struct TranslationCompletion {
    pub key: TranslationKey,
    pub result: Result<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TranslationOutcome {
    Applied,
    Failed(Notice),
    Discarded,
}

/// Issue the remote call for `request`. This is the only suspension point.
pub async fn execute(translator: &dyn Translator, request: TranslationRequest) -> TranslationCompletion {
    debug!(
        "Translating page {} into {} ({} chars)",
        request.key.page,
        request.key.language,
        request.text.chars().count()
    );
    let result = translator.translate(&request.text, &request.key.language).await;
    TranslationCompletion {
        key: request.key,
        result,
    }
}

#[derive(Debug)]
pub struct TranslationController {
    language: TargetLanguage,
    state: TranslationState,
    generation: u64,
    pending: Option<TranslationKey>,
    translated: Option<(TranslationKey, String)>,
}

impl Default for TranslationController {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationController {
    pub fn new() -> Self {
        Self {
            language: TargetLanguage::Original,
            state: TranslationState::Original,
            generation: 0,
            pending: None,
            translated: None,
        }
    }

    pub fn language(&self) -> &TargetLanguage {
        &self.language
    }

    pub fn state(&self) -> TranslationState {
        self.state
    }

    pub fn is_translating(&self) -> bool {
        self.state == TranslationState::Translating
    }

    /// Switch the target language for the page currently shown. Returns the
    /// request to issue, or `None` when switching back to the original text
    /// or when the page has no text yet.
    pub fn select_language(
        &mut self,
        language: TargetLanguage,
        page: usize,
        page_text: &str,
    ) -> Option<TranslationRequest> {
        self.generation += 1;
        self.translated = None;
        self.language = language;

        match &self.language {
            TargetLanguage::Original => {
                self.state = TranslationState::Original;
                self.pending = None;
                None
            }
            TargetLanguage::Code(code) if page_text.is_empty() => {
                debug!("Page {} is empty, deferring translation into {}", page, code);
                self.state = TranslationState::Original;
                self.pending = None;
                None
            }
            TargetLanguage::Code(code) => {
                let key = TranslationKey {
                    page,
                    language: code.clone(),
                    generation: self.generation,
                };
                self.state = TranslationState::Translating;
                self.pending = Some(key.clone());
                Some(TranslationRequest {
                    key,
                    text: page_text.to_string(),
                })
            }
        }
    }

    /// The shown page changed. Translations are not kept across pages, so a
    /// selected language is requested again for the new page.
    pub fn on_page_change(&mut self, page: usize, page_text: &str) -> Option<TranslationRequest> {
        if self.language == TargetLanguage::Original {
            self.translated = None;
            return None;
        }
        self.select_language(self.language.clone(), page, page_text)
    }

    pub fn apply(&mut self, completion: TranslationCompletion) -> TranslationOutcome {
        if self.pending.as_ref() != Some(&completion.key) {
            debug!(
                "Discarding stale translation for page {} ({})",
                completion.key.page, completion.key.language
            );
            return TranslationOutcome::Discarded;
        }
        self.pending = None;

        match completion.result {
            Ok(text) => {
                info!(
                    "Translation of page {} into {} applied",
                    completion.key.page, completion.key.language
                );
                self.state = TranslationState::Translated;
                self.translated = Some((completion.key, text));
                TranslationOutcome::Applied
            }
            Err(e) => {
                warn!("Translation error: {:#}", e);
                self.state = TranslationState::Failed;
                self.translated = None;
                TranslationOutcome::Failed(Notice::error(
                    "Translation failed",
                    "Please try again later",
                ))
            }
        }
    }

    /// Text to show for `page`: the translation when one is held for it,
    /// otherwise the untouched original.
    pub fn displayed<'a>(&'a self, page: usize, original: &'a str) -> &'a str {
        match (&self.state, &self.translated) {
            (TranslationState::Translated, Some((key, text))) if key.page == page => text.as_str(),
            _ => original,
        }
    }
}
