use crate::core::state::{Book, Message, Notice, NoticeKind, Role};
use crate::services::chat::{ChatOutcome, ChatRequest, ChatSession};
use crate::services::selection::capture_selection;
use crate::services::translation::{
    TargetLanguage, TranslationCompletion, TranslationController, TranslationOutcome,
    TranslationRequest,
};
use crate::utils::pages::Pages;
use anyhow::Result;
use log::info;

/// Owns everything one open book needs: pages, view state, translation and chat.
///
/// All mutation goes through `&mut self` on the thread that handles input.
/// Remote calls are described by the returned request values and run by the
/// caller; their results come back through `apply_*`.
pub struct ReaderShell {
    book: Book,
    page_size: usize,
    pages: Pages,
    current_page: usize,
    loading_content: bool,
    translation: TranslationController,
    chat: ChatSession,
    chat_open: bool,
    notices: Vec<Notice>,
    on_back: Box<dyn FnMut()>,
}

impl ReaderShell {
    pub fn new(book: Book, page_size: usize, on_back: Box<dyn FnMut()>) -> Self {
        let chat = ChatSession::initialize(&book.title);
        Self {
            book,
            page_size,
            pages: Pages::default(),
            current_page: 0,
            loading_content: false,
            translation: TranslationController::new(),
            chat,
            chat_open: false,
            notices: Vec::new(),
            on_back,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_loading_content(&self) -> bool {
        self.loading_content
    }

    pub fn translation(&self) -> &TranslationController {
        &self.translation
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatSession {
        &mut self.chat
    }

    pub fn is_chat_open(&self) -> bool {
        self.chat_open
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Mark the content fetch as started.
    pub fn begin_loading(&mut self) {
        self.loading_content = true;
    }

    /// Install freshly synthesized text and go back to the first page.
    pub fn set_text(&mut self, text: &str) -> Option<TranslationRequest> {
        self.pages = Pages::from_text(text, self.page_size);
        self.current_page = 0;
        self.loading_content = false;
        info!(
            "Loaded \"{}\": {} page(s)",
            self.book.title,
            self.pages.len()
        );
        self.translation.on_page_change(0, self.pages.get(0))
    }

    pub fn go_to_page(&mut self, index: usize) -> Option<TranslationRequest> {
        let index = self.pages.clamp(index);
        if index == self.current_page {
            return None;
        }
        self.current_page = index;
        self.translation
            .on_page_change(index, self.pages.get(index))
    }

    pub fn next_page(&mut self) -> Option<TranslationRequest> {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> Option<TranslationRequest> {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    pub fn select_language(&mut self, language: TargetLanguage) -> Option<TranslationRequest> {
        self.translation.select_language(
            language,
            self.current_page,
            self.pages.get(self.current_page),
        )
    }

    pub fn apply_translation(&mut self, completion: TranslationCompletion) {
        match self.translation.apply(completion) {
            TranslationOutcome::Applied => self.post_notice(Notice::info(
                "Translation complete",
                "The page has been translated",
            )),
            TranslationOutcome::Failed(notice) => self.post_notice(notice),
            TranslationOutcome::Discarded => {}
        }
    }

    pub fn displayed_text(&self) -> &str {
        self.translation
            .displayed(self.current_page, self.pages.get(self.current_page))
    }

    /// Pointer released over the page. A non-blank selection seeds the chat
    /// and opens it. Returns whether the chat was opened.
    pub fn on_pointer_release(&mut self, selection: &str) -> bool {
        let Some(selected) = capture_selection(selection) else {
            return false;
        };
        self.chat.receive_selection(selected.as_str());
        self.chat_open = true;
        true
    }

    pub fn toggle_chat(&mut self) {
        self.chat_open = !self.chat_open;
    }

    pub fn send_chat(&mut self, text: &str) -> Option<ChatRequest> {
        self.chat.begin_send(text)
    }

    pub fn apply_chat(&mut self, result: Result<String>) {
        if let ChatOutcome::Failed(notice) = self.chat.apply(result) {
            self.post_notice(notice);
        }
    }

    /// A notice replaces any earlier one with the same title.
    fn post_notice(&mut self, notice: Notice) {
        self.notices.retain(|n| n.title != notice.title);
        self.notices.push(notice);
    }

    /// Drop the oldest notice.
    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        if self.notices.is_empty() {
            None
        } else {
            Some(self.notices.remove(0))
        }
    }

    /// The user asked to leave the reader.
    pub fn back(&mut self) {
        (self.on_back)();
    }

    pub fn render(&self, width: usize) -> String {
        let width = width.max(20);
        let rule = "-".repeat(width);
        let mut out = String::new();

        out += &format!("{}\n{}\n", self.book.title, self.book.authors_line());

        let mut status = if self.loading_content {
            "Loading...".to_string()
        } else {
            format!("Page {} of {}", self.current_page + 1, self.pages.len())
        };
        status += &format!(" | Language: {}", self.translation.language());
        if self.translation.is_translating() {
            status += " | Translating...";
        }
        out += &format!("{}\n{}\n", status, rule);

        for line in wrap(self.displayed_text(), width) {
            out += &line;
            out.push('\n');
        }

        if self.chat_open {
            out += &format!("{}\nAI Reading Assistant\n", rule);
            if !self.chat.context().is_empty() {
                for line in wrap(&format!("Passage: {}", self.chat.context()), width) {
                    out += &line;
                    out.push('\n');
                }
            }
            out += &format!("{}\n", rule);
            for message in self.chat.messages() {
                for line in wrap(&speaker_line(message), width) {
                    out += &line;
                    out.push('\n');
                }
            }
            if self.chat.is_loading() {
                out += "Assistant is thinking...\n";
            }
            if !self.chat.draft().is_empty() {
                out += &format!("> {}\n", self.chat.draft());
            }
        }

        for notice in &self.notices {
            let marker = match notice.kind {
                NoticeKind::Info => "[i]",
                NoticeKind::Error => "[!]",
            };
            out += &format!("{} {}: {}\n", marker, notice.title, notice.description);
        }

        out
    }
}

fn speaker_line(message: &Message) -> String {
    let speaker = match message.role {
        Role::Assistant => "Assistant",
        Role::User => "You",
    };
    format!("{}: {}", speaker, message.content)
}

/// Wrap each line to `width` columns. Blank lines are kept.
fn wrap(text: &str, width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|raw| textwrap::wrap(raw, width))
        .map(|line| line.into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::{load_text, CatalogClient, Volume};
    use crate::services::translation::{execute, Translator};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct OfflineCatalog;

    #[async_trait]
    impl CatalogClient for OfflineCatalog {
        async fn fetch_volume(&self, _id: &str) -> Result<Volume> {
            Err(anyhow!("network unreachable"))
        }

        async fn search(&self, _query: &str, _max_results: u32) -> Result<Vec<Book>> {
            Err(anyhow!("network unreachable"))
        }
    }

    #[derive(Debug, Default)]
    struct EchoTranslator {
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), target_language.to_string()));
            Ok(format!("<{}>{}", target_language, text.len()))
        }
    }

    fn dune() -> Book {
        Book {
            id: "dune".to_string(),
            title: "Dune".to_string(),
            authors: vec!["Frank Herbert".to_string()],
            ..Default::default()
        }
    }

    fn shell_with_pages(pages: usize) -> ReaderShell {
        let mut shell = ReaderShell::new(dune(), 9, Box::new(|| {}));
        let text: String = (0..pages).map(|p| format!("page{:05}", p)).collect();
        shell.set_text(&text);
        shell
    }

    #[tokio::test]
    async fn test_offline_book_shows_local_fields() {
        let mut shell = ReaderShell::new(dune(), 2000, Box::new(|| {}));
        shell.begin_loading();
        assert!(shell.is_loading_content());

        let text = load_text(&OfflineCatalog, shell.book()).await;
        assert!(shell.set_text(&text).is_none());

        assert!(!shell.is_loading_content());
        assert_eq!(shell.page_count(), 1);
        let page = shell.displayed_text();
        assert!(page.contains("Dune"));
        assert!(page.contains("Frank Herbert"));
        assert!(page.contains("not available"));
    }

    #[test]
    fn test_navigation_is_bounded() {
        let mut shell = shell_with_pages(3);
        assert_eq!(shell.page_count(), 3);

        shell.prev_page();
        assert_eq!(shell.current_page(), 0);
        shell.next_page();
        shell.next_page();
        shell.next_page();
        assert_eq!(shell.current_page(), 2);
        shell.go_to_page(99);
        assert_eq!(shell.current_page(), 2);
        assert_eq!(shell.displayed_text(), "page00002");
    }

    #[tokio::test]
    async fn test_page_change_translates_new_page() {
        let translator = EchoTranslator::default();
        let mut shell = shell_with_pages(2);

        let req = shell.select_language(TargetLanguage::parse("hi").unwrap()).unwrap();
        shell.apply_translation(execute(&translator, req).await);
        assert_eq!(shell.displayed_text(), "<hi>9");

        let req = shell.next_page().unwrap();
        assert_eq!(req.key.page, 1);
        assert_eq!(req.text, "page00001");
        assert_eq!(shell.displayed_text(), "page00001");
        shell.apply_translation(execute(&translator, req).await);
        assert_eq!(shell.displayed_text(), "<hi>9");

        let calls = translator.calls.lock().unwrap();
        assert_eq!(calls[1], ("page00001".to_string(), "hi".to_string()));
    }

    #[tokio::test]
    async fn test_late_translation_does_not_overwrite_new_page() {
        let translator = EchoTranslator::default();
        let mut shell = shell_with_pages(2);

        let stale = shell.select_language(TargetLanguage::parse("hi").unwrap()).unwrap();
        let fresh = shell.next_page().unwrap();

        let stale_done = execute(&translator, stale).await;
        shell.apply_translation(stale_done);
        assert_eq!(shell.displayed_text(), "page00001");
        assert!(shell.translation().is_translating());
        assert!(shell.notices().is_empty());

        shell.apply_translation(execute(&translator, fresh).await);
        assert_eq!(shell.displayed_text(), "<hi>9");
    }

    #[tokio::test]
    async fn test_translation_failure_posts_notice() {
        let mut shell = shell_with_pages(1);
        let req = shell.select_language(TargetLanguage::parse("hi").unwrap()).unwrap();

        shell.apply_translation(TranslationCompletion {
            key: req.key,
            result: Err(anyhow!("503")),
        });

        assert_eq!(shell.displayed_text(), "page00000");
        assert_eq!(shell.notices().len(), 1);
        assert_eq!(shell.notices()[0].kind, NoticeKind::Error);
        assert!(shell.dismiss_notice().is_some());
        assert!(shell.notices().is_empty());
    }

    #[test]
    fn test_selection_opens_prefilled_chat() {
        let mut shell = shell_with_pages(1);

        assert!(!shell.on_pointer_release("   "));
        assert!(!shell.is_chat_open());

        assert!(shell.on_pointer_release("the spice must flow"));
        assert!(shell.is_chat_open());
        assert_eq!(shell.chat().context(), "the spice must flow");
        assert_eq!(
            shell.chat().draft(),
            "Explain this passage: \"the spice must flow\""
        );
        assert_eq!(shell.chat().messages().len(), 1);
    }

    #[test]
    fn test_chat_failure_posts_notice() {
        let mut shell = shell_with_pages(1);
        let request = shell.send_chat("What is melange?").unwrap();
        assert_eq!(request.book_title, "Dune");

        shell.apply_chat(Err(anyhow!("timeout")));
        assert_eq!(shell.notices()[0].title, "Failed to send message");
        assert_eq!(shell.chat().messages().len(), 2);
    }

    #[test]
    fn test_back_invokes_callback() {
        let left = Rc::new(Cell::new(false));
        let flag = left.clone();
        let mut shell = ReaderShell::new(dune(), 2000, Box::new(move || flag.set(true)));

        shell.back();
        assert!(left.get());
    }

    #[test]
    fn test_render_layout() {
        let mut shell = shell_with_pages(2);
        shell.select_language(TargetLanguage::parse("fr").unwrap());
        shell.on_pointer_release("page00000");

        let screen = shell.render(40);
        assert!(screen.starts_with("Dune\nFrank Herbert\n"));
        assert!(screen.contains("Page 1 of 2 | Language: French (fr) | Translating..."));
        assert!(screen.contains("AI Reading Assistant"));
        assert!(screen.contains("Passage: page00000"));
        assert!(screen.contains("> Explain this passage: \"page00000\""));
    }

    #[tokio::test]
    async fn test_language_chosen_while_loading_waits_for_text() {
        let translator = EchoTranslator::default();
        let mut shell = ReaderShell::new(dune(), 9, Box::new(|| {}));
        shell.begin_loading();

        assert!(shell.select_language(TargetLanguage::parse("hi").unwrap()).is_none());
        assert!(!shell.translation().is_translating());

        let req = shell.set_text("page00000page00001").unwrap();
        assert_eq!(req.key.page, 0);
        assert_eq!(req.text, "page00000");
        shell.apply_translation(execute(&translator, req).await);
        assert_eq!(shell.displayed_text(), "<hi>9");
        assert_eq!(translator.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_paging_with_language_keeps_notices_bounded() {
        let translator = EchoTranslator::default();
        let mut shell = shell_with_pages(30);

        let req = shell.select_language(TargetLanguage::parse("hi").unwrap()).unwrap();
        shell.apply_translation(execute(&translator, req).await);
        for _ in 0..29 {
            let req = shell.next_page().unwrap();
            shell.apply_translation(execute(&translator, req).await);
        }

        assert_eq!(shell.current_page(), 29);
        assert_eq!(shell.notices().len(), 1);
        assert_eq!(shell.render(80).matches("Translation complete").count(), 1);
    }

    #[test]
    fn test_new_notice_kinds_are_kept_apart() {
        let mut shell = shell_with_pages(1);
        let req = shell.select_language(TargetLanguage::parse("hi").unwrap()).unwrap();
        shell.apply_translation(TranslationCompletion {
            key: req.key,
            result: Err(anyhow!("503")),
        });
        shell.send_chat("What is melange?").unwrap();
        shell.apply_chat(Err(anyhow!("timeout")));

        let titles: Vec<&str> = shell.notices().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Translation failed", "Failed to send message"]);
    }

    #[test]
    fn test_wrap_respects_width_and_blank_lines() {
        let lines = wrap("one two three four\n\nfive", 9);
        assert_eq!(lines, vec!["one two", "three", "four", "", "five"]);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let url = format!("http://{}", "a".repeat(60));
        let lines = wrap(&url, 20);

        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 20), "{lines:?}");
        assert_eq!(lines.concat(), url);
    }
}
