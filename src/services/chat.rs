use crate::core::state::{Message, Notice};
use crate::services::ClientBounds;
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Body sent to the chat function.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub book_title: String,
    pub book_context: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatReply {
    pub message: String,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ChatBackend: ClientBounds {
    /// Next assistant turn for the transcript in `request`.
    async fn reply(&self, request: &ChatRequest) -> Result<String>;
}

pub fn greeting(book_title: &str) -> String {
    format!(
        "Hello! I'm your reading assistant for \"{}\". I can help explain concepts, \
summarize passages, or answer questions about what you're reading. How can I help you today?",
        book_title
    )
}

pub fn passage_prompt(selection: &str) -> String {
    format!("Explain this passage: \"{}\"", selection)
}

#[derive(Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Empty input, or a request was already in flight.
    Ignored,
    Replied,
    Failed(Notice),
}

/// A linear conversation about one book.
#[derive(Debug)]
pub struct ChatSession {
    book_title: String,
    messages: Vec<Message>,
    draft: String,
    context: String,
    loading: bool,
}

impl ChatSession {
    pub fn initialize(book_title: &str) -> Self {
        Self {
            book_title: book_title.to_string(),
            messages: vec![Message::assistant(greeting(book_title))],
            draft: String::new(),
            context: String::new(),
            loading: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Quote `selection` in the pending message. Nothing is sent until the user confirms.
    pub fn receive_selection(&mut self, selection: &str) {
        self.context = selection.to_string();
        self.draft = passage_prompt(selection);
    }

    /// Append the user turn and build the request, or `None` if `text` is
    /// blank or a reply is still pending.
    pub fn begin_send(&mut self, text: &str) -> Option<ChatRequest> {
        if text.trim().is_empty() || self.loading {
            return None;
        }

        self.messages.push(Message::user(text));
        self.draft.clear();
        self.loading = true;

        Some(ChatRequest {
            messages: self.messages.clone(),
            book_title: self.book_title.clone(),
            book_context: self.context.clone(),
        })
    }

    /// Record the outcome of the request from [`begin_send`](Self::begin_send).
    /// A failed request leaves the user turn unanswered.
    pub fn apply(&mut self, result: Result<String>) -> ChatOutcome {
        if !self.loading {
            debug!("Ignoring chat reply with no request in flight");
            return ChatOutcome::Ignored;
        }
        self.loading = false;

        match result {
            Ok(reply) => {
                self.messages.push(Message::assistant(reply));
                ChatOutcome::Replied
            }
            Err(e) => {
                warn!("Chat error: {:#}", e);
                ChatOutcome::Failed(Notice::error(
                    "Failed to send message",
                    "Please try again later",
                ))
            }
        }
    }

    pub async fn send(&mut self, backend: &dyn ChatBackend, text: &str) -> ChatOutcome {
        let Some(request) = self.begin_send(text) else {
            return ChatOutcome::Ignored;
        };
        let result = backend.reply(&request).await;
        self.apply(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Role;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct MockChat {
        requests: Arc<Mutex<Vec<ChatRequest>>>,
        fail: bool,
    }

    impl MockChat {
        fn new(fail: bool) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                fail,
            }
        }
    }

    #[async_trait]
    impl ChatBackend for MockChat {
        async fn reply(&self, request: &ChatRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                Err(anyhow!("chat function unavailable"))
            } else {
                Ok(format!("reply #{}", request.messages.len()))
            }
        }
    }

    #[test]
    fn test_initialize_seeds_greeting() {
        let session = ChatSession::initialize("Dune");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert!(session.messages()[0].content.contains("\"Dune\""));
        assert!(!session.is_loading());
    }

    #[test]
    fn test_selection_prefills_without_sending() {
        let mut session = ChatSession::initialize("Dune");
        session.receive_selection("the spice must flow");

        assert_eq!(session.draft(), "Explain this passage: \"the spice must flow\"");
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let backend = MockChat::new(false);
        let mut session = ChatSession::initialize("Dune");

        assert_eq!(session.send(&backend, "").await, ChatOutcome::Ignored);
        assert_eq!(session.send(&backend, "  \n\t").await, ChatOutcome::Ignored);
        assert_eq!(session.messages().len(), 1);
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_send_while_in_flight_is_ignored() {
        let mut session = ChatSession::initialize("Dune");

        assert!(session.begin_send("first").is_some());
        assert!(session.is_loading());
        assert!(session.begin_send("second").is_none());
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_request_carries_transcript_and_context() {
        let backend = MockChat::new(false);
        let mut session = ChatSession::initialize("Dune");
        session.receive_selection("the spice must flow");
        let draft = session.draft().to_string();

        assert_eq!(session.send(&backend, &draft).await, ChatOutcome::Replied);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].book_title, "Dune");
        assert_eq!(requests[0].book_context, "the spice must flow");
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[1], Message::user(draft.as_str()));

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(session.messages()[2].content, "reply #2");
        assert!(session.draft().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_unanswered_user_turn() {
        let failing = MockChat::new(true);
        let mut session = ChatSession::initialize("Dune");

        match session.send(&failing, "Who is Paul?").await {
            ChatOutcome::Failed(notice) => assert_eq!(notice.title, "Failed to send message"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!session.is_loading());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, Role::User);

        // a retry goes out with both unanswered user turns in the transcript
        let backend = MockChat::new(false);
        assert_eq!(session.send(&backend, "Who is Paul?").await, ChatOutcome::Replied);
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::Assistant, Role::User, Role::User, Role::Assistant]
        );
        assert_eq!(backend.requests.lock().unwrap()[0].messages.len(), 3);
    }

    #[test]
    fn test_stray_reply_is_ignored() {
        let mut session = ChatSession::initialize("Dune");
        assert_eq!(session.apply(Ok("hello".to_string())), ChatOutcome::Ignored);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_request_wire_format() {
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            book_title: "Dune".to_string(),
            book_context: String::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["bookTitle"], "Dune");
        assert_eq!(json["bookContext"], "");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
