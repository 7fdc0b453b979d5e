use crate::core::config::Config;
use crate::core::state::Book;
use crate::services::catalog::{load_text, CatalogClient};
use crate::services::chat::{ChatBackend, ChatRequest};
use crate::services::reader::ReaderShell;
use crate::services::translation::{
    execute, language_name, TargetLanguage, TranslationCompletion, TranslationRequest, Translator,
};
use anyhow::{anyhow, bail, Result};
use log::debug;
use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

const HELP: &str = "Commands:
  n | next            next page
  p | prev            previous page
  g <page>            go to page
  lang <code>         translate pages into <code> (\"original\" to switch back)
  langs               list configured languages
  select <text>       select a passage and ask the assistant about it
  chat                open or close the assistant
  send [text]         send text, or the pending message when omitted
  dismiss             dismiss the oldest notice
  q | back            leave the reader";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Goto(usize),
    Language(TargetLanguage),
    Languages,
    Select(String),
    Chat,
    Send(Option<String>),
    Dismiss,
    Help,
    Back,
}

/// Parse one input line. Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "p" | "prev" => Command::Prev,
        "g" | "goto" => {
            let page: usize = rest
                .parse()
                .map_err(|_| anyhow!("Expected a page number, got \"{}\"", rest))?;
            if page == 0 {
                bail!("Pages are numbered from 1");
            }
            Command::Goto(page - 1)
        }
        "lang" => {
            let Some(language) = TargetLanguage::parse(rest) else {
                bail!("Usage: lang <code|original>");
            };
            Command::Language(language)
        }
        "langs" => Command::Languages,
        "select" => Command::Select(rest.to_string()),
        "chat" => Command::Chat,
        "send" => Command::Send(Some(rest.to_string()).filter(|s| !s.is_empty())),
        "dismiss" => Command::Dismiss,
        "help" | "?" => Command::Help,
        "q" | "quit" | "back" => Command::Back,
        other => bail!("Unknown command \"{}\". Type help for a list.", other),
    };
    Ok(Some(command))
}

/// Remote call results, delivered back to the loop that owns the reader.
enum Completion {
    Content(String),
    Translation(TranslationCompletion),
    Chat(Result<String>),
}

pub struct Clients {
    pub catalog: Arc<dyn CatalogClient>,
    pub translator: Arc<dyn Translator>,
    pub chat: Arc<dyn ChatBackend>,
}

struct Dispatcher {
    clients: Clients,
    tx: UnboundedSender<Completion>,
}

impl Dispatcher {
    fn load(&self, book: Book) {
        let catalog = self.clients.catalog.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let text = load_text(catalog.as_ref(), &book).await;
            let _ = tx.send(Completion::Content(text));
        });
    }

    fn translate(&self, request: Option<TranslationRequest>) {
        let Some(request) = request else {
            return;
        };
        let translator = self.clients.translator.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let done = execute(translator.as_ref(), request).await;
            let _ = tx.send(Completion::Translation(done));
        });
    }

    fn chat(&self, request: ChatRequest) {
        let backend = self.clients.chat.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.reply(&request).await;
            let _ = tx.send(Completion::Chat(result));
        });
    }
}

/// Run the interactive reader until the user leaves it.
pub async fn run_reader(book: Book, config: &Config, clients: Clients) -> Result<()> {
    let left = Rc::new(Cell::new(false));
    let flag = left.clone();
    let mut shell = ReaderShell::new(
        book.clone(),
        config.reader.page_size,
        Box::new(move || flag.set(true)),
    );

    let (tx, mut rx) = unbounded_channel();
    let dispatcher = Dispatcher { clients, tx };

    shell.begin_loading();
    dispatcher.load(book);

    let width = terminal_width();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    redraw(&shell, width)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => match parse_command(&line) {
                        Ok(Some(command)) => handle(command, &mut shell, &dispatcher, &config.reader.languages),
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    },
                    None => shell.back(),
                }
            }
            Some(done) = rx.recv() => match done {
                Completion::Content(text) => {
                    let request = shell.set_text(&text);
                    dispatcher.translate(request);
                }
                Completion::Translation(done) => shell.apply_translation(done),
                Completion::Chat(result) => shell.apply_chat(result),
            },
        }

        if left.get() {
            debug!("Leaving reader");
            break;
        }
        redraw(&shell, width)?;
    }
    Ok(())
}

fn handle(command: Command, shell: &mut ReaderShell, dispatcher: &Dispatcher, languages: &[String]) {
    match command {
        Command::Next => dispatcher.translate(shell.next_page()),
        Command::Prev => dispatcher.translate(shell.prev_page()),
        Command::Goto(index) => dispatcher.translate(shell.go_to_page(index)),
        Command::Language(language) => dispatcher.translate(shell.select_language(language)),
        Command::Languages => {
            println!("original");
            for code in languages {
                println!("{} - {}", code, language_name(code).unwrap_or("unknown"));
            }
        }
        Command::Select(text) => {
            if !shell.on_pointer_release(&text) {
                println!("Nothing selected.");
            }
        }
        Command::Chat => shell.toggle_chat(),
        Command::Send(text) => {
            let text = text.unwrap_or_else(|| shell.chat().draft().to_string());
            if let Some(request) = shell.send_chat(&text) {
                if !shell.is_chat_open() {
                    shell.toggle_chat();
                }
                dispatcher.chat(request);
            }
        }
        Command::Dismiss => {
            shell.dismiss_notice();
        }
        Command::Help => println!("{}", HELP),
        Command::Back => shell.back(),
    }
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(80)
}

fn redraw(shell: &ReaderShell, width: usize) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "\n{}command (help): ", shell.render(width))?;
    stdout.flush()?;
    Ok(())
}
