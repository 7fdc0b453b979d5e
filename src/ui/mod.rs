use crate::core::state::{Book, NoticeKind, Role};
use crate::services::catalog::{load_text, CatalogConfig, GoogleBooksClient};
use crate::services::chat::ChatBackend;
use crate::services::functions::{FunctionsClient, FunctionsConfig};
use crate::services::reader::ReaderShell;
use crate::services::translation::{execute, TargetLanguage, TranslationRequest, LANGUAGES};
use crate::utils::pages::PAGE_SIZE;
use leptos::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Browser-side handle on the shell. `revision` is bumped after every
/// mutation so views re-read the shell.
#[derive(Clone)]
struct Reader {
    shell: Rc<RefCell<ReaderShell>>,
    functions: Rc<FunctionsClient>,
    revision: RwSignal<u64>,
}

impl Reader {
    fn update<R>(&self, f: impl FnOnce(&mut ReaderShell) -> R) -> R {
        let result = f(&mut self.shell.borrow_mut());
        self.revision.update(|v| *v += 1);
        result
    }

    fn read<R>(&self, f: impl FnOnce(&ReaderShell) -> R) -> R {
        self.revision.track();
        f(&self.shell.borrow())
    }

    fn translate(&self, request: Option<TranslationRequest>) {
        let Some(request) = request else {
            return;
        };
        let this = self.clone();
        spawn_local(async move {
            let done = execute(this.functions.as_ref(), request).await;
            this.update(|shell| shell.apply_translation(done));
        });
    }

    fn send(&self) {
        let request = self.update(|shell| {
            let text = shell.chat().draft().to_string();
            shell.send_chat(&text)
        });
        let Some(request) = request else {
            return;
        };
        let this = self.clone();
        spawn_local(async move {
            let result = this.functions.reply(&request).await;
            this.update(|shell| shell.apply_chat(result));
        });
    }
}

#[component]
pub fn ReaderApp(book: Book, functions: FunctionsConfig) -> impl IntoView {
    let (closed, set_closed) = create_signal(false);
    let shell = ReaderShell::new(
        book.clone(),
        PAGE_SIZE,
        Box::new(move || set_closed.set(true)),
    );
    let reader = Reader {
        shell: Rc::new(RefCell::new(shell)),
        functions: Rc::new(FunctionsClient::new(&functions)),
        revision: create_rw_signal(0),
    };

    reader.update(|shell| shell.begin_loading());
    {
        let reader = reader.clone();
        spawn_local(async move {
            let catalog = GoogleBooksClient::new(&CatalogConfig::default());
            let text = load_text(&catalog, &book).await;
            let request = reader.update(|shell| shell.set_text(&text));
            reader.translate(request);
        });
    }

    let r = reader.clone();
    let on_back = move |_| r.update(|shell| shell.back());
    let r = reader.clone();
    let on_prev = move |_| r.translate(r.update(|shell| shell.prev_page()));
    let r = reader.clone();
    let on_next = move |_| r.translate(r.update(|shell| shell.next_page()));
    let r = reader.clone();
    let on_language = move |ev| {
        if let Some(language) = TargetLanguage::parse(&event_target_value(&ev)) {
            r.translate(r.update(|shell| shell.select_language(language)));
        }
    };
    let r = reader.clone();
    let on_mouse_up = move |_| {
        let selection = window()
            .get_selection()
            .ok()
            .flatten()
            .map(|s| String::from(s.to_string()))
            .unwrap_or_default();
        r.update(|shell| shell.on_pointer_release(&selection));
    };
    let r = reader.clone();
    let on_toggle_chat = move |_| r.update(|shell| shell.toggle_chat());

    let r = reader.clone();
    let title = move || r.read(|shell| shell.book().title.clone());
    let r = reader.clone();
    let authors = move || r.read(|shell| shell.book().authors_line());
    let r = reader.clone();
    let status = move || {
        r.read(|shell| {
            if shell.is_loading_content() {
                "Loading...".to_string()
            } else if shell.translation().is_translating() {
                "Translating...".to_string()
            } else {
                format!("Page {} of {}", shell.current_page() + 1, shell.page_count())
            }
        })
    };
    let r = reader.clone();
    let content = move || r.read(|shell| shell.displayed_text().to_string());
    let r = reader.clone();
    let chat_open = move || r.read(|shell| shell.is_chat_open());

    let r = reader.clone();
    let notices = move || {
        let list = r.read(|shell| shell.notices().to_vec());
        let r = r.clone();
        list.into_iter()
            .map(|notice| {
                let class = match notice.kind {
                    NoticeKind::Info => "notice",
                    NoticeKind::Error => "notice notice-error",
                };
                let r = r.clone();
                view! {
                    <div class=class>
                        <strong>{notice.title}</strong>
                        <span>{notice.description}</span>
                        <button on:click=move |_| { r.update(|shell| shell.dismiss_notice()); }>"x"</button>
                    </div>
                }
            })
            .collect_view()
    };

    let chat_reader = reader.clone();

    view! {
        <div class="reader">
            {move || closed.get().then(|| view! { <p>"Reader closed."</p> })}
            <header class="reader-header">
                <button on:click=on_back>"Back"</button>
                <div>
                    <h1>{title}</h1>
                    <p>{authors}</p>
                </div>
                <select on:change=on_language>
                    <option value="original">"Original"</option>
                    {LANGUAGES
                        .iter()
                        .map(|(code, name)| view! { <option value=*code>{*name}</option> })
                        .collect_view()}
                </select>
                <button on:click=on_toggle_chat>
                    {move || if chat_open() { "Close Chat" } else { "Ask AI" }}
                </button>
            </header>
            <div class="notices">{notices}</div>
            <main class="reader-body">
                <article class="page" on:mouseup=on_mouse_up>
                    <p class="status">{status}</p>
                    <div style="white-space: pre-wrap">{content}</div>
                    <nav>
                        <button on:click=on_prev>"Previous"</button>
                        <button on:click=on_next>"Next"</button>
                    </nav>
                </article>
                <ChatPanel reader=chat_reader/>
            </main>
        </div>
    }
}

#[component]
fn ChatPanel(reader: Reader) -> impl IntoView {
    let r = reader.clone();
    let open = move || r.read(|shell| shell.is_chat_open());
    let r = reader.clone();
    let messages = move || {
        r.read(|shell| shell.chat().messages().to_vec())
            .into_iter()
            .map(|m| {
                let class = match m.role {
                    Role::Assistant => "message assistant",
                    Role::User => "message user",
                };
                view! { <div class=class>{m.content}</div> }
            })
            .collect_view()
    };
    let r = reader.clone();
    let passage = move || {
        let context = r.read(|shell| shell.chat().context().to_string());
        (!context.is_empty()).then(|| view! { <blockquote class="passage">{context}</blockquote> })
    };
    let r = reader.clone();
    let loading = move || r.read(|shell| shell.chat().is_loading());
    let r = reader.clone();
    let draft = move || r.read(|shell| shell.chat().draft().to_string());
    let r = reader.clone();
    let on_input = move |ev| {
        let value = event_target_value(&ev);
        r.update(|shell| shell.chat_mut().set_draft(&value));
    };
    let r = reader.clone();
    let on_key = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            r.send();
        }
    };
    let r = reader.clone();
    let on_send = move |_| r.send();

    view! {
        <Show when=open>
            <aside class="chat">
                <h3>"AI Reading Assistant"</h3>
                {passage.clone()}
                <div class="messages">{messages.clone()}</div>
                {let loading = loading.clone(); move || loading().then(|| view! { <p class="typing">"..."</p> })}
                <input
                    placeholder="Ask a question..."
                    prop:value=draft.clone()
                    prop:disabled=loading.clone()
                    on:input=on_input.clone()
                    on:keydown=on_key.clone()
                />
                <button on:click=on_send.clone()>"Send"</button>
            </aside>
        </Show>
    }
}
