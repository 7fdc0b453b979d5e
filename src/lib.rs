pub mod core;
pub mod services;
pub mod utils;
#[cfg(target_arch = "wasm32")]
pub mod ui;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use leptos::*;

/// Mount the reader for `book_json` (a serialized `Book`), sending translation
/// and chat requests to the hosted functions at `functions_url`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start(book_json: String, functions_url: String, api_key: String) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).unwrap_or(());

    let book: crate::core::state::Book =
        serde_json::from_str(&book_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let functions = crate::services::functions::FunctionsConfig {
        base_url: functions_url,
        api_key,
    };

    leptos::mount_to_body(move || {
        use crate::ui::ReaderApp;
        view! { <ReaderApp book=book.clone() functions=functions.clone()/> }
    });
    Ok(())
}
