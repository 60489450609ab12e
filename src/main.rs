mod app;
mod core;
mod pages;

use app::App;
use leptos::*;

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Starting mint front-end");
    mount_to_body(App);
}
