use leptos::*;

use crate::core::config::{initialize_network, MintAppConfig, NetworkType};
use crate::pages::HomePage;

// main app component
#[component]
pub fn App() -> impl IntoView {
    // the drop targets a single cluster, chosen at build time
    let network = match option_env!("DROP_NETWORK") {
        Some("mainnet") => NetworkType::Mainnet,
        _ => NetworkType::Devnet,
    };
    initialize_network(network);

    let config = MintAppConfig::for_network(network);

    view! {
        <HomePage config=config/>
    }
}
