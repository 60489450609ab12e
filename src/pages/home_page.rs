use leptos::*;
use gloo_timers::future::TimeoutFuture;
use js_sys::Date;
use wasm_bindgen_futures::spawn_local;

use crate::core::candy_machine::{CandyMachineClient, MintService};
use crate::core::config::MintAppConfig;
use crate::core::controller::{
    apply, perform_mint, ButtonFace, MintRequest, MintViewState, ViewEvent,
};
use crate::core::countdown::Countdown;
use crate::core::rpc::RpcConnection;
use crate::core::wallet::{shorten_address, WalletProvider};

const COUNTDOWN_TICK_MS: u32 = 1_000;
const ALERT_AUTOHIDE_MS: u32 = 6_000;

#[component]
pub fn HomePage(config: MintAppConfig) -> impl IntoView {
    let state = create_rw_signal(MintViewState::new(config.start_timestamp_ms));
    let now_ms = create_rw_signal(Date::now() as i64);

    let config = store_value(config);

    // every state change funnels through the transition function
    let dispatch = move |event: ViewEvent| state.update(|s| *s = apply(s, &event));

    let make_client = move || {
        let cfg = config.get_value();
        CandyMachineClient::new(
            RpcConnection::with_endpoint(&cfg.rpc_endpoint),
            &cfg.candy_program_id,
        )
    };

    // countdown tick: latches immediately when the target is already past,
    // then once when it elapses; the latch is one-way for the session
    spawn_local(async move {
        loop {
            let now = Date::now() as i64;
            now_ms.set(now);
            let target = state.with_untracked(|s| s.sale.start_time_ms);
            if Countdown::new(target).is_complete(now) {
                if !state.with_untracked(|s| s.flow.is_active) {
                    dispatch(ViewEvent::CountdownCompleted);
                }
                break;
            }
            TimeoutFuture::new(COUNTDOWN_TICK_MS).await;
        }
    });

    // wallet connect, then the two mount-time fetches. They are independent
    // and may land in either order; each mutates disjoint state.
    let on_connect = move |_| {
        if !WalletProvider::is_installed() {
            log::error!("No wallet provider installed in this browser");
            return;
        }
        spawn_local(async move {
            let address = match WalletProvider::connect().await {
                Ok(address) => address,
                Err(e) => {
                    log::error!("Wallet connection failed: {}", e);
                    return;
                }
            };
            log::info!("Wallet connected: {}", address);
            dispatch(ViewEvent::WalletConnected { address: address.clone() });

            {
                let client = make_client();
                let address = address.clone();
                spawn_local(async move {
                    match client.get_balance(&address).await {
                        Ok(lamports) => dispatch(ViewEvent::BalanceRefreshed { lamports }),
                        // quiet at mount time, logged only
                        Err(e) => log::error!("Initial balance fetch failed: {}", e),
                    }
                });
            }

            let client = make_client();
            let sale_id = config.get_value().candy_machine_id;
            spawn_local(async move {
                match client.fetch_sale_state(&sale_id).await {
                    Ok(snapshot) => dispatch(ViewEvent::SaleLoaded {
                        go_live_ms: snapshot.go_live_ms,
                        items_available: snapshot.items_available,
                        items_remaining: snapshot.items_remaining(),
                        handle: snapshot.handle,
                    }),
                    // quiet at mount time, logged only
                    Err(e) => log::error!("Sale state fetch failed: {}", e),
                }
            });
        });
    };

    let on_disconnect = move |_| {
        spawn_local(async move {
            if let Err(e) = WalletProvider::disconnect().await {
                log::warn!("Wallet disconnect failed: {}", e);
            }
            dispatch(ViewEvent::WalletDisconnected);
        });
    };

    let on_mint = move |_| {
        if !state.with_untracked(|s| s.mint_enabled()) {
            return;
        }
        spawn_local(async move {
            let cfg = config.get_value();
            let client = make_client();
            let request = MintRequest {
                config_id: cfg.config_id.clone(),
                treasury: cfg.treasury.clone(),
                tx_timeout_ms: cfg.tx_timeout_ms,
            };
            let (connected, payer, handle) = state.with_untracked(|s| {
                (s.wallet.connected, s.wallet.address.clone(), s.sale.handle.clone())
            });

            perform_mint(
                &client,
                &request,
                connected,
                payer.as_deref(),
                handle.as_ref(),
                dispatch,
            )
            .await;

            // the alert is transient, snackbar style
            if state.with_untracked(|s| s.flow.alert.visible) {
                TimeoutFuture::new(ALERT_AUTOHIDE_MS).await;
                dispatch(ViewEvent::AlertDismissed);
            }
        });
    };

    view! {
        <main class="mint-app">
            <header class="mint-header">
                <h1>"Candy Drop"</h1>
                <p class="tagline">"A limited generative collection, minted on-chain"</p>
            </header>

            <section class="wallet-info">
                <Show when=move || state.with(|s| s.wallet.connected)>
                    <p class="wallet-address">
                        "Address: "
                        {move || {
                            state.with(|s| {
                                s.wallet.address.as_deref().map(shorten_address).unwrap_or_default()
                            })
                        }}
                    </p>
                    <p class="wallet-balance">
                        "Balance: "
                        {move || {
                            format!("{:.4} SOL", state.with(|s| s.wallet.balance_sol().unwrap_or(0.0)))
                        }}
                    </p>
                    <button class="disconnect-button" on:click=on_disconnect>
                        "Disconnect"
                    </button>
                </Show>
            </section>

            <section class="mint-container">
                {move || {
                    if state.with(|s| !s.wallet.connected) {
                        view! {
                            <button class="connect-button" on:click=on_connect>
                                "Connect Wallet"
                            </button>
                        }
                        .into_view()
                    } else {
                        view! {
                            <button
                                class="mint-button"
                                prop:disabled=move || !state.with(|s| s.mint_enabled())
                                on:click=on_mint
                            >
                                {move || match state.with(|s| s.button_face()) {
                                    ButtonFace::SoldOut => "SOLD OUT".into_view(),
                                    ButtonFace::Minting => view! {
                                        <span class="spinner">"Minting..."</span>
                                    }
                                    .into_view(),
                                    ButtonFace::Mint => "MINT".into_view(),
                                    ButtonFace::Countdown | ButtonFace::Connect => view! {
                                        <span class="countdown">
                                            {move || {
                                                let target = state.with(|s| s.sale.start_time_ms);
                                                Countdown::new(target)
                                                    .remaining(now_ms.get())
                                                    .to_string()
                                            }}
                                        </span>
                                    }
                                    .into_view(),
                                }}
                            </button>
                        }
                        .into_view()
                    }
                }}

                <Show when=move || state.with(|s| s.wallet.connected && s.flow.is_active)>
                    <p class="items-remaining">
                        {move || {
                            state.with(|s| {
                                format!("{} / {} available", s.sale.items_remaining, s.sale.items_available)
                            })
                        }}
                    </p>
                </Show>
            </section>

            // transient dismissible notification
            {move || {
                let alert = state.with(|s| s.flow.alert.clone());
                if alert.visible {
                    view! {
                        <div class=format!("alert alert-{}", alert.css_class())>
                            <span class="alert-message">{alert.message.clone()}</span>
                            <button
                                class="alert-close"
                                on:click=move |_| dispatch(ViewEvent::AlertDismissed)
                            >
                                "Dismiss"
                            </button>
                        </div>
                    }
                    .into_view()
                } else {
                    ().into_view()
                }
            }}
        </main>
    }
}
