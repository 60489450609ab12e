use super::candy_machine::{ConfirmationStatus, MintService, SaleHandle};
use super::error::MintError;
use super::wallet::WalletState;

pub const MINT_SUCCESS_MESSAGE: &str = "Congratulations! Mint succeeded!";
pub const MINT_FAILURE_MESSAGE: &str = "Mint failed! Please try again!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertSeverity {
    Success,
    Info,
    Warning,
    Error,
}

/// Transient dismissible notification; absent severity means none.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Alert {
    pub visible: bool,
    pub message: String,
    pub severity: Option<AlertSeverity>,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            visible: true,
            message: message.into(),
            severity: Some(AlertSeverity::Success),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            visible: true,
            message: message.into(),
            severity: Some(AlertSeverity::Error),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.severity {
            Some(AlertSeverity::Success) => "success",
            Some(AlertSeverity::Info) => "info",
            Some(AlertSeverity::Warning) => "warning",
            Some(AlertSeverity::Error) => "error",
            None => "",
        }
    }
}

/// On-chain sale as last fetched. `is_sold_out` is derived at fetch time and
/// only changes again on a re-fetch or a sold-out mint rejection.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleState {
    pub handle: Option<SaleHandle>,
    pub start_time_ms: i64,
    pub items_remaining: u64,
    pub items_available: u64,
    pub is_sold_out: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MintFlowState {
    pub is_minting: bool,
    pub is_active: bool,
    pub alert: Alert,
}

/// The whole view state, one struct. All mutation goes through `apply`.
#[derive(Clone, Debug, PartialEq)]
pub struct MintViewState {
    pub wallet: WalletState,
    pub sale: SaleState,
    pub flow: MintFlowState,
}

impl MintViewState {
    pub fn new(default_start_ms: i64) -> Self {
        Self {
            wallet: WalletState::default(),
            sale: SaleState {
                handle: None,
                start_time_ms: default_start_ms,
                items_remaining: 0,
                items_available: 0,
                is_sold_out: false,
            },
            flow: MintFlowState::default(),
        }
    }

    /// The mint trigger is enabled iff
    /// connected ∧ ¬sold out ∧ ¬minting ∧ countdown elapsed.
    pub fn mint_enabled(&self) -> bool {
        self.wallet.connected
            && !self.sale.is_sold_out
            && !self.flow.is_minting
            && self.flow.is_active
    }

    pub fn button_face(&self) -> ButtonFace {
        if !self.wallet.connected {
            ButtonFace::Connect
        } else if self.sale.is_sold_out {
            ButtonFace::SoldOut
        } else if !self.flow.is_active {
            ButtonFace::Countdown
        } else if self.flow.is_minting {
            ButtonFace::Minting
        } else {
            ButtonFace::Mint
        }
    }
}

/// What the trigger button shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonFace {
    Connect,
    SoldOut,
    Countdown,
    Minting,
    Mint,
}

/// Everything that can change the view state.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    WalletConnected { address: String },
    WalletDisconnected,
    SaleLoaded {
        handle: SaleHandle,
        go_live_ms: Option<i64>,
        items_available: u64,
        items_remaining: u64,
    },
    BalanceRefreshed { lamports: u64 },
    CountdownCompleted,
    MintStarted,
    MintResolved { alert: Alert, sold_out_hint: bool },
    MintFinished,
    AlertDismissed,
}

/// Pure transition function; the only way view state changes.
pub fn apply(state: &MintViewState, event: &ViewEvent) -> MintViewState {
    let mut next = state.clone();
    match event {
        ViewEvent::WalletConnected { address } => {
            next.wallet.connected = true;
            next.wallet.address = Some(address.clone());
        }
        ViewEvent::WalletDisconnected => {
            // countdown latch survives; it is per-session, not per-wallet
            next.wallet = WalletState::default();
        }
        ViewEvent::SaleLoaded {
            handle,
            go_live_ms,
            items_available,
            items_remaining,
        } => {
            next.sale.handle = Some(handle.clone());
            next.sale.items_available = *items_available;
            next.sale.items_remaining = *items_remaining;
            next.sale.is_sold_out = *items_remaining == 0;
            // fetched go-live overrides the configured default
            if let Some(go_live) = go_live_ms {
                next.sale.start_time_ms = *go_live;
            }
        }
        ViewEvent::BalanceRefreshed { lamports } => {
            next.wallet.balance_lamports = Some(*lamports);
        }
        ViewEvent::CountdownCompleted => {
            // one-way latch, never reset within a session
            next.flow.is_active = true;
        }
        ViewEvent::MintStarted => {
            // re-entrancy guard: a second attempt while one is in flight is
            // dropped here, not just at the disabled trigger
            if state.flow.is_minting {
                log::warn!("Mint already in flight, ignoring start");
            } else {
                next.flow.is_minting = true;
            }
        }
        ViewEvent::MintResolved { alert, sold_out_hint } => {
            next.flow.alert = alert.clone();
            if *sold_out_hint {
                next.sale.is_sold_out = true;
            }
        }
        ViewEvent::MintFinished => {
            next.flow.is_minting = false;
        }
        ViewEvent::AlertDismissed => {
            next.flow.alert.visible = false;
        }
    }
    next
}

/// Per-attempt inputs the driver needs beyond the service itself.
#[derive(Clone, Debug)]
pub struct MintRequest {
    pub config_id: String,
    pub treasury: String,
    pub tx_timeout_ms: u32,
}

/// One complete mint attempt: Idle → Minting → Resolved → Idle.
///
/// The sequence is straight-line; the contract that matters is the cleanup
/// phase. It runs on every path out of the attempt - success, chain error,
/// classified rejection, timeout, or ineligible skip - and a failing balance
/// refresh inside it cannot keep the flow in the minting state.
pub async fn perform_mint<S: MintService>(
    service: &S,
    request: &MintRequest,
    connected: bool,
    payer: Option<&str>,
    handle: Option<&SaleHandle>,
    mut emit: impl FnMut(ViewEvent),
) {
    emit(ViewEvent::MintStarted);

    if let (true, Some(payer_key), Some(sale)) = (connected, payer, handle) {
        let (alert, sold_out_hint) = mint_once(service, request, payer_key, sale).await;
        emit(ViewEvent::MintResolved { alert, sold_out_hint });
    } else {
        log::warn!("Mint trigger fired without wallet or sale state, skipping to cleanup");
    }

    // cleanup phase, always runs exactly once per attempt
    if let Some(payer_key) = payer {
        match service.get_balance(payer_key).await {
            Ok(lamports) => emit(ViewEvent::BalanceRefreshed { lamports }),
            Err(e) => log::error!("Balance refresh after mint failed: {}", e),
        }
    }
    emit(ViewEvent::MintFinished);
}

async fn mint_once<S: MintService>(
    service: &S,
    request: &MintRequest,
    payer: &str,
    handle: &SaleHandle,
) -> (Alert, bool) {
    match try_mint(service, request, payer, handle).await {
        Ok(status) => {
            if status.err.is_none() {
                (Alert::success(MINT_SUCCESS_MESSAGE), false)
            } else {
                log::error!("Mint confirmed with chain error: {:?}", status.err);
                (Alert::error(MINT_FAILURE_MESSAGE), false)
            }
        }
        Err(e) => {
            log::error!("Mint attempt failed: {}", e);
            (Alert::error(e.user_message()), e.is_sold_out())
        }
    }
}

async fn try_mint<S: MintService>(
    service: &S,
    request: &MintRequest,
    payer: &str,
    handle: &SaleHandle,
) -> Result<ConfirmationStatus, MintError> {
    let txid = service
        .submit_mint(handle, &request.config_id, payer, &request.treasury)
        .await?;
    log::info!("Mint transaction submitted: {}", txid);
    service.await_confirmation(&txid, request.tx_timeout_ms).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SaleHandle {
        SaleHandle {
            address: "Sale".to_string(),
            authority: "Auth".to_string(),
            wallet: "Wallet".to_string(),
            config: "Config".to_string(),
            price_lamports: 500_000_000,
        }
    }

    fn state_with(connected: bool, sold_out: bool, minting: bool, active: bool) -> MintViewState {
        let mut state = MintViewState::new(0);
        state.wallet.connected = connected;
        state.sale.is_sold_out = sold_out;
        state.flow.is_minting = minting;
        state.flow.is_active = active;
        state
    }

    fn loaded_event(items_remaining: u64) -> ViewEvent {
        ViewEvent::SaleLoaded {
            handle: handle(),
            go_live_ms: Some(42_000),
            items_available: 250,
            items_remaining,
        }
    }

    #[test]
    fn mint_enabled_exactly_when_invariant_holds() {
        for connected in [false, true] {
            for sold_out in [false, true] {
                for minting in [false, true] {
                    for active in [false, true] {
                        let state = state_with(connected, sold_out, minting, active);
                        let expected = connected && !sold_out && !minting && active;
                        assert_eq!(
                            state.mint_enabled(),
                            expected,
                            "connected={} sold_out={} minting={} active={}",
                            connected,
                            sold_out,
                            minting,
                            active
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn disconnected_wallet_shows_connect_action() {
        // even a sold-out, mid-countdown state asks for a wallet first
        let state = state_with(false, true, false, false);
        assert_eq!(state.button_face(), ButtonFace::Connect);
    }

    #[test]
    fn sold_out_wins_over_countdown_and_mint() {
        assert_eq!(state_with(true, true, false, false).button_face(), ButtonFace::SoldOut);
        assert_eq!(state_with(true, true, false, true).button_face(), ButtonFace::SoldOut);
        assert_eq!(state_with(true, false, false, false).button_face(), ButtonFace::Countdown);
        assert_eq!(state_with(true, false, true, true).button_face(), ButtonFace::Minting);
        assert_eq!(state_with(true, false, false, true).button_face(), ButtonFace::Mint);
    }

    #[test]
    fn sale_load_with_zero_items_is_sold_out() {
        let state = apply(&state_with(true, false, false, true), &loaded_event(0));
        assert!(state.sale.is_sold_out);
        assert!(!state.mint_enabled());
        assert_eq!(state.button_face(), ButtonFace::SoldOut);
    }

    #[test]
    fn sale_load_overrides_countdown_target() {
        let state = apply(&MintViewState::new(99_000), &loaded_event(10));
        assert_eq!(state.sale.start_time_ms, 42_000);

        // unscheduled go-live keeps the configured default
        let unscheduled = ViewEvent::SaleLoaded {
            handle: handle(),
            go_live_ms: None,
            items_available: 250,
            items_remaining: 10,
        };
        let state = apply(&MintViewState::new(99_000), &unscheduled);
        assert_eq!(state.sale.start_time_ms, 99_000);
    }

    #[test]
    fn countdown_latch_survives_wallet_disconnect() {
        let mut state = apply(&MintViewState::new(0), &ViewEvent::CountdownCompleted);
        assert!(state.flow.is_active);
        state = apply(&state, &ViewEvent::WalletDisconnected);
        assert!(state.flow.is_active);
        assert!(!state.wallet.connected);
    }

    #[test]
    fn second_mint_start_is_dropped_while_in_flight() {
        let state = state_with(true, false, true, true);
        let next = apply(&state, &ViewEvent::MintStarted);
        assert_eq!(next, state);
    }

    #[test]
    fn sold_out_rejection_flips_sale_state() {
        // pre-fetch state still reported items remaining
        let mut state = apply(&state_with(true, false, false, true), &loaded_event(10));
        assert!(!state.sale.is_sold_out);

        state = apply(
            &state,
            &ViewEvent::MintResolved {
                alert: Alert::error(MintError::SoldOut.user_message()),
                sold_out_hint: true,
            },
        );
        assert!(state.sale.is_sold_out);
        assert_eq!(state.flow.alert.message, "SOLD OUT!");
        assert_eq!(state.flow.alert.severity, Some(AlertSeverity::Error));
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod driver {
        use super::*;
        use std::cell::RefCell;

        struct FakeService {
            submit: Result<String, MintError>,
            confirm: Result<ConfirmationStatus, MintError>,
            balance: Result<u64, MintError>,
            calls: RefCell<Vec<&'static str>>,
        }

        impl FakeService {
            fn new() -> Self {
                Self {
                    submit: Ok("tx-sig".to_string()),
                    confirm: Ok(ConfirmationStatus { err: None }),
                    balance: Ok(2_000_000_000),
                    calls: RefCell::new(Vec::new()),
                }
            }
        }

        impl MintService for FakeService {
            async fn submit_mint(
                &self,
                _handle: &SaleHandle,
                _config_id: &str,
                _payer: &str,
                _treasury: &str,
            ) -> Result<String, MintError> {
                self.calls.borrow_mut().push("submit");
                self.submit.clone()
            }

            async fn await_confirmation(
                &self,
                _txid: &str,
                _timeout_ms: u32,
            ) -> Result<ConfirmationStatus, MintError> {
                self.calls.borrow_mut().push("confirm");
                self.confirm.clone()
            }

            async fn get_balance(&self, _pubkey: &str) -> Result<u64, MintError> {
                self.calls.borrow_mut().push("balance");
                self.balance.clone()
            }
        }

        fn request() -> MintRequest {
            MintRequest {
                config_id: "Config".to_string(),
                treasury: "Treasury".to_string(),
                tx_timeout_ms: 30_000,
            }
        }

        async fn run(service: &FakeService, payer: Option<&str>) -> Vec<ViewEvent> {
            let mut events = Vec::new();
            let sale = handle();
            perform_mint(
                service,
                &request(),
                payer.is_some(),
                payer,
                payer.map(|_| &sale),
                |event| events.push(event),
            )
            .await;
            events
        }

        fn fold(events: &[ViewEvent]) -> MintViewState {
            let mut state = apply(&MintViewState::new(0), &ViewEvent::CountdownCompleted);
            state.wallet.connected = true;
            for event in events {
                state = apply(&state, event);
            }
            state
        }

        #[tokio::test]
        async fn successful_mint_emits_success_and_refreshes_balance() {
            let service = FakeService::new();
            let events = run(&service, Some("Payer")).await;

            assert!(matches!(events[0], ViewEvent::MintStarted));
            assert!(matches!(
                &events[1],
                ViewEvent::MintResolved { alert, sold_out_hint: false }
                    if alert.severity == Some(AlertSeverity::Success)
                        && alert.message == MINT_SUCCESS_MESSAGE
            ));
            assert!(matches!(
                events[2],
                ViewEvent::BalanceRefreshed { lamports: 2_000_000_000 }
            ));
            assert!(matches!(events[3], ViewEvent::MintFinished));
            assert_eq!(events.len(), 4);
            assert_eq!(*service.calls.borrow(), ["submit", "confirm", "balance"]);
        }

        #[tokio::test]
        async fn confirmation_error_field_reports_generic_failure() {
            let mut service = FakeService::new();
            service.confirm = Ok(ConfirmationStatus {
                err: Some("InstructionError".to_string()),
            });
            let events = run(&service, Some("Payer")).await;

            assert!(matches!(
                &events[1],
                ViewEvent::MintResolved { alert, sold_out_hint: false }
                    if alert.severity == Some(AlertSeverity::Error)
                        && alert.message == MINT_FAILURE_MESSAGE
            ));
            assert!(matches!(events.last(), Some(ViewEvent::MintFinished)));
        }

        #[tokio::test]
        async fn sold_out_rejection_sets_hint_even_with_items_reported() {
            let mut service = FakeService::new();
            service.submit = Err(MintError::SoldOut);
            let events = run(&service, Some("Payer")).await;

            let state = fold(&events);
            assert!(state.sale.is_sold_out);
            assert_eq!(state.flow.alert.message, "SOLD OUT!");
            assert!(!state.flow.is_minting);
            // confirmation never ran, cleanup still did
            assert_eq!(*service.calls.borrow(), ["submit", "balance"]);
        }

        #[tokio::test]
        async fn confirmation_timeout_still_runs_cleanup() {
            let mut service = FakeService::new();
            service.confirm = Err(MintError::Unknown(
                "Confirmation timed out after 30000 ms".to_string(),
            ));
            let events = run(&service, Some("Payer")).await;

            let state = fold(&events);
            assert_eq!(state.flow.alert.message, MINT_FAILURE_MESSAGE);
            assert!(!state.flow.is_minting);
            assert!(events
                .iter()
                .any(|e| matches!(e, ViewEvent::BalanceRefreshed { .. })));
        }

        #[tokio::test]
        async fn failed_balance_refresh_cannot_block_finish() {
            let mut service = FakeService::new();
            service.balance = Err(MintError::Unknown("rpc down".to_string()));
            let events = run(&service, Some("Payer")).await;

            assert!(!events
                .iter()
                .any(|e| matches!(e, ViewEvent::BalanceRefreshed { .. })));
            assert!(matches!(events.last(), Some(ViewEvent::MintFinished)));
            assert!(!fold(&events).flow.is_minting);
        }

        #[tokio::test]
        async fn ineligible_attempt_skips_to_cleanup() {
            let service = FakeService::new();
            let events = run(&service, None).await;

            // no payer: no mint call, no balance refresh, flow still resolves
            assert!(service.calls.borrow().is_empty());
            assert!(matches!(events[0], ViewEvent::MintStarted));
            assert!(matches!(events[1], ViewEvent::MintFinished));
            assert_eq!(events.len(), 2);
        }

        #[tokio::test]
        async fn is_minting_spans_exactly_one_attempt() {
            let service = FakeService::new();
            let events = run(&service, Some("Payer")).await;

            let mut state = MintViewState::new(0);
            state.wallet.connected = true;
            state.flow.is_active = true;
            assert!(!state.flow.is_minting);

            for (index, event) in events.iter().enumerate() {
                state = apply(&state, event);
                let last = index == events.len() - 1;
                assert_eq!(state.flow.is_minting, !last);
            }
        }
    }
}
