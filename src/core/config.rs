use once_cell::sync::Lazy;
use std::sync::RwLock;

/// Network environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Devnet environment used for rehearsal drops
    Devnet,
    /// Mainnet environment - real assets
    Mainnet,
}

/// Network configuration including RPC endpoints and drop addresses
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network_type: NetworkType,
    pub rpc_endpoints: &'static [&'static str],
    pub drop: DropAddresses,
}

/// On-chain addresses of one collectible drop
#[derive(Debug, Clone)]
pub struct DropAddresses {
    pub candy_program_id: &'static str,
    pub candy_machine_id: &'static str,
    pub config_id: &'static str,
    pub treasury: &'static str,
}

impl NetworkConfig {
    const DEVNET: NetworkConfig = NetworkConfig {
        network_type: NetworkType::Devnet,
        rpc_endpoints: &["https://api.devnet.solana.com"],
        drop: DropAddresses {
            candy_program_id: "cndy3Z4yapfJBmL3ShUp5exZKqR3z33thTzeNMm2gRZ",
            candy_machine_id: "BdJwa2nW8fWGQhjDsNWbE1eRuucB7yVsiVRtxWjtJ3Fy",
            config_id: "HFa8t2rkt9rc1cZjYLyQBRctpZbPcEtDbWBBMR6LDL5a",
            treasury: "HHWbhSfYq1KoftfVmprjDGcMTLDB4JHn4SZfdCoBtxLQ",
        },
    };

    const MAINNET: NetworkConfig = NetworkConfig {
        network_type: NetworkType::Mainnet,
        rpc_endpoints: &["https://api.mainnet-beta.solana.com"],
        drop: DropAddresses {
            candy_program_id: "cndy3Z4yapfJBmL3ShUp5exZKqR3z33thTzeNMm2gRZ",
            candy_machine_id: "6f15Q4WXhuFbZXxvpernVCziEyQ3wiKeNGndpYAL7qdC",
            config_id: "FNVo2qw2y4YaJQtRWf5kUXjqVBJ1oRGXmBc36inUve1R",
            treasury: "9kRckR3AYpS2Ztsrnx58WL4qhZtZ659nCH8XjbRQ5FPU",
        },
    };

    /// Get network configuration for specific network type
    pub fn for_network(network: NetworkType) -> &'static NetworkConfig {
        match network {
            NetworkType::Devnet => &Self::DEVNET,
            NetworkType::Mainnet => &Self::MAINNET,
        }
    }
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Devnet => "devnet",
            NetworkType::Mainnet => "mainnet",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, NetworkType::Mainnet)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NetworkType::Devnet => "Devnet",
            NetworkType::Mainnet => "Mainnet",
        }
    }
}

/// Network state management - set once at startup
struct NetworkState {
    current: RwLock<Option<NetworkType>>,
}

impl NetworkState {
    const fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Returns true if successfully set, false if already set
    fn initialize(&self, network: NetworkType) -> bool {
        let mut current = self.current.write().unwrap();
        if current.is_some() {
            log::warn!("Attempted to change network after initialization. Network is locked.");
            return false;
        }
        *current = Some(network);
        log::info!(
            "Network initialized: {} ({})",
            network.display_name(),
            if network.is_production() { "PRODUCTION" } else { "DEVELOPMENT" }
        );
        log::info!("RPC: {}", NetworkConfig::for_network(network).rpc_endpoints[0]);
        true
    }

    fn get(&self) -> Option<NetworkType> {
        *self.current.read().unwrap()
    }
}

/// Global network state
static NETWORK_STATE: Lazy<NetworkState> = Lazy::new(NetworkState::new);

/// Initialize network at startup - can only be called once
pub fn initialize_network(network: NetworkType) -> bool {
    NETWORK_STATE.initialize(network)
}

/// Get current network type. Returns None if not initialized.
pub fn get_network() -> Option<NetworkType> {
    NETWORK_STATE.get()
}

/// Try to get network config safely (returns None if not initialized)
pub fn try_get_network_config() -> Option<&'static NetworkConfig> {
    get_network().map(NetworkConfig::for_network)
}

/// Configuration object handed to the mint view by its host.
///
/// Values default to the per-network constants above; the address fields and
/// the go-live default can be overridden at build time through environment
/// variables so one binary serves rehearsal and production drops.
#[derive(Clone, Debug, PartialEq)]
pub struct MintAppConfig {
    /// program that owns the sale account
    pub candy_program_id: String,
    /// sale account whose state is fetched
    pub candy_machine_id: String,
    /// secondary config reference passed through to mint calls
    pub config_id: String,
    /// JSON-RPC endpoint used for all balance/state queries
    pub rpc_endpoint: String,
    /// default countdown target, overridden once real sale state is fetched
    pub start_timestamp_ms: i64,
    /// destination for payment, passed through to mint calls
    pub treasury: String,
    /// upper bound for the confirmation wait
    pub tx_timeout_ms: u32,
}

impl MintAppConfig {
    /// Placeholder go-live shown until the on-chain one is known.
    pub const DEFAULT_START_TIMESTAMP_MS: i64 = 1_767_225_600_000;

    pub const DEFAULT_TX_TIMEOUT_MS: u32 = 30_000;

    pub fn for_network(network: NetworkType) -> Self {
        let cfg = NetworkConfig::for_network(network);
        Self {
            candy_program_id: option_env!("DROP_PROGRAM_ID")
                .unwrap_or(cfg.drop.candy_program_id)
                .to_string(),
            candy_machine_id: option_env!("DROP_MACHINE_ID")
                .unwrap_or(cfg.drop.candy_machine_id)
                .to_string(),
            config_id: option_env!("DROP_CONFIG_ID")
                .unwrap_or(cfg.drop.config_id)
                .to_string(),
            rpc_endpoint: cfg.rpc_endpoints[0].to_string(),
            start_timestamp_ms: option_env!("DROP_START_MS")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(Self::DEFAULT_START_TIMESTAMP_MS),
            treasury: option_env!("DROP_TREASURY")
                .unwrap_or(cfg.drop.treasury)
                .to_string(),
            tx_timeout_ms: Self::DEFAULT_TX_TIMEOUT_MS,
        }
    }
}
