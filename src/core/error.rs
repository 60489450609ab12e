use std::fmt;

// transport-level error type
#[derive(Debug, Clone)]
pub enum RpcError {
    ConnectionFailed(String),
    InvalidAddress(String),
    Rpc {
        code: i64,
        message: String,
        custom_program_code: Option<u32>,
    },
    Other(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RpcError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            RpcError::Rpc {
                code,
                message,
                custom_program_code: Some(custom),
            } => write!(f, "RPC error code {}: {} (program error {:#x})", code, message, custom),
            RpcError::Rpc { code, message, .. } => {
                write!(f, "RPC error code {}: {}", code, message)
            }
            RpcError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

// error codes surfaced by the sale program on mint rejection
const CODE_INSUFFICIENT_FUNDS: u32 = 0x135;
const CODE_SOLD_OUT: u32 = 0x137;
const CODE_NOT_STARTED: u32 = 0x138;

/// Mint failure taxonomy. Classification happens once, here, at the
/// collaborator boundary; the rest of the app only matches on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    SoldOut,
    NotStarted,
    InsufficientFunds,
    Unknown(String),
}

impl MintError {
    pub fn classify(err: &RpcError) -> Self {
        match err {
            RpcError::Rpc {
                custom_program_code: Some(code),
                ..
            } => match *code {
                CODE_SOLD_OUT => MintError::SoldOut,
                CODE_NOT_STARTED => MintError::NotStarted,
                CODE_INSUFFICIENT_FUNDS => MintError::InsufficientFunds,
                _ => MintError::Unknown(err.to_string()),
            },
            // some providers only surface the raw simulation text
            RpcError::Rpc { message, .. } => {
                Self::classify_message(message).unwrap_or_else(|| MintError::Unknown(err.to_string()))
            }
            other => MintError::Unknown(other.to_string()),
        }
    }

    fn classify_message(message: &str) -> Option<Self> {
        if message.contains("0x137") {
            Some(MintError::SoldOut)
        } else if message.contains("0x138") {
            Some(MintError::NotStarted)
        } else if message.contains("0x135") {
            Some(MintError::InsufficientFunds)
        } else {
            None
        }
    }

    /// Fixed user-facing alert text for each rejection class.
    pub fn user_message(&self) -> String {
        match self {
            MintError::SoldOut => "SOLD OUT!".to_string(),
            MintError::NotStarted => "Minting period hasn't started yet.".to_string(),
            MintError::InsufficientFunds => {
                "Insufficient funds to mint. Please fund your wallet.".to_string()
            }
            MintError::Unknown(_) => "Minting failed! Please try again!".to_string(),
        }
    }

    pub fn is_sold_out(&self) -> bool {
        matches!(self, MintError::SoldOut)
    }
}

impl fmt::Display for MintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintError::SoldOut => write!(f, "sale is sold out"),
            MintError::NotStarted => write!(f, "sale has not started"),
            MintError::InsufficientFunds => write!(f, "insufficient funds"),
            MintError::Unknown(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<RpcError> for MintError {
    fn from(err: RpcError) -> Self {
        MintError::classify(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_err(code: Option<u32>, message: &str) -> RpcError {
        RpcError::Rpc {
            code: -32002,
            message: message.to_string(),
            custom_program_code: code,
        }
    }

    #[test]
    fn classifies_known_program_codes() {
        assert_eq!(
            MintError::classify(&rpc_err(Some(0x137), "custom program error")),
            MintError::SoldOut
        );
        assert_eq!(
            MintError::classify(&rpc_err(Some(0x138), "custom program error")),
            MintError::NotStarted
        );
        assert_eq!(
            MintError::classify(&rpc_err(Some(0x135), "custom program error")),
            MintError::InsufficientFunds
        );
    }

    #[test]
    fn unknown_program_code_falls_back_to_unknown() {
        let classified = MintError::classify(&rpc_err(Some(0x1), "custom program error"));
        assert!(matches!(classified, MintError::Unknown(_)));
    }

    #[test]
    fn classifies_from_raw_message_text() {
        assert_eq!(
            MintError::classify(&rpc_err(None, "Transaction simulation failed: custom program error: 0x137")),
            MintError::SoldOut
        );
        assert_eq!(
            MintError::classify(&rpc_err(None, "custom program error: 0x135")),
            MintError::InsufficientFunds
        );
        assert_eq!(
            MintError::classify(&rpc_err(None, "custom program error: 0x138")),
            MintError::NotStarted
        );
    }

    #[test]
    fn transport_errors_are_unknown() {
        let classified = MintError::classify(&RpcError::ConnectionFailed("timeout".to_string()));
        assert!(matches!(classified, MintError::Unknown(_)));
    }

    #[test]
    fn user_messages_are_fixed_strings() {
        assert_eq!(MintError::SoldOut.user_message(), "SOLD OUT!");
        assert_eq!(
            MintError::NotStarted.user_message(),
            "Minting period hasn't started yet."
        );
        assert_eq!(
            MintError::Unknown("anything".to_string()).user_message(),
            "Minting failed! Please try again!"
        );
    }

    #[test]
    fn only_sold_out_reports_sold_out() {
        assert!(MintError::SoldOut.is_sold_out());
        assert!(!MintError::NotStarted.is_sold_out());
        assert!(!MintError::InsufficientFunds.is_sold_out());
        assert!(!MintError::Unknown(String::new()).is_sold_out());
    }
}
