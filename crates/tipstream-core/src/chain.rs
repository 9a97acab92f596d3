//! Chain descriptor for the network the TipJar lives on.

use serde::{Deserialize, Serialize};

/// Static description of an EVM chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// EVM chain ID integer.
    pub id: u64,
    /// Human-readable name, e.g. "MegaETH Testnet".
    pub name: String,
    /// Slug, e.g. "megaeth-testnet".
    pub network: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub rpc_http: String,
    pub rpc_ws: String,
    pub explorer_url: String,
    pub testnet: bool,
}

impl ChainDescriptor {
    /// The MegaETH public testnet.
    pub fn megaeth_testnet() -> Self {
        Self {
            id: 6342,
            name: "MegaETH Testnet".into(),
            network: "megaeth-testnet".into(),
            currency_symbol: "ETH".into(),
            currency_decimals: 18,
            rpc_http: "https://carrot.megaeth.com/rpc".into(),
            rpc_ws: "wss://carrot.megaeth.com/ws".into(),
            explorer_url: "https://megaexplorer.xyz".into(),
            testnet: true,
        }
    }

    /// Explorer link for a transaction.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }

    /// Explorer link for an address.
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{address}", self.explorer_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn megaeth_testnet_descriptor() {
        let chain = ChainDescriptor::megaeth_testnet();
        assert_eq!(chain.id, 6342);
        assert_eq!(chain.currency_decimals, 18);
        assert!(chain.testnet);
    }

    #[test]
    fn explorer_links() {
        let chain = ChainDescriptor::megaeth_testnet();
        assert_eq!(chain.tx_url("0xabc"), "https://megaexplorer.xyz/tx/0xabc");
        assert_eq!(
            chain.address_url("0x11"),
            "https://megaexplorer.xyz/address/0x11"
        );
    }
}
