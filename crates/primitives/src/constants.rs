//! Account abstraction (ERC-4337)-related constants

/// Entry point smart contracts
pub mod entry_point {
    /// Address of the v0.6 entry point smart contract
    pub const ADDRESS_V06: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";
    /// Address of the v0.7 entry point smart contract
    pub const ADDRESS_V07: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";
    /// Version string of the v0.6 entry point
    pub const VERSION_V06: &str = "0.6.0";
    /// Version string of the v0.7 entry point
    pub const VERSION_V07: &str = "0.7.0";
}

/// Canonical factory and implementation deployments per account version
pub mod accounts {
    pub const LIGHT_ACCOUNT_V1_0_1_FACTORY: &str = "0x000000893A26168158fbeaDD9335Be5bC96592E2";
    pub const LIGHT_ACCOUNT_V1_0_1_IMPLEMENTATION: &str =
        "0xc1b2fc4197c2187ef7a5ed07b5d74c1f6e2b5e8a";

    pub const LIGHT_ACCOUNT_V1_0_2_FACTORY: &str = "0x00000055C0b4fA41dde26A74435ff03692292FBD";
    pub const LIGHT_ACCOUNT_V1_0_2_IMPLEMENTATION: &str =
        "0x5467b1947F47d0646704EB801E075e72aeAe8113";

    pub const LIGHT_ACCOUNT_V1_1_0_FACTORY: &str = "0x00004EC70002a32400f8ae005A26081065620D20";
    pub const LIGHT_ACCOUNT_V1_1_0_IMPLEMENTATION: &str =
        "0xae8c656ad28F2B59a196AB61815C16A0AE1c3cba";

    pub const LIGHT_ACCOUNT_V2_0_0_FACTORY: &str = "0x0000000000400CdFef5E2714E63d8040b700BC24";
    pub const LIGHT_ACCOUNT_V2_0_0_IMPLEMENTATION: &str =
        "0x8E8e658E22B12ada97B402fF0b044D6A325013C7";

    pub const MULTI_OWNER_LIGHT_ACCOUNT_V2_0_0_FACTORY: &str =
        "0x000000000019d2Ee9F2729A65AfE20bb0020AefC";
    pub const MULTI_OWNER_LIGHT_ACCOUNT_V2_0_0_IMPLEMENTATION: &str =
        "0xd2c27F9eE8E4355f71915ffD5568cB3433b6823D";

    pub const MULTI_OWNER_MODULAR_ACCOUNT_FACTORY: &str =
        "0x000000e92D78D90000007F0082006FDA09BD5f11";
    pub const MULTISIG_MODULAR_ACCOUNT_FACTORY: &str = "0x000000000000204327E6669f00901a57CE15aE15";
    pub const MODULAR_ACCOUNT_IMPLEMENTATION: &str = "0x0046000000000151008789797b54fdb500E2a61e";
}

/// Sponsorship (paymaster)
pub mod sponsorship {
    /// Paymaster verification gas limit used when the sponsor omits it
    pub const DEFAULT_PAYMASTER_VERIFICATION_GAS_LIMIT: u64 = 100_000;
    /// Paymaster post-op gas limit used when the sponsor omits it
    pub const DEFAULT_PAYMASTER_POST_OP_GAS_LIMIT: u64 = 50_000;
}

/// Fee estimation
pub mod fees {
    /// Base fee multiplier numerator (base fee x 1.5)
    pub const BASE_FEE_MULTIPLIER_NUMERATOR: u64 = 3;
    /// Base fee multiplier denominator
    pub const BASE_FEE_MULTIPLIER_DENOMINATOR: u64 = 2;
    /// Minimum fee increase (percent) when replacing a pending user operation
    pub const REPLACEMENT_FEE_BUMP_PERCENT: u64 = 10;
}

/// Confirmation polling
pub mod confirmation {
    /// Default number of receipt lookups before giving up
    pub const DEFAULT_MAX_RETRIES: u32 = 5;
    /// Default delay before the first receipt lookup (in milliseconds)
    pub const DEFAULT_INTERVAL_MS: u64 = 2_000;
    /// Default backoff multiplier applied per attempt
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;
    /// Upper bound of the random jitter added to each delay (in milliseconds)
    pub const DEFAULT_MAX_JITTER_MS: u64 = 100;
}

/// Signatures
pub mod signature {
    /// ECDSA signature used in place of a real one while estimating gas
    pub const DUMMY_ECDSA_SIGNATURE: &str = "0xfffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";
    /// Length of an ECDSA signature (r, s, v)
    pub const ECDSA_SIGNATURE_LENGTH: usize = 65;
}

/// Supported chains
pub mod supported_chains {
    use alloy_chains::NamedChain;

    pub const CHAINS: [NamedChain; 12] = [
        NamedChain::Dev,
        NamedChain::Mainnet,
        NamedChain::Sepolia,
        NamedChain::Holesky,
        NamedChain::Polygon,
        NamedChain::PolygonMumbai,
        NamedChain::Optimism,
        NamedChain::OptimismSepolia,
        NamedChain::Arbitrum,
        NamedChain::ArbitrumSepolia,
        NamedChain::Base,
        NamedChain::BaseSepolia,
    ];
}
