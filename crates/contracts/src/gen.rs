#![allow(ambiguous_glob_reexports)]

use ethers::contract::abigen;

abigen!(
    EntryPointAPI,
    r#"[
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce)
        function getSenderAddress(bytes memory initCode) external
        error FailedOp(uint256 opIndex, string reason)
        error FailedOpWithRevert(uint256 opIndex, string reason, bytes inner)
        error SenderAddressResult(address sender)
    ]"#
);

abigen!(
    LightAccountAPI,
    r#"[
        function execute(address dest, uint256 value, bytes calldata func) external
        function executeBatch(address[] calldata dest, bytes[] calldata func) external
    ]"#
);

abigen!(
    LightAccountBatchWithValueAPI,
    r#"[
        function executeBatch(address[] calldata dest, uint256[] calldata value, bytes[] calldata func) external
    ]"#
);

abigen!(
    ModularAccountAPI,
    r#"[
        struct Call {address target;uint256 value;bytes data;}
        function execute(address target, uint256 value, bytes calldata data) external payable returns (bytes memory result)
        function executeBatch(Call[] calldata calls) external payable returns (bytes[] memory results)
    ]"#
);

abigen!(
    LightAccountFactoryAPI,
    r#"[
        function createAccount(address owner, uint256 salt) external returns (address ret)
    ]"#
);

abigen!(
    MultiOwnerLightAccountFactoryAPI,
    r#"[
        function createAccount(address[] calldata owners, uint256 salt) external returns (address ret)
    ]"#
);

abigen!(
    MultiOwnerModularAccountFactoryAPI,
    r#"[
        function createAccount(uint256 salt, address[] calldata owners) external returns (address addr)
    ]"#
);

abigen!(
    MultisigModularAccountFactoryAPI,
    r#"[
        function createAccount(uint256 salt, address[] calldata owners, uint128 threshold) external returns (address addr)
    ]"#
);

abigen!(
    SessionKeyPermissionsUpdatesAPI,
    r#"[
        function setAccessListType(uint8 contractAccessControlType) external
        function updateAccessListAddressEntry(address contractAddress, bool isOnList, bool checkSelectors) external
        function updateAccessListFunctionEntry(address contractAddress, bytes4 selector, bool isOnList) external
        function updateTimeRange(uint48 validAfter, uint48 validUntil) external
        function setNativeTokenSpendLimit(uint256 ethSpendLimit, uint48 refreshInterval) external
        function setERC20SpendLimit(address token, uint256 spendLimit, uint48 refreshInterval) external
        function setGasSpendLimit(uint256 gasSpendLimit, uint48 refreshInterval) external
        function setRequiredPaymaster(address requiredPaymaster) external
    ]"#
);
