//! Static declaration of the `GlobalExitRootManagerL2SovereignChain`
//! interface.
//!
//! The declaration mirrors the JSON schema in
//! `abi/GlobalExitRootManagerL2SovereignChain.json` item for item. The
//! generated types carry the selectors used on the wire, the JSON schema is
//! kept for the dynamic surface (see [`crate::descriptor`]).

#![allow(missing_docs, clippy::too_many_arguments)]

use alloy::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    contract GlobalExitRootManagerL2SovereignChain {
        error GlobalExitRootAlreadySet();
        error GlobalExitRootNotFound();
        error OnlyAllowedContracts();
        error OnlyGlobalExitRootRemover();
        error OnlyGlobalExitRootUpdater();

        event Initialized(uint8 version);
        event SetGlobalExitRootRemover(address indexed newGlobalExitRootRemover);
        event SetGlobalExitRootUpdater(address indexed newGlobalExitRootUpdater);
        event UpdateHashChainValue(bytes32 indexed newGlobalExitRoot, bytes32 indexed newHashChainValue);
        event UpdateRemovalHashChainValue(bytes32 indexed removedGlobalExitRoot, bytes32 indexed newRemovalHashChainValue);

        constructor(address _bridgeAddress);

        function bridgeAddress() external view returns (address);
        function globalExitRootMap(bytes32) external view returns (uint256);
        function globalExitRootRemover() external view returns (address);
        function globalExitRootUpdater() external view returns (address);
        function insertedGERHashChain() external view returns (bytes32);
        function lastRollupExitRoot() external view returns (bytes32);
        function removedGERHashChain() external view returns (bytes32);

        function initialize(address _globalExitRootUpdater, address _globalExitRootRemover) external;
        function insertGlobalExitRoot(bytes32 _newRoot) external;
        function removeGlobalExitRoots(bytes32[] calldata gersToRemove) external;
        function setGlobalExitRootRemover(address _globalExitRootRemover) external;
        function setGlobalExitRootUpdater(address _globalExitRootUpdater) external;
        function updateExitRoot(bytes32 newRoot) external;
    }
}

pub use GlobalExitRootManagerL2SovereignChain::*;

/// Name of the contract, as it appears in the schema file name.
pub const CONTRACT_NAME: &str = "GlobalExitRootManagerL2SovereignChain";
