//! Contract interface definitions
//!
//! Uses alloy's `sol!` macro to generate type-safe ABI encoders/decoders for
//! the vault factory, the individual vault and the fungible-token interface.
//! Only the functions this crate calls are declared.

use alloy::sol;

/// Version of the signature lists below. Bump when a declared signature changes.
pub const INTERFACE_VERSION: u32 = 1;

sol! {
    #[sol(rpc)]
    interface ITribeVaultFactory {
        function getVault(address leader, address follower) external view returns (address);
        function createVault(address leader) external returns (address);
    }

    #[sol(rpc)]
    interface ITribeVault {
        struct Position {
            address protocol;
            address token0;
            address token1;
            uint256 liquidity;
            uint256 tokenId;
            bool isActive;
        }

        function deposit(address token, uint256 amount) external returns (bool);
        function depositedCapital() external view returns (uint256);
        function highWaterMark() external view returns (uint256);
        function getActivePositionCount() external view returns (uint256);
        function getAllPositions() external view returns (Position[] memory);
    }

    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Vault factory signatures
pub mod factory {
    pub const GET_VAULT: &str = "getVault(address,address)";
    pub const CREATE_VAULT: &str = "createVault(address)";

    pub const SIGNATURES: &[&str] = &[GET_VAULT, CREATE_VAULT];
}

/// Individual vault signatures
pub mod vault {
    pub const DEPOSIT: &str = "deposit(address,uint256)";
    pub const DEPOSITED_CAPITAL: &str = "depositedCapital()";
    pub const HIGH_WATER_MARK: &str = "highWaterMark()";
    pub const GET_ACTIVE_POSITION_COUNT: &str = "getActivePositionCount()";
    pub const GET_ALL_POSITIONS: &str = "getAllPositions()";

    pub const SIGNATURES: &[&str] = &[
        DEPOSIT,
        DEPOSITED_CAPITAL,
        HIGH_WATER_MARK,
        GET_ACTIVE_POSITION_COUNT,
        GET_ALL_POSITIONS,
    ];
}

/// Fungible token signatures
pub mod token {
    pub const BALANCE_OF: &str = "balanceOf(address)";
    pub const APPROVE: &str = "approve(address,uint256)";

    pub const SIGNATURES: &[&str] = &[BALANCE_OF, APPROVE];
}
