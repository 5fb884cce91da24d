use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};

sol! {
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address eoa) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Encodes the calldata of an ERC-20 `transfer(to, amount)` call.
///
/// The layout is the 4-byte selector followed by `to` and `amount`, each left-padded to 32
/// bytes.
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

/// Encodes the calldata of an ERC-20 `balanceOf(account)` call.
pub fn encode_balance_of(account: Address) -> Bytes {
    IERC20::balanceOfCall { eoa: account }.abi_encode().into()
}
