//! Solidity bindings for the vault and token contracts.

use alloy_sol_types::sol;

sol! {
	/// Gnosis Safe surface used by the pipeline.
	interface ISafe {
		function nonce() external view returns (uint256);
		function getOwners() external view returns (address[]);
		function getThreshold() external view returns (uint256);
		function VERSION() external view returns (string);

		function getTransactionHash(
			address to,
			uint256 value,
			bytes data,
			uint8 operation,
			uint256 safeTxGas,
			uint256 baseGas,
			uint256 gasPrice,
			address gasToken,
			address refundReceiver,
			uint256 _nonce
		) external view returns (bytes32);

		function execTransaction(
			address to,
			uint256 value,
			bytes data,
			uint8 operation,
			uint256 safeTxGas,
			uint256 baseGas,
			uint256 gasPrice,
			address gasToken,
			address refundReceiver,
			bytes signatures
		) external payable returns (bool success);

		event ExecutionSuccess(bytes32 txHash, uint256 payment);
		event ExecutionFailure(bytes32 txHash, uint256 payment);
	}

	/// ERC-20 allowance surface.
	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
		function allowance(address owner, address spender) external view returns (uint256);
		function decimals() external view returns (uint8);
	}
}
