use alloy_sol_types::sol;

sol! {
    /// Pool factory and router. Pool identities are derived by the contract.
    #[derive(Debug)]
    interface IAmm {
        function getPoolId(address tokenA, address tokenB, uint24 fee) external view returns (bytes32 poolId);

        function getPool(bytes32 poolId) external view returns (
            address token0,
            address token1,
            uint256 reserve0,
            uint256 reserve1,
            uint24 fee,
            uint256 totalSupply
        );

        function getUserLiquidity(bytes32 poolId, address user) external view returns (uint256 liquidity);

        function createPool(address tokenA, address tokenB, uint256 amountA, uint256 amountB)
            external
            returns (bytes32 poolId, uint256 liquidity);

        function addLiquidity(bytes32 poolId, uint256 amount0Desired, uint256 amount1Desired)
            external
            returns (uint256 liquidity, uint256 amount0, uint256 amount1);

        function removeLiquidity(bytes32 poolId, uint256 liquidity)
            external
            returns (uint256 amount0, uint256 amount1);

        function swap(bytes32 poolId, address tokenIn, uint256 amountIn, uint256 minAmountOut, address recipient)
            external
            returns (uint256 amountOut);

        /// Emitted once per pool, by the transaction that created it
        event PoolCreated(
            bytes32 indexed poolId,
            address indexed token0,
            address indexed token1,
            uint24 fee,
            address creator,
            uint256 amount0,
            uint256 amount1,
            uint256 liquidity
        );

        event LiquidityAdded(
            bytes32 indexed poolId,
            address indexed provider,
            uint256 amount0,
            uint256 amount1,
            uint256 liquidity
        );

        event LiquidityRemoved(
            bytes32 indexed poolId,
            address indexed provider,
            uint256 amount0,
            uint256 amount1,
            uint256 liquidity
        );

        event Swap(
            bytes32 indexed poolId,
            address indexed sender,
            address tokenIn,
            uint256 amountIn,
            uint256 amountOut,
            address recipient
        );
    }
}
