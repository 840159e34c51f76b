mod amm;
mod erc20;

pub use amm::IAmm;
pub use erc20::IERC20;
