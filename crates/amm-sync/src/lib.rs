mod pool_set;
mod scanner;

pub use pool_set::PoolSet;
pub use scanner::PoolScanner;
