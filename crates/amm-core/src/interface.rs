use crate::error::{AmmError, Result};
use alloy_json_abi::JsonAbi;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const AMM_INTERFACE_JSON: &str = include_str!("../abi/Amm.json");
pub const ERC20_INTERFACE_JSON: &str = include_str!("../abi/ERC20.json");

/// Build artifact layout (`{"abi": [...], ...}`) emitted by most toolchains
#[derive(Deserialize)]
struct Artifact {
    abi: JsonAbi,
}

/// Parse either a bare ABI array or a build artifact containing one.
pub fn parse_interface(json: &str) -> Result<JsonAbi> {
    match serde_json::from_str::<JsonAbi>(json) {
        Ok(abi) => Ok(abi),
        Err(bare_err) => serde_json::from_str::<Artifact>(json)
            .map(|artifact| artifact.abi)
            .map_err(|_| AmmError::InterfaceParse(bare_err.to_string())),
    }
}

pub fn load_interface(path: &Path) -> Result<JsonAbi> {
    let content = fs::read_to_string(path)
        .map_err(|_| AmmError::DeploymentFileNotFound(path.display().to_string()))?;
    parse_interface(&content)
}

pub fn amm_interface() -> Result<JsonAbi> {
    parse_interface(AMM_INTERFACE_JSON)
}

pub fn erc20_interface() -> Result<JsonAbi> {
    parse_interface(ERC20_INTERFACE_JSON)
}
