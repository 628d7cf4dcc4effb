//! Deterministic names for generated artifacts.
//!
//! Every generated file is named from the original contract name, the slot
//! index, and a fixed suffix, so that independent invocations agree on which
//! file holds which sub-contract.

use std::path::{Path, PathBuf};

pub const HYPERLAYER_CONTRACT: &str = "Hyperlayer";
pub const SOURCE_EXTENSION: &str = "sol";

/// Name of the storage-holding proxy contract for a slot, e.g. `TokenState0`.
pub fn state_contract(contract: &str, slot: u32) -> String {
    format!("{contract}State{slot}")
}

/// Name of the logic contract for a slot, e.g. `TokenLogic0`.
pub fn logic_contract(contract: &str, slot: u32) -> String {
    format!("{contract}Logic{slot}")
}

/// Name of the one-shot migration contract, e.g. `TokenUpdater`.
pub fn updater_contract(contract: &str) -> String {
    format!("{contract}Updater")
}

/// Path of the `.sol` file holding the named contract.
pub fn source_file(dir: &Path, contract: &str) -> PathBuf {
    dir.join(format!("{contract}.{SOURCE_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names() {
        assert_eq!(state_contract("Token", 0), "TokenState0");
        assert_eq!(logic_contract("Token", 2), "TokenLogic2");
        assert_eq!(updater_contract("Token"), "TokenUpdater");
        assert_eq!(
            source_file(Path::new("out"), &state_contract("Token", 1)),
            PathBuf::from("out/TokenState1.sol")
        );
    }
}
