use analyzer::{analyze, ContractModel};
use solsplit_codegen::{split_contract, CodegenError, SplitArtifacts};
use optimizer::Partition;
use parser::parse_file;
use pretty_assertions::assert_eq;
use smol_str::SmolStr;

const VAULT: &str = r#"pragma solidity ^0.6.0;

contract Vault {
    address private owner;
    uint256 public fee = 100;
    mapping(address => uint256) private deposits;

    constructor() public {
        owner = msg.sender;
    }

    function setFee(uint256 _fee) public {
        fee = _fee;
    }

    function deposit() public payable {
        deposits[msg.sender] = deposits[msg.sender] + msg.value;
    }

    function charge(address account) public {
        deposits[account] = deposits[account] - fee;
    }

    function ping() public pure returns (bool) {
        return true;
    }
}
"#;

fn vault() -> ContractModel {
    analyze(&parse_file(VAULT).unwrap()).unwrap()
}

fn split(slots: Vec<u32>) -> SplitArtifacts {
    split_contract(&vault(), &Partition { slots }).unwrap()
}

fn source_of<'a>(artifacts: &'a SplitArtifacts, name: &str) -> &'a str {
    &artifacts
        .contracts
        .iter()
        .find(|contract| contract.name == name)
        .unwrap_or_else(|| panic!("no generated contract named {name}"))
        .source
}

#[test]
fn one_pair_per_occupied_slot_plus_the_router() {
    let artifacts = split(vec![0, 1, 0]);
    let names: Vec<&str> = artifacts
        .contracts
        .iter()
        .map(|contract| contract.name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "VaultState0",
            "VaultLogic0",
            "VaultState1",
            "VaultLogic1",
            "Hyperlayer"
        ]
    );
}

#[test]
fn state_keeps_initializers_logic_drops_them() {
    let artifacts = split(vec![0, 1, 0]);
    assert!(source_of(&artifacts, "VaultState1").contains("uint256 public fee = 100;"));
    assert!(source_of(&artifacts, "VaultLogic1").contains("uint256 public fee;"));
}

#[test]
fn functions_land_with_their_variables() {
    let artifacts = split(vec![0, 1, 0]);
    let logic0 = source_of(&artifacts, "VaultLogic0");
    let logic1 = source_of(&artifacts, "VaultLogic1");
    assert!(logic0.contains("constructor()"));
    assert!(logic0.contains("function deposit()"));
    assert!(logic1.contains("function setFee(uint256 _fee)"));
    // no state use: callable from the first slot
    assert!(logic0.contains("function ping()"));
    assert!(!logic1.contains("function ping()"));
}

#[test]
fn cross_slot_functions_are_reported_not_generated() {
    let artifacts = split(vec![0, 1, 0]);
    assert_eq!(artifacts.cross_slot_functions, [SmolStr::new("charge")]);
    assert!(!source_of(&artifacts, "VaultLogic0").contains("function charge"));
    assert!(!source_of(&artifacts, "VaultLogic1").contains("function charge"));
}

#[test]
fn record_mirrors_the_partition() {
    let artifacts = split(vec![0, 1, 0]);
    let record = &artifacts.record;
    assert_eq!(record.contract, "Vault");
    assert_eq!(record.slot_of("owner"), Some(0));
    assert_eq!(record.slot_of("fee"), Some(1));
    assert_eq!(record.slot_of("deposits"), Some(0));
    assert_eq!(
        record.slots[&0],
        vec![SmolStr::new("owner"), SmolStr::new("deposits")]
    );
    assert_eq!(record.functions["setFee"], vec![1]);
    assert_eq!(record.functions["charge"], vec![0, 1]);
    assert_eq!(record.functions["ping"], vec![0]);
    assert_eq!(
        record.types["deposits"],
        "mapping(address => uint256)".to_string()
    );
}

#[test]
fn modern_pragma_selects_modern_plumbing() {
    let artifacts = split(vec![0, 0, 0]);
    let state = source_of(&artifacts, "VaultState0");
    assert!(state.contains("pragma solidity ^0.6.0;"));
    assert!(state.contains("fallback() external payable {"));
    let router = source_of(&artifacts, "Hyperlayer");
    assert!(router.contains("(bool success, ) = target.call{value: msg.value}(msg.data);"));
}

#[test]
fn legacy_pragma_selects_legacy_plumbing() {
    let source = VAULT.replace("^0.6.0", "^0.4.21");
    let model = analyze(&parse_file(&source).unwrap()).unwrap();
    let artifacts = split_contract(&model, &Partition { slots: vec![0, 0, 0] }).unwrap();
    let state = source_of(&artifacts, "VaultState0");
    assert!(state.contains("function VaultState0(address _logicContract) public {"));
    assert!(state.contains("function () public payable {"));
    let router = source_of(&artifacts, "Hyperlayer");
    assert!(router.contains("bool success = target.call.value(msg.value)(msg.data);"));
}

#[test]
fn partition_must_cover_every_variable() {
    let err = split_contract(&vault(), &Partition { slots: vec![0, 1] }).unwrap_err();
    assert!(matches!(err, CodegenError::InvalidPartitionAssignment(_)));
}
