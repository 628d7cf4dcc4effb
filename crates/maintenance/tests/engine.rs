use std::fs;
use std::path::Path;

use analyzer::analyze;
use common::{naming, PartitionRecord};
use optimizer::Partition;
use parser::{parse_file, SubsetParser};
use pretty_assertions::assert_eq;
use solsplit_maintenance::{parse_requirements, MaintenanceEngine, RequirementError};

const BANK: &str = r#"pragma solidity ^0.6.0;

contract Bank {
    uint256 private old_owner;
    uint256 public total;

    function claim() public {
        old_owner = old_owner + 1;
    }

    function add(uint256 amount) public {
        total = total + amount;
    }
}
"#;

/// Split the fixture across two slots and lay the artifacts out on disk.
fn deploy_bank(dir: &Path) -> PartitionRecord {
    let model = analyze(&parse_file(BANK).unwrap()).unwrap();
    let artifacts = codegen::split_contract(&model, &Partition { slots: vec![0, 1] }).unwrap();
    for contract in &artifacts.contracts {
        fs::write(naming::source_file(dir, &contract.name), &contract.source).unwrap();
    }
    artifacts.record
}

fn read(dir: &Path, contract: &str) -> String {
    fs::read_to_string(naming::source_file(dir, contract)).unwrap()
}

#[test]
fn update_rewrites_declaration_and_references() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = deploy_bank(dir.path());
    let engine = MaintenanceEngine::new(dir.path(), &SubsetParser);

    let parsed =
        parse_requirements("UPDATE(old_owner,uint256,0,private) to(owner,address,-,public);")
            .unwrap();
    let outcome = engine.apply_batch(&mut record, &parsed.requirements).unwrap();
    assert!(outcome.fully_applied());

    let state = read(dir.path(), "BankState0");
    assert!(state.contains("address public owner;"));
    assert!(!state.contains("old_owner"));

    let logic = read(dir.path(), "BankLogic0");
    assert!(logic.contains("address public owner;"));
    assert!(logic.contains("owner = owner + 1;"));
    // public now: the old private getter is gone, no setter appears
    assert!(!logic.contains("get_old_owner"));
    assert!(!logic.contains("set_owner"));

    assert_eq!(record.slot_of("owner"), Some(0));
    assert_eq!(record.slot_of("old_owner"), None);
    assert_eq!(record.types["owner"], "address".to_string());
}

#[test]
fn update_to_private_appends_a_setter() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = deploy_bank(dir.path());
    let engine = MaintenanceEngine::new(dir.path(), &SubsetParser);

    let parsed =
        parse_requirements("UPDATE(total,-,-,-) to(balance,-,-,private);").unwrap();
    let outcome = engine.apply_batch(&mut record, &parsed.requirements).unwrap();
    assert!(outcome.fully_applied());

    let logic = read(dir.path(), "BankLogic1");
    assert!(logic.contains("uint256 private balance;"));
    assert!(logic.contains("function set_balance(uint256 _balance) public {"));
    assert!(logic.contains("balance = balance + amount;"));
}

#[test]
fn insert_targets_the_minimum_slot() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = deploy_bank(dir.path());
    // simulate a record whose slot layout has gaps left by earlier deletes
    let vars = record.slots.shift_remove(&1).unwrap();
    record.slots.insert(3, vars);
    for var in &record.slots[&3].clone() {
        record.variables.insert(var.clone(), 3);
    }
    let engine = MaintenanceEngine::new(dir.path(), &SubsetParser);

    let parsed = parse_requirements("INSERT(reserve,uint256,0,public);").unwrap();
    engine.apply_batch(&mut record, &parsed.requirements).unwrap();

    assert_eq!(record.slot_of("reserve"), Some(0));
    let state = read(dir.path(), "BankState0");
    assert!(state.contains("uint256 public reserve = 0;"));
    let logic = read(dir.path(), "BankLogic0");
    assert!(logic.contains("uint256 public reserve;"));
    assert!(!logic.contains("reserve = 0"));
}

#[test]
fn private_insert_gets_a_setter() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = deploy_bank(dir.path());
    let engine = MaintenanceEngine::new(dir.path(), &SubsetParser);

    let parsed = parse_requirements("INSERT(secret,uint256,-,private);").unwrap();
    engine.apply_batch(&mut record, &parsed.requirements).unwrap();

    let logic = read(dir.path(), "BankLogic0");
    assert!(logic.contains("uint256 private secret;"));
    assert!(logic.contains("function set_secret(uint256 _secret) public {"));
}

#[test]
fn deleting_a_slots_last_variable_removes_the_slot() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = deploy_bank(dir.path());
    let engine = MaintenanceEngine::new(dir.path(), &SubsetParser);

    let parsed = parse_requirements("DELETE(total,-,-,-);").unwrap();
    let outcome = engine.apply_batch(&mut record, &parsed.requirements).unwrap();
    assert_eq!(outcome.purged_slots, vec![1]);

    assert!(!record.slots.contains_key(&1));
    assert!(record.slot_of("total").is_none());
    assert!(!naming::source_file(dir.path(), "BankState1").exists());
    assert!(!naming::source_file(dir.path(), "BankLogic1").exists());
    // the other slot is untouched
    assert!(naming::source_file(dir.path(), "BankState0").exists());
}

#[test]
fn delete_scrubs_the_logic_contract_too() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = deploy_bank(dir.path());
    let engine = MaintenanceEngine::new(dir.path(), &SubsetParser);

    // the insert keeps slot 0 occupied so its files survive the delete
    let parsed =
        parse_requirements("INSERT(extra,uint256,0,public);DELETE(old_owner,-,-,-);").unwrap();
    let outcome = engine.apply_batch(&mut record, &parsed.requirements).unwrap();
    assert!(outcome.fully_applied());
    assert!(outcome.purged_slots.is_empty());

    let state = read(dir.path(), "BankState0");
    assert!(!state.contains("old_owner"));

    // the mirrored header declaration, the getter, and the function whose
    // body only touched the variable are all gone
    let logic = read(dir.path(), "BankLogic0");
    assert!(!logic.contains("old_owner"));
    assert!(!logic.contains("function claim"));
    assert!(logic.contains("uint256 public extra;"));
}

#[test]
fn unknown_variables_are_reported_and_the_batch_continues() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = deploy_bank(dir.path());
    let engine = MaintenanceEngine::new(dir.path(), &SubsetParser);

    let parsed =
        parse_requirements("DELETE(ghost,-,-,-);INSERT(reserve,uint256,-,public);").unwrap();
    let outcome = engine.apply_batch(&mut record, &parsed.requirements).unwrap();

    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(
        outcome.issues[0].error,
        RequirementError::VariableNotFound("ghost".into())
    );
    assert_eq!(record.slot_of("reserve"), Some(0));
}
