//! Full-lifecycle runs against an exhaustive in-process solver.

use std::fs;
use std::path::Path;

use common::{naming, record::PartitionRecord};
use solsplit_driver::Pipeline;
use optimizer::{CostModel, PartitionProblem};
use parser::SubsetParser;
use pretty_assertions::assert_eq;
use test_utils::ExhaustiveSolver;

const LEDGER: &str = r#"
pragma solidity ^0.6.0;

contract Ledger {
    address private owner;
    uint256 public fee = 100;
    uint256 public cap = fee * 2;
    mapping(address => uint256) private balances;

    constructor() public {
        owner = msg.sender;
    }

    function setFee(uint256 _fee) public {
        fee = _fee;
        cap = _fee * 2;
    }

    function deposit() public payable {
        balances[msg.sender] = balances[msg.sender] + msg.value;
    }

    function retire() public pure returns (uint256) {
        return 0;
    }
}
"#;

fn solver_for(source: &str, keys: u64) -> ExhaustiveSolver {
    let unit = parser::parse_file(source).unwrap();
    let model = analyzer::analyze(&unit).unwrap();
    ExhaustiveSolver::new(PartitionProblem {
        usage: model.functions.iter().map(|f| f.uses.clone()).collect(),
        type_keys: model
            .variables
            .iter()
            .map(|var| var.typ.cost_key().to_string())
            .collect(),
        edges: model
            .reference_edges
            .iter()
            .map(|edge| (edge.from, edge.to))
            .collect(),
        costs: CostModel::new(keys),
    })
}

fn deploy(dir: &Path, source: &str, keys: u64) -> solsplit_driver::DeployOutcome {
    let source_path = dir.join("Ledger.sol");
    fs::write(&source_path, source).unwrap();
    let provider = SubsetParser;
    let pipeline = Pipeline::new(dir, &provider);
    pipeline
        .deploy(&source_path, &solver_for(source, keys), keys)
        .unwrap()
}

#[test]
fn every_variable_lands_in_exactly_one_slot() {
    let dir = tempfile::tempdir().unwrap();
    let record = deploy(dir.path(), LEDGER, 13).record;

    let mut placed: Vec<&str> = record
        .slots
        .values()
        .flatten()
        .map(|name| name.as_str())
        .collect();
    placed.sort_unstable();
    assert_eq!(placed, ["balances", "cap", "fee", "owner"]);
    for (name, slot) in &record.variables {
        assert!(record.slots[slot].contains(name));
    }
}

#[test]
fn functions_share_a_slot_with_every_variable_they_touch() {
    let dir = tempfile::tempdir().unwrap();
    let record = deploy(dir.path(), LEDGER, 13).record;

    // setFee references fee and cap; both must live in its one slot.
    let slots = &record.functions["setFee"];
    assert_eq!(slots.len(), 1);
    assert_eq!(record.variables["fee"], slots[0]);
    assert_eq!(record.variables["cap"], slots[0]);

    let slots = &record.functions["deposit"];
    assert_eq!(slots, &vec![record.variables["balances"]]);
}

#[test]
fn initializer_references_keep_variables_together() {
    let dir = tempfile::tempdir().unwrap();
    let record = deploy(dir.path(), LEDGER, 13).record;

    // cap's initializer reads fee.
    assert_eq!(record.variables["cap"], record.variables["fee"]);
}

#[test]
fn occupied_slots_are_numbered_densely_from_zero() {
    let dir = tempfile::tempdir().unwrap();
    let record = deploy(dir.path(), LEDGER, 13).record;

    let occupied = record.occupied_slots();
    let expected: Vec<u32> = (0..occupied.len() as u32).collect();
    assert_eq!(occupied, expected);
}

#[test]
fn zero_use_functions_go_to_the_lowest_slot() {
    let dir = tempfile::tempdir().unwrap();
    let record = deploy(dir.path(), LEDGER, 13).record;

    assert_eq!(record.functions["retire"], vec![0]);
}

#[test]
fn repeated_runs_agree_on_the_partition() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let first = deploy(first_dir.path(), LEDGER, 13).record;
    let second = deploy(second_dir.path(), LEDGER, 13).record;

    assert_eq!(first.slots, second.slots);
    assert_eq!(first.functions, second.functions);
}

#[test]
fn deploy_writes_sources_and_both_record_files() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = deploy(dir.path(), LEDGER, 13);

    for path in &outcome.written {
        assert!(path.exists(), "missing {}", path.display());
    }
    let record = PartitionRecord::load(&PartitionRecord::path(dir.path(), "Ledger")).unwrap();
    let snapshot =
        PartitionRecord::load(&PartitionRecord::snapshot_path(dir.path(), "Ledger")).unwrap();
    assert_eq!(record, snapshot);
    assert!(naming::source_file(dir.path(), naming::HYPERLAYER_CONTRACT).exists());
}

#[test]
fn maintain_then_migrate_produces_an_updater_and_rebaselines() {
    let dir = tempfile::tempdir().unwrap();
    deploy(dir.path(), LEDGER, 13);
    let provider = SubsetParser;
    let pipeline = Pipeline::new(dir.path(), &provider);

    let requirements = "UPDATE(fee,-,-,-) to(tax,-,-,-);";
    let outcome = pipeline.maintain("Ledger", requirements).unwrap();
    assert!(outcome.fully_applied());

    let updater = pipeline.migrate("Ledger", requirements).unwrap().unwrap();
    let source = fs::read_to_string(&updater).unwrap();
    assert!(source.contains("get_fee"));
    assert!(source.contains("set_tax"));

    // The snapshot now matches the live record, so a second migration run
    // has nothing to do.
    let record = PartitionRecord::load(&PartitionRecord::path(dir.path(), "Ledger")).unwrap();
    let snapshot =
        PartitionRecord::load(&PartitionRecord::snapshot_path(dir.path(), "Ledger")).unwrap();
    assert_eq!(record, snapshot);
    assert_eq!(pipeline.migrate("Ledger", requirements).unwrap(), None);
}
