use pretty_assertions::assert_eq;
use solsplit_analyzer::{analyze, AnalyzerError, ReferenceEdge};
use parser::parse_file;

const BANK: &str = r#"pragma solidity ^0.8.0;

contract Bank {
    address private owner;
    uint256 public fee = 1;
    uint256 public maxFee = fee * 10;
    mapping(address => uint256) private balances;

    event FeeChanged(uint256 fee);

    modifier onlyOwner() {
        require(msg.sender == owner, "not owner");
        _;
    }

    function setFee(uint256 newFee) public onlyOwner {
        fee = newFee;
        emit FeeChanged(newFee);
    }

    function deposit() public payable {
        balances[msg.sender] += msg.value - fee;
    }

    function version() public pure returns (uint256) {
        return 1;
    }
}
"#;

#[test]
fn usage_matrix() {
    let model = analyze(&parse_file(BANK).unwrap()).unwrap();
    assert_eq!(model.name, "Bank");
    assert_eq!(
        model
            .variables
            .iter()
            .map(|var| var.name.as_str())
            .collect::<Vec<_>>(),
        vec!["owner", "fee", "maxFee", "balances"],
    );

    let uses_of = |name: &str| {
        model
            .functions
            .iter()
            .find(|func| func.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("no function {name}"))
            .uses
            .clone()
    };
    // owner, fee, maxFee, balances
    assert_eq!(uses_of("setFee"), vec![false, true, false, false]);
    assert_eq!(uses_of("deposit"), vec![false, true, false, true]);
    assert_eq!(uses_of("version"), vec![false, false, false, false]);
}

#[test]
fn initializer_reference_edges() {
    let model = analyze(&parse_file(BANK).unwrap()).unwrap();
    // maxFee's initializer reads fee
    assert_eq!(model.reference_edges, vec![ReferenceEdge { from: 2, to: 1 }]);
}

#[test]
fn dependency_sets() {
    let model = analyze(&parse_file(BANK).unwrap()).unwrap();
    let set_fee = model
        .functions
        .iter()
        .find(|func| func.name.as_deref() == Some("setFee"))
        .unwrap();
    assert!(set_fee.deps.events.contains("FeeChanged"));
    assert!(set_fee.deps.modifiers.contains("onlyOwner"));
    let deposit = model
        .functions
        .iter()
        .find(|func| func.name.as_deref() == Some("deposit"))
        .unwrap();
    assert!(deposit.deps.events.is_empty());
    assert!(deposit.deps.modifiers.is_empty());
}

#[test]
fn missing_contract_definition() {
    let unit = parse_file("pragma solidity ^0.8.0;\n").unwrap();
    assert_eq!(
        analyze(&unit).unwrap_err(),
        AnalyzerError::MissingContractDefinition,
    );
}

#[test]
fn multiple_contract_definitions() {
    let unit = parse_file("contract A {\n}\ncontract B {\n}\n").unwrap();
    match analyze(&unit).unwrap_err() {
        AnalyzerError::MultipleContractDefinitions(names) => {
            assert_eq!(names, vec!["A", "B"]);
        }
        other => panic!("expected multiple-definition error, got {other}"),
    }
}
